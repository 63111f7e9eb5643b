pub mod files;
pub mod persistence;

pub use files::{
    DirectoryCleaner, FilePrefixFilter, StorageCleaner, delete_filtered_files, list_filtered_files,
};
pub use persistence::{DictionarySnapshot, SnapshotFile};
