//! Name-prefix file selection and bulk deletion of backing files.

use crate::core::Result;
use log::warn;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Accepts file names starting with a fixed prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePrefixFilter {
    prefix: String,
}

impl FilePrefixFilter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn accept(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
    }
}

/// Storage collaborator that removes backing files during teardown.
pub trait StorageCleaner: Send + Sync {
    /// Delete every entry accepted by `filter`.
    ///
    /// Returns `false` if at least one matching entry could not be removed.
    fn delete_filtered_files(&self, filter: &FilePrefixFilter) -> bool;
}

/// [`StorageCleaner`] operating on a single directory of the local file system.
#[derive(Debug, Clone)]
pub struct DirectoryCleaner {
    dir: PathBuf,
}

impl DirectoryCleaner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl StorageCleaner for DirectoryCleaner {
    fn delete_filtered_files(&self, filter: &FilePrefixFilter) -> bool {
        delete_filtered_files(&self.dir, filter)
    }
}

/// Remove every direct child of `dir` whose name `filter` accepts.
///
/// Matching directories are removed recursively. A missing `dir` has nothing
/// left to delete and counts as success.
pub fn delete_filtered_files(dir: &Path, filter: &FilePrefixFilter) -> bool {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return true,
        Err(err) => {
            warn!("Cannot list '{}': {}", dir.display(), err);
            return false;
        }
    };

    let mut all_deleted = true;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Cannot read entry of '{}': {}", dir.display(), err);
                all_deleted = false;
                continue;
            }
        };

        let name = entry.file_name();
        if !name.to_str().is_some_and(|name| filter.accept(name)) {
            continue;
        }

        let path = entry.path();
        let removed = match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => fs::remove_dir_all(&path),
            Ok(_) => fs::remove_file(&path),
            Err(err) => Err(err),
        };
        if let Err(err) = removed {
            warn!("Failed to delete '{}': {}", path.display(), err);
            all_deleted = false;
        }
    }

    all_deleted
}

/// List the direct children of `dir` accepted by `filter`, sorted by name.
pub fn list_filtered_files(dir: &Path, filter: &FilePrefixFilter) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };

    let mut matched = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_name().to_str().is_some_and(|name| filter.accept(name)) {
            matched.push(entry.path());
        }
    }
    matched.sort();
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prefix_filter_exactness() {
        let filter = FilePrefixFilter::new("hist_");
        assert!(filter.accept("hist_en_US"));
        assert!(!filter.accept("personalization_en_US"));
        assert!(!filter.accept("xhist_en_US"));
        assert!(!filter.accept("hist"));
    }

    #[test]
    fn test_delete_only_matching_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("hist_en_US.dict"), b"a").unwrap();
        fs::write(dir.join("hist_fr.dict"), b"b").unwrap();
        fs::write(dir.join("pers_en_US.dict"), b"c").unwrap();
        fs::create_dir(dir.join("hist_cache")).unwrap();
        fs::write(dir.join("hist_cache").join("chunk"), b"d").unwrap();

        assert!(delete_filtered_files(dir, &FilePrefixFilter::new("hist_")));

        assert!(!dir.join("hist_en_US.dict").exists());
        assert!(!dir.join("hist_fr.dict").exists());
        assert!(!dir.join("hist_cache").exists());
        assert!(dir.join("pers_en_US.dict").exists());
    }

    #[test]
    fn test_missing_directory_counts_as_deleted() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert!(delete_filtered_files(&missing, &FilePrefixFilter::new("x")));
    }

    #[test]
    fn test_directory_cleaner_targets_its_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("kind.en.dict"), b"").unwrap();

        let cleaner = DirectoryCleaner::new(temp_dir.path());
        assert!(cleaner.delete_filtered_files(&FilePrefixFilter::new("kind.")));
        assert!(!temp_dir.path().join("kind.en.dict").exists());
    }

    #[test]
    fn test_list_filtered_files_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("a.fr.dict"), b"").unwrap();
        fs::write(dir.join("a.de.dict"), b"").unwrap();
        fs::write(dir.join("b.de.dict"), b"").unwrap();

        let listed = list_filtered_files(dir, &FilePrefixFilter::new("a.")).unwrap();
        assert_eq!(listed, vec![dir.join("a.de.dict"), dir.join("a.fr.dict")]);
    }
}
