//! Per-kind lifecycle caches of shared dictionaries.

pub mod lifecycle;
pub mod weak_entry;

pub use lifecycle::{CacheStats, LifecycleCache, SweepReport, TeardownReport};
pub use weak_entry::WeakEntry;
