// ============================================================================
// dictcache Library
// ============================================================================

//! Lifecycle caches for per-locale personalization dictionaries.
//!
//! Opening a dictionary is expensive, so every caller asking for the same
//! locale shares one instance. The [`CacheRegistry`] keeps one cache per
//! dictionary kind (user history and personalization) and exposes the
//! maintenance operations driven by the host application: a periodic decay
//! sweep over history dictionaries, a memory-pressure signal that frees
//! unused instances, and a full reset that flushes every dictionary and
//! deletes its backing files.
//!
//! # Examples
//!
//! ```no_run
//! use dictcache::{CacheRegistry, LocaleKey, RegistryConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry: CacheRegistry = CacheRegistry::new(RegistryConfig::new("/data/dicts"))?;
//!
//! let locale = LocaleKey::from("en_US");
//! let history = registry.get_user_history_dictionary(&locale)?;
//! history.add_bigram("good", "morning")?;
//!
//! registry.decay_all_history_dictionaries()?;
//! registry.reset_all()?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod core;
pub mod dictionary;
pub mod registry;
pub mod storage;

// Re-export main types for convenience
pub use cache::{CacheStats, LifecycleCache, SweepReport, TeardownReport, WeakEntry};
pub use core::{CacheError, LocaleKey, Result};
pub use dictionary::{
    DecayPolicy, DecayingDictionary, DictionaryContext, PersonalizationDictionary,
    PersonalizedDictionary, UserHistoryDictionary,
};
pub use registry::{
    CacheRegistry, DecayWorker, RegistryConfig, RegistryStats, ResetReport, spawn_decay_worker,
};
pub use storage::{DirectoryCleaner, FilePrefixFilter, StorageCleaner};
