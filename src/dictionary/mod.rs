//! Dictionary boundary contract.
//!
//! The cache layer only knows dictionaries through [`PersonalizedDictionary`]:
//! how to open one for a locale and the three maintenance hooks it drives.
//! [`UserHistoryDictionary`] and [`PersonalizationDictionary`] are the two
//! file-backed kinds shipped with the crate.

pub mod decaying;
pub mod kinds;

use crate::core::{LocaleKey, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use decaying::{DecayingDictionary, UsageStat};
pub use kinds::{PersonalizationDictionary, UserHistoryDictionary};

/// Extension of every dictionary backing file.
pub const DICT_FILE_EXTENSION: &str = "dict";

/// A per-locale dictionary whose lifetime is managed by a lifecycle cache.
pub trait PersonalizedDictionary: Send + Sync + 'static {
    /// File-name prefix shared by every backing file of this kind.
    ///
    /// Prefixes of different kinds must not be prefixes of one another, or a
    /// reset of one kind would delete the other's files.
    const NAME: &'static str;

    /// Build the dictionary for `locale`, loading any persisted state.
    fn open(context: &DictionaryContext, locale: &LocaleKey) -> Result<Self>
    where
        Self: Sized;

    /// Refresh in-memory state if the backing storage changed underneath.
    fn reload_if_required(&self);

    /// Age out stale usage statistics when a decay step is due.
    fn decay_if_needed(&self) -> Result<()>;

    /// Persist pending state, then drop everything held in memory.
    fn clear_and_flush(&self) -> Result<()>;
}

/// Decay parameters shared by every dictionary opened through a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayPolicy {
    /// Elapsed time that triggers one halving step.
    pub interval: Duration,
    /// Statistics whose count falls below this are pruned.
    pub min_count: u32,
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
            min_count: 1,
        }
    }
}

/// Environment handed to [`PersonalizedDictionary::open`].
#[derive(Debug, Clone)]
pub struct DictionaryContext {
    files_dir: PathBuf,
    decay: DecayPolicy,
}

impl DictionaryContext {
    pub fn new(files_dir: impl Into<PathBuf>, decay: DecayPolicy) -> Self {
        Self {
            files_dir: files_dir.into(),
            decay,
        }
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    pub fn decay_policy(&self) -> DecayPolicy {
        self.decay
    }

    /// Backing file of a dictionary: `<files_dir>/<prefix>.<locale>.dict`.
    pub fn file_path(&self, prefix: &str, locale: &LocaleKey) -> PathBuf {
        self.files_dir
            .join(format!("{}.{}.{}", prefix, locale, DICT_FILE_EXTENSION))
    }
}
