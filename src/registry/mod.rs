//! Entry points for the two dictionary kinds.
//!
//! A [`CacheRegistry`] owns one [`LifecycleCache`] per kind, each with its own
//! lock, so history and personalization lookups never wait on each other.
//! Create one registry when the host application starts and share it (usually
//! behind an `Arc`); dropping it releases every cached dictionary.

pub mod config;
pub mod worker;

use crate::cache::{CacheStats, LifecycleCache, SweepReport, TeardownReport};
use crate::core::{CacheError, LocaleKey, Result};
use crate::dictionary::{
    DictionaryContext, PersonalizationDictionary, PersonalizedDictionary, UserHistoryDictionary,
};
use crate::storage::{DirectoryCleaner, FilePrefixFilter, StorageCleaner};
use log::{error, info};
use std::sync::Arc;

pub use config::RegistryConfig;
pub use worker::{DecayWorker, spawn_decay_worker};

pub struct CacheRegistry<H = UserHistoryDictionary, P = PersonalizationDictionary> {
    config: RegistryConfig,
    context: DictionaryContext,
    history: LifecycleCache<H>,
    personalization: LifecycleCache<P>,
    cleaner: Arc<dyn StorageCleaner>,
}

impl<H, P> CacheRegistry<H, P>
where
    H: PersonalizedDictionary,
    P: PersonalizedDictionary,
{
    /// Create a registry deleting backing files from `config.files_dir`.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let cleaner = Arc::new(DirectoryCleaner::new(&config.files_dir));
        Self::with_cleaner(config, cleaner)
    }

    /// Create a registry with a custom storage collaborator.
    pub fn with_cleaner(
        config: RegistryConfig,
        cleaner: Arc<dyn StorageCleaner>,
    ) -> Result<Self> {
        config.validate().map_err(CacheError::ConfigError)?;
        if H::NAME.starts_with(P::NAME) || P::NAME.starts_with(H::NAME) {
            return Err(CacheError::ConfigError(format!(
                "File prefixes '{}' and '{}' overlap",
                H::NAME,
                P::NAME
            )));
        }

        let context = DictionaryContext::new(&config.files_dir, config.decay_policy());
        Ok(Self {
            config,
            context,
            history: LifecycleCache::new(),
            personalization: LifecycleCache::new(),
            cleaner,
        })
    }

    pub fn get_user_history_dictionary(&self, locale: &LocaleKey) -> Result<Arc<H>> {
        self.history
            .get_or_create(locale, |key| H::open(&self.context, key))
    }

    pub fn get_personalization_dictionary(&self, locale: &LocaleKey) -> Result<Arc<P>> {
        self.personalization
            .get_or_create(locale, |key| P::open(&self.context, key))
    }

    /// Decay every live history dictionary.
    ///
    /// Personalization dictionaries are not decayed.
    pub fn decay_all_history_dictionaries(&self) -> Result<SweepReport> {
        self.history.decay_sweep()
    }

    /// Flush and drop every dictionary of both kinds and delete their files.
    ///
    /// Both kinds are torn down even if the first one fails; the first error
    /// is returned afterwards.
    pub fn reset_all(&self) -> Result<ResetReport> {
        let history = self
            .history
            .clear_all(self.cleaner.as_ref(), &FilePrefixFilter::new(H::NAME));
        let personalization = self
            .personalization
            .clear_all(self.cleaner.as_ref(), &FilePrefixFilter::new(P::NAME));

        let report = match (history, personalization) {
            (Ok(history), Ok(personalization)) => ResetReport {
                history,
                personalization,
            },
            (Err(err), personalization) => {
                if let Err(other) = personalization {
                    error!("Reset of {} also failed: {}", P::NAME, other);
                }
                error!("Reset of {} failed: {}", H::NAME, err);
                return Err(err);
            }
            (Ok(_), Err(err)) => {
                error!("Reset of {} failed: {}", P::NAME, err);
                return Err(err);
            }
        };
        info!("Reset personalized dictionaries: {}", report);
        Ok(report)
    }

    /// Release every dictionary no consumer holds anymore.
    ///
    /// Returns how many dictionaries were freed across both kinds.
    pub fn on_memory_pressure(&self) -> Result<usize> {
        Ok(self.history.reclaim_unused()? + self.personalization.reclaim_unused()?)
    }

    pub fn stats(&self) -> Result<RegistryStats> {
        Ok(RegistryStats {
            history: self.history.stats()?,
            personalization: self.personalization.stats()?,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn history_cache(&self) -> &LifecycleCache<H> {
        &self.history
    }

    pub fn personalization_cache(&self) -> &LifecycleCache<P> {
        &self.personalization
    }
}

/// Outcome of [`CacheRegistry::reset_all`], one teardown per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetReport {
    pub history: TeardownReport,
    pub personalization: TeardownReport,
}

impl ResetReport {
    pub fn files_deleted(&self) -> bool {
        self.history.files_deleted && self.personalization.files_deleted
    }
}

impl std::fmt::Display for ResetReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "history [{}], personalization [{}]",
            self.history, self.personalization
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub history: CacheStats,
    pub personalization: CacheStats,
}

impl std::fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.history, self.personalization)
    }
}
