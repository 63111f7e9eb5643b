use crate::dictionary::DecayPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Directory holding every dictionary backing file
    pub files_dir: PathBuf,

    /// Elapsed time that triggers one decay step
    pub decay_interval: Duration,

    /// Statistics that decay below this count are pruned
    pub min_count: u32,

    /// Period of the background decay worker, if one should run
    pub decay_worker_interval: Option<Duration>,
}

impl RegistryConfig {
    /// Create a configuration storing dictionaries under `files_dir`
    pub fn new(files_dir: impl Into<PathBuf>) -> Self {
        let decay = DecayPolicy::default();
        Self {
            files_dir: files_dir.into(),
            decay_interval: decay.interval,
            min_count: decay.min_count,
            decay_worker_interval: None,
        }
    }

    /// Set the decay interval
    pub fn decay_interval(mut self, interval: Duration) -> Self {
        self.decay_interval = interval;
        self
    }

    /// Set the pruning threshold
    pub fn min_count(mut self, min_count: u32) -> Self {
        self.min_count = min_count;
        self
    }

    /// Run a background decay sweep every `interval`
    pub fn decay_worker_interval(mut self, interval: Duration) -> Self {
        self.decay_worker_interval = Some(interval);
        self
    }

    pub fn decay_policy(&self) -> DecayPolicy {
        DecayPolicy {
            interval: self.decay_interval,
            min_count: self.min_count,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.files_dir.as_os_str().is_empty() {
            return Err("files_dir cannot be empty".to_string());
        }

        if self.min_count == 0 {
            return Err("min_count must be > 0".to_string());
        }

        if self.decay_worker_interval.is_some_and(|interval| interval.is_zero()) {
            return Err("decay_worker_interval must be > 0".to_string());
        }

        Ok(())
    }
}
