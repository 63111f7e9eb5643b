use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to open {kind} for locale '{locale}': {reason}")]
    ConstructionFailed {
        kind: &'static str,
        locale: String,
        reason: String,
    },

    #[error("Maintenance error: {0}")]
    MaintenanceError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

impl<T> From<std::sync::PoisonError<T>> for CacheError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}
