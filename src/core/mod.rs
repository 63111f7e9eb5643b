pub mod error;
pub mod locale;

pub use error::{CacheError, Result};
pub use locale::LocaleKey;
