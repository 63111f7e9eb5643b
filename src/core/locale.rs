use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical locale identifier used as a cache key (`en_US`, `fr`, ...).
///
/// The key is opaque: two keys name the same cache slot iff their strings are
/// equal. Parsing and normalization belong to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocaleKey(String);

impl LocaleKey {
    pub fn new(locale: impl Into<String>) -> Self {
        Self(locale.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocaleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocaleKey {
    fn from(locale: &str) -> Self {
        Self::new(locale)
    }
}

impl From<String> for LocaleKey {
    fn from(locale: String) -> Self {
        Self(locale)
    }
}

impl AsRef<str> for LocaleKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
