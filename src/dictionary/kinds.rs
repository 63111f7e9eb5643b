use super::{DecayingDictionary, DictionaryContext, PersonalizedDictionary};
use crate::core::{LocaleKey, Result};
use std::ops::Deref;

macro_rules! decaying_kind {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name {
            inner: DecayingDictionary,
        }

        impl PersonalizedDictionary for $name {
            const NAME: &'static str = stringify!($name);

            fn open(context: &DictionaryContext, locale: &LocaleKey) -> Result<Self> {
                Ok(Self {
                    inner: DecayingDictionary::open(Self::NAME, context, locale)?,
                })
            }

            fn reload_if_required(&self) {
                self.inner.reload_if_required();
            }

            fn decay_if_needed(&self) -> Result<()> {
                self.inner.decay_if_needed()
            }

            fn clear_and_flush(&self) -> Result<()> {
                self.inner.clear_and_flush()
            }
        }

        impl Deref for $name {
            type Target = DecayingDictionary;

            fn deref(&self) -> &DecayingDictionary {
                &self.inner
            }
        }
    };
}

decaying_kind!(
    /// Words and word pairs the user actually typed, decayed over time.
    UserHistoryDictionary
);

decaying_kind!(
    /// Vocabulary learned from the user's own content (messages, contacts, ...).
    PersonalizationDictionary
);
