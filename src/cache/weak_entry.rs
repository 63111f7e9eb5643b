//! Reclaimable handle to a shared dictionary.
//!
//! A `WeakEntry` behaves like a soft reference: the cache keeps its referent
//! pinned until a reclamation signal arrives, and the signal only takes
//! effect when nobody outside the cache still holds the value. Once the pin
//! is released and the last external `Arc` is dropped, the referent is gone
//! for good and [`WeakEntry::get`] keeps returning `None`.

use std::sync::{Arc, Weak};

pub struct WeakEntry<V> {
    /// Strong reference held on behalf of the cache, `None` once reclaimed.
    pinned: Option<Arc<V>>,
    /// Observes the referent regardless of the pin.
    weak: Weak<V>,
}

impl<V> WeakEntry<V> {
    pub fn new(value: &Arc<V>) -> Self {
        Self {
            pinned: Some(Arc::clone(value)),
            weak: Arc::downgrade(value),
        }
    }

    /// Resolve the referent, or `None` if it has been reclaimed.
    pub fn get(&self) -> Option<Arc<V>> {
        self.weak.upgrade()
    }

    pub fn is_live(&self) -> bool {
        self.weak.strong_count() > 0
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }

    /// Release the cache's pin if the cache is the only strong holder.
    ///
    /// Returns `true` when the referent was freed by this call. A referent
    /// still held by a consumer stays pinned and the call returns `false`.
    pub fn reclaim(&mut self) -> bool {
        match &self.pinned {
            Some(value) if Arc::strong_count(value) == 1 => {
                self.pinned = None;
                true
            }
            _ => false,
        }
    }
}

impl<V> std::fmt::Debug for WeakEntry<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakEntry")
            .field("live", &self.is_live())
            .field("pinned", &self.is_pinned())
            .finish()
    }
}
