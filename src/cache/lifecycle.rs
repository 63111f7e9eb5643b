use super::WeakEntry;
use crate::core::{LocaleKey, Result};
use crate::dictionary::PersonalizedDictionary;
use crate::storage::{FilePrefixFilter, StorageCleaner};
use log::{debug, error, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Locale-keyed table of shared dictionaries of one kind.
///
/// Every operation holds the table lock from start to finish, including
/// dictionary construction and maintenance I/O. That makes construction and
/// publication a single step: two callers asking for the same locale can
/// never end up with two different live instances.
pub struct LifecycleCache<V> {
    kind: &'static str,
    entries: Mutex<HashMap<LocaleKey, WeakEntry<V>>>,
}

impl<V: PersonalizedDictionary> LifecycleCache<V> {
    pub fn new() -> Self {
        Self {
            kind: V::NAME,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Return the live dictionary for `key`, building it with `constructor`
    /// if there is none.
    ///
    /// A cached instance is asked to `reload_if_required` before it is
    /// returned. A constructor error is returned as-is and leaves the table
    /// untouched.
    pub fn get_or_create<F>(&self, key: &LocaleKey, constructor: F) -> Result<Arc<V>>
    where
        F: FnOnce(&LocaleKey) -> Result<V>,
    {
        let mut entries = self.entries.lock()?;

        if let Some(dict) = entries.get(key).and_then(WeakEntry::get) {
            debug!("Use cached {} for {}", self.kind, key);
            dict.reload_if_required();
            return Ok(dict);
        }

        let dict = match constructor(key) {
            Ok(dict) => Arc::new(dict),
            Err(err) => {
                warn!("Cannot build {} for {}: {}", self.kind, key, err);
                return Err(err);
            }
        };
        entries.insert(key.clone(), WeakEntry::new(&dict));
        debug!("Built {} for {}", self.kind, key);
        Ok(dict)
    }

    /// Live dictionary for `key`, without building or reloading.
    pub fn get(&self, key: &LocaleKey) -> Result<Option<Arc<V>>> {
        let entries = self.entries.lock()?;
        Ok(entries.get(key).and_then(WeakEntry::get))
    }

    /// Run `decay_if_needed` on every live dictionary.
    ///
    /// A failing dictionary is logged and skipped. Reclaimed entries are left
    /// in place for the next `get_or_create` to replace.
    pub fn decay_sweep(&self) -> Result<SweepReport> {
        let entries = self.entries.lock()?;
        let mut report = SweepReport::default();

        for (key, entry) in entries.iter() {
            let Some(dict) = entry.get() else {
                report.stale += 1;
                continue;
            };
            match dict.decay_if_needed() {
                Ok(()) => report.decayed += 1,
                Err(err) => {
                    warn!("Decay of {} for {} failed: {}", self.kind, key, err);
                    report.failed += 1;
                }
            }
        }

        debug!("{} decay sweep: {}", self.kind, report);
        Ok(report)
    }

    /// Flush and forget every dictionary, then delete backing files.
    ///
    /// Files are selected by `filter` and removed through `cleaner`, which
    /// also catches files of dictionaries that were already reclaimed. The
    /// table ends up empty even if flushing or deletion fails.
    pub fn clear_all(
        &self,
        cleaner: &dyn StorageCleaner,
        filter: &FilePrefixFilter,
    ) -> Result<TeardownReport> {
        let mut entries = self.entries.lock()?;
        let mut report = TeardownReport::default();

        for (key, entry) in entries.iter() {
            let Some(dict) = entry.get() else {
                continue;
            };
            match dict.clear_and_flush() {
                Ok(()) => report.flushed += 1,
                Err(err) => {
                    warn!("Flush of {} for {} failed: {}", self.kind, key, err);
                    report.flush_failures += 1;
                }
            }
        }

        report.dropped = entries.len();
        entries.clear();

        report.files_deleted = cleaner.delete_filtered_files(filter);
        if !report.files_deleted {
            error!(
                "Cannot remove all existing dictionary files. kind: {}, prefix: {}",
                self.kind,
                filter.prefix()
            );
        }

        Ok(report)
    }

    /// Apply the reclamation signal to one entry.
    ///
    /// Returns `true` if the dictionary was freed. Dictionaries still held by
    /// a consumer are never freed.
    pub fn reclaim(&self, key: &LocaleKey) -> Result<bool> {
        let mut entries = self.entries.lock()?;
        Ok(entries.get_mut(key).is_some_and(WeakEntry::reclaim))
    }

    /// Apply the reclamation signal to every entry and return how many
    /// dictionaries were freed.
    pub fn reclaim_unused(&self) -> Result<usize> {
        let mut entries = self.entries.lock()?;
        let reclaimed = entries
            .values_mut()
            .map(WeakEntry::reclaim)
            .filter(|freed| *freed)
            .count();
        if reclaimed > 0 {
            debug!("Reclaimed {} {} instance(s)", reclaimed, self.kind);
        }
        Ok(reclaimed)
    }

    /// Number of entries, live or stale.
    pub fn len(&self) -> Result<usize> {
        Ok(self.entries.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let entries = self.entries.lock()?;
        Ok(CacheStats {
            kind: self.kind,
            entries: entries.len(),
            live: entries.values().filter(|entry| entry.is_live()).count(),
        })
    }
}

impl<V: PersonalizedDictionary> Default for LifecycleCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a [`LifecycleCache::decay_sweep`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub decayed: usize,
    pub failed: usize,
    /// Entries whose dictionary had been reclaimed.
    pub stale: usize,
}

impl std::fmt::Display for SweepReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} decayed, {} failed, {} stale",
            self.decayed, self.failed, self.stale
        )
    }
}

/// Outcome of a [`LifecycleCache::clear_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub flushed: usize,
    pub flush_failures: usize,
    /// Entries removed from the table, live or stale.
    pub dropped: usize,
    pub files_deleted: bool,
}

impl std::fmt::Display for TeardownReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} flushed, {} flush failures, {} entries dropped, files {}",
            self.flushed,
            self.flush_failures,
            self.dropped,
            if self.files_deleted { "deleted" } else { "left behind" }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub kind: &'static str,
    pub entries: usize,
    pub live: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}/{} live",
            self.kind, self.live, self.entries
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CacheError;
    use crate::dictionary::DictionaryContext;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct Probe {
        serial: usize,
        reloads: AtomicUsize,
        decays: AtomicUsize,
        clears: AtomicUsize,
        fail: AtomicBool,
    }

    impl PersonalizedDictionary for Probe {
        const NAME: &'static str = "Probe";

        fn open(_context: &DictionaryContext, _locale: &LocaleKey) -> Result<Self> {
            Ok(Self::default())
        }

        fn reload_if_required(&self) {
            self.reloads.fetch_add(1, Ordering::SeqCst);
        }

        fn decay_if_needed(&self) -> Result<()> {
            self.decays.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(CacheError::MaintenanceError("decay failed".into()));
            }
            Ok(())
        }

        fn clear_and_flush(&self) -> Result<()> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(CacheError::MaintenanceError("flush failed".into()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingCleaner {
        prefixes: Mutex<Vec<String>>,
        succeed: bool,
    }

    impl StorageCleaner for RecordingCleaner {
        fn delete_filtered_files(&self, filter: &FilePrefixFilter) -> bool {
            self.prefixes.lock().unwrap().push(filter.prefix().to_string());
            self.succeed
        }
    }

    fn build(_key: &LocaleKey) -> Result<Probe> {
        Ok(Probe::default())
    }

    #[test]
    fn test_same_key_returns_same_instance() {
        let cache = LifecycleCache::<Probe>::new();
        let key = LocaleKey::from("en_US");

        let first = cache.get_or_create(&key, build).unwrap();
        let second = cache.get_or_create(&key, build).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.reloads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_distinct_keys_get_distinct_instances() {
        let cache = LifecycleCache::<Probe>::new();
        let en = cache.get_or_create(&"en".into(), build).unwrap();
        let fr = cache.get_or_create(&"fr".into(), build).unwrap();
        assert!(!Arc::ptr_eq(&en, &fr));
        assert_eq!(cache.len().unwrap(), 2);
    }

    #[test]
    fn test_rebuild_after_reclaim() {
        let cache = LifecycleCache::<Probe>::new();
        let key = LocaleKey::from("en_US");
        let built = AtomicUsize::new(0);
        let counting = |_: &LocaleKey| {
            let serial = built.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Probe { serial, ..Default::default() })
        };

        let first = cache.get_or_create(&key, counting).unwrap();
        assert_eq!(first.serial, 1);
        let watcher = Arc::downgrade(&first);
        drop(first);

        assert!(cache.reclaim(&key).unwrap());
        assert!(watcher.upgrade().is_none());
        assert_eq!(cache.stats().unwrap().live, 0);

        let second = cache.get_or_create(&key, counting).unwrap();
        assert_eq!(second.serial, 2);
        assert_eq!(built.load(Ordering::SeqCst), 2);
        assert_eq!(second.reloads.load(Ordering::SeqCst), 0);
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_reclaim_skips_dictionary_in_use() {
        let cache = LifecycleCache::<Probe>::new();
        let key = LocaleKey::from("de");
        let held = cache.get_or_create(&key, build).unwrap();

        assert!(!cache.reclaim(&key).unwrap());
        assert_eq!(cache.reclaim_unused().unwrap(), 0);

        let again = cache.get_or_create(&key, build).unwrap();
        assert!(Arc::ptr_eq(&held, &again));
    }

    #[test]
    fn test_reclaim_unused_frees_only_unheld_entries() {
        let cache = LifecycleCache::<Probe>::new();
        let held = cache.get_or_create(&"en".into(), build).unwrap();
        drop(cache.get_or_create(&"fr".into(), build).unwrap());
        drop(cache.get_or_create(&"de".into(), build).unwrap());

        assert_eq!(cache.reclaim_unused().unwrap(), 2);
        assert_eq!(cache.reclaim_unused().unwrap(), 0);

        let stats = cache.stats().unwrap();
        assert_eq!((stats.entries, stats.live), (3, 1));
        assert!(Arc::ptr_eq(&held, &cache.get(&"en".into()).unwrap().unwrap()));
        assert!(cache.get(&"fr".into()).unwrap().is_none());
    }

    #[test]
    fn test_failed_construction_leaves_table_untouched() {
        let cache = LifecycleCache::<Probe>::new();
        let key = LocaleKey::from("ja");

        let err = cache
            .get_or_create(&key, |k| {
                Err(CacheError::ConstructionFailed {
                    kind: "Probe",
                    locale: k.to_string(),
                    reason: "disk full".into(),
                })
            })
            .err()
            .unwrap();
        assert!(matches!(err, CacheError::ConstructionFailed { .. }));
        assert!(cache.is_empty().unwrap());

        let live = cache.get_or_create(&key, build).unwrap();
        let failed = cache.get_or_create(&key, |_| Err(CacheError::IoError("unused".into())));
        assert!(Arc::ptr_eq(&live, &failed.unwrap()));
    }

    #[test]
    fn test_failed_rebuild_keeps_stale_entry() {
        let cache = LifecycleCache::<Probe>::new();
        let key = LocaleKey::from("ko");
        drop(cache.get_or_create(&key, build).unwrap());
        assert_eq!(cache.reclaim_unused().unwrap(), 1);

        let result = cache.get_or_create(&key, |_| Err(CacheError::IoError("boom".into())));
        assert!(result.is_err());
        assert_eq!(cache.len().unwrap(), 1);
        assert!(cache.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_decay_sweep_visits_live_entries_once() {
        let cache = LifecycleCache::<Probe>::new();
        let en = cache.get_or_create(&"en".into(), build).unwrap();
        let fr = cache.get_or_create(&"fr".into(), build).unwrap();
        drop(cache.get_or_create(&"it".into(), build).unwrap());
        assert!(cache.reclaim(&"it".into()).unwrap());

        let report = cache.decay_sweep().unwrap();

        assert_eq!(report, SweepReport { decayed: 2, failed: 0, stale: 1 });
        assert_eq!(en.decays.load(Ordering::SeqCst), 1);
        assert_eq!(fr.decays.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().unwrap(), 3);
        assert_eq!(cache.stats().unwrap().live, 2);
    }

    #[test]
    fn test_decay_failure_does_not_abort_sweep() {
        let cache = LifecycleCache::<Probe>::new();
        let keys = ["a", "b", "c", "d"];
        let dicts: Vec<_> = keys
            .iter()
            .map(|k| cache.get_or_create(&(*k).into(), build).unwrap())
            .collect();
        dicts[1].fail.store(true, Ordering::SeqCst);

        let report = cache.decay_sweep().unwrap();

        assert_eq!(report.decayed, 3);
        assert_eq!(report.failed, 1);
        for dict in &dicts {
            assert_eq!(dict.decays.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_clear_all_flushes_live_entries_once() {
        let cache = LifecycleCache::<Probe>::new();
        let en = cache.get_or_create(&"en".into(), build).unwrap();
        let fr = cache.get_or_create(&"fr".into(), build).unwrap();
        drop(cache.get_or_create(&"es".into(), build).unwrap());
        cache.reclaim(&"es".into()).unwrap();
        let cleaner = RecordingCleaner { succeed: true, ..Default::default() };

        let report = cache.clear_all(&cleaner, &FilePrefixFilter::new("Probe.")).unwrap();

        assert_eq!(report.flushed, 2);
        assert_eq!(report.dropped, 3);
        assert!(report.files_deleted);
        assert_eq!(en.clears.load(Ordering::SeqCst), 1);
        assert_eq!(fr.clears.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty().unwrap());
        assert_eq!(*cleaner.prefixes.lock().unwrap(), vec!["Probe.".to_string()]);
    }

    #[test]
    fn test_clear_all_survives_flush_and_delete_failures() {
        let cache = LifecycleCache::<Probe>::new();
        let broken = cache.get_or_create(&"en".into(), build).unwrap();
        let healthy = cache.get_or_create(&"fr".into(), build).unwrap();
        broken.fail.store(true, Ordering::SeqCst);
        let cleaner = RecordingCleaner::default();

        let report = cache.clear_all(&cleaner, &FilePrefixFilter::new("Probe.")).unwrap();

        assert_eq!(report.flushed, 1);
        assert_eq!(report.flush_failures, 1);
        assert!(!report.files_deleted);
        assert_eq!(healthy.clears.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn test_build_after_clear_all_is_fresh() {
        let cache = LifecycleCache::<Probe>::new();
        let key = LocaleKey::from("en");
        let old = cache.get_or_create(&key, build).unwrap();
        let cleaner = RecordingCleaner { succeed: true, ..Default::default() };
        cache.clear_all(&cleaner, &FilePrefixFilter::new("Probe.")).unwrap();

        let new = cache.get_or_create(&key, build).unwrap();
        assert!(!Arc::ptr_eq(&old, &new));
    }

    #[test]
    fn test_stats_display() {
        let cache = LifecycleCache::<Probe>::new();
        let _held = cache.get_or_create(&"en".into(), build).unwrap();
        assert_eq!(cache.stats().unwrap().to_string(), "Probe: 1/1 live");
    }
}
