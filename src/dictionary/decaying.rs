//! File-backed usage statistics with time-based decay.
//!
//! A [`DecayingDictionary`] counts how often words and word pairs were typed.
//! Every elapsed [`DecayPolicy::interval`] halves all counts once, and stats
//! that drop below [`DecayPolicy::min_count`] are pruned. State is persisted
//! as a single snapshot file per kind and locale.

use super::{DecayPolicy, DictionaryContext};
use crate::core::{CacheError, LocaleKey, Result};
use crate::storage::{DictionarySnapshot, SnapshotFile};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;

/// Usage counter of a word or word pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStat {
    pub count: u32,
    pub last_used: DateTime<Utc>,
}

impl UsageStat {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            count: 1,
            last_used: now,
        }
    }

    fn bump(&mut self, now: DateTime<Utc>) {
        self.count = self.count.saturating_add(1);
        self.last_used = now;
    }

    fn halve(&mut self, steps: u32) {
        self.count = self.count.checked_shr(steps).unwrap_or(0);
    }
}

struct DictionaryState {
    words: BTreeMap<String, UsageStat>,
    bigrams: BTreeMap<String, BTreeMap<String, UsageStat>>,
    last_decay: DateTime<Utc>,
    /// In-memory changes not yet written to the snapshot file.
    dirty: bool,
    /// Modification time of the file as last loaded or written by us.
    synced_at: Option<SystemTime>,
}

impl DictionaryState {
    fn from_snapshot(snapshot: DictionarySnapshot, synced_at: Option<SystemTime>) -> Self {
        Self {
            words: snapshot.words,
            bigrams: snapshot.bigrams,
            last_decay: snapshot.last_decay,
            dirty: false,
            synced_at,
        }
    }

    fn to_snapshot(&self, locale: &LocaleKey) -> DictionarySnapshot {
        DictionarySnapshot {
            version: crate::storage::persistence::SNAPSHOT_VERSION,
            locale: locale.to_string(),
            words: self.words.clone(),
            bigrams: self.bigrams.clone(),
            last_decay: self.last_decay,
        }
    }

    fn prune(&mut self, min_count: u32) {
        self.words.retain(|_, stat| stat.count >= min_count);
        for followers in self.bigrams.values_mut() {
            followers.retain(|_, stat| stat.count >= min_count);
        }
        self.bigrams.retain(|_, followers| !followers.is_empty());
    }
}

pub struct DecayingDictionary {
    kind: &'static str,
    locale: LocaleKey,
    file: SnapshotFile,
    policy: DecayPolicy,
    state: Mutex<DictionaryState>,
}

impl DecayingDictionary {
    /// Open the `kind` dictionary of `locale`, loading its snapshot if present.
    pub fn open(
        kind: &'static str,
        context: &DictionaryContext,
        locale: &LocaleKey,
    ) -> Result<Self> {
        let file = SnapshotFile::new(context.file_path(kind, locale));
        let construction_failed = |err: CacheError| CacheError::ConstructionFailed {
            kind,
            locale: locale.to_string(),
            reason: err.to_string(),
        };

        let state = match file.load().map_err(construction_failed)? {
            Some(snapshot) => {
                let synced_at = file.modified().map_err(construction_failed)?;
                debug!("Loaded {} for {} ({} words)", kind, locale, snapshot.words.len());
                DictionaryState::from_snapshot(snapshot, synced_at)
            }
            None => {
                let empty = DictionarySnapshot::empty(locale.as_str(), Utc::now());
                DictionaryState::from_snapshot(empty, None)
            }
        };

        Ok(Self {
            kind,
            locale: locale.clone(),
            file,
            policy: context.decay_policy(),
            state: Mutex::new(state),
        })
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Record one use of `word`.
    pub fn add_word(&self, word: &str) -> Result<()> {
        let now = Utc::now();
        let mut state = self.state.lock()?;
        state
            .words
            .entry(word.to_string())
            .and_modify(|stat| stat.bump(now))
            .or_insert_with(|| UsageStat::new(now));
        state.dirty = true;
        Ok(())
    }

    /// Record `word` typed right after `prev`. Also counts `word` itself.
    pub fn add_bigram(&self, prev: &str, word: &str) -> Result<()> {
        self.add_word(word)?;
        let now = Utc::now();
        let mut state = self.state.lock()?;
        state
            .bigrams
            .entry(prev.to_string())
            .or_default()
            .entry(word.to_string())
            .and_modify(|stat| stat.bump(now))
            .or_insert_with(|| UsageStat::new(now));
        state.dirty = true;
        Ok(())
    }

    pub fn word_count(&self, word: &str) -> Result<Option<u32>> {
        let state = self.state.lock()?;
        Ok(state.words.get(word).map(|stat| stat.count))
    }

    pub fn bigram_count(&self, prev: &str, word: &str) -> Result<Option<u32>> {
        let state = self.state.lock()?;
        Ok(state
            .bigrams
            .get(prev)
            .and_then(|followers| followers.get(word))
            .map(|stat| stat.count))
    }

    /// Number of distinct words.
    pub fn len(&self) -> Result<usize> {
        Ok(self.state.lock()?.words.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn is_dirty(&self) -> Result<bool> {
        Ok(self.state.lock()?.dirty)
    }

    /// Write pending changes to the snapshot file.
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock()?;
        if state.dirty {
            self.persist(&mut state)?;
        }
        Ok(())
    }

    /// Reload from disk when the file changed since we last touched it.
    ///
    /// Unflushed local changes win over the file. Failures are logged.
    pub fn reload_if_required(&self) {
        match self.try_reload() {
            Ok(true) => debug!("Reloaded {} for {}", self.kind, self.locale),
            Ok(false) => {}
            Err(err) => warn!("Cannot reload {} for {}: {}", self.kind, self.locale, err),
        }
    }

    fn try_reload(&self) -> Result<bool> {
        let mut state = self.state.lock()?;
        if state.dirty {
            return Ok(false);
        }
        let on_disk = self.file.modified()?;
        if on_disk == state.synced_at {
            return Ok(false);
        }
        let snapshot = self
            .file
            .load()?
            .unwrap_or_else(|| DictionarySnapshot::empty(self.locale.as_str(), Utc::now()));
        *state = DictionaryState::from_snapshot(snapshot, on_disk);
        Ok(true)
    }

    pub fn decay_if_needed(&self) -> Result<()> {
        self.decay_at(Utc::now()).map(|_| ())
    }

    /// Apply every decay step due at `now`. Returns `false` if none was due.
    pub fn decay_at(&self, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.lock()?;
        let steps = decay_steps(&self.policy, now - state.last_decay);
        if steps == 0 {
            return Ok(false);
        }

        for stat in state.words.values_mut() {
            stat.halve(steps);
        }
        for followers in state.bigrams.values_mut() {
            for stat in followers.values_mut() {
                stat.halve(steps);
            }
        }
        state.prune(self.policy.min_count);
        state.last_decay = next_decay_origin(&self.policy, state.last_decay, steps, now);
        debug!("Decayed {} for {} by {} step(s)", self.kind, self.locale, steps);

        self.persist(&mut state)?;
        Ok(true)
    }

    /// Drop all statistics and persist the empty dictionary.
    pub fn clear_and_flush(&self) -> Result<()> {
        let mut state = self.state.lock()?;
        state.words.clear();
        state.bigrams.clear();
        state.last_decay = Utc::now();
        self.persist(&mut state)
    }

    fn persist(&self, state: &mut DictionaryState) -> Result<()> {
        let synced_at = self.file.save(&state.to_snapshot(&self.locale))?;
        state.dirty = false;
        state.synced_at = synced_at;
        Ok(())
    }
}

impl Drop for DecayingDictionary {
    fn drop(&mut self) {
        if let Ok(state) = self.state.get_mut() {
            if state.dirty {
                let snapshot = state.to_snapshot(&self.locale);
                if let Err(err) = self.file.save(&snapshot) {
                    warn!("Lost pending changes of {} for {}: {}", self.kind, self.locale, err);
                }
            }
        }
    }
}

/// Number of halving steps due after `elapsed`. A zero interval always yields one.
fn decay_steps(policy: &DecayPolicy, elapsed: chrono::Duration) -> u32 {
    if policy.interval.is_zero() {
        return 1;
    }
    let elapsed = elapsed.to_std().unwrap_or_default();
    let interval_ms = policy.interval.as_millis().max(1);
    (elapsed.as_millis() / interval_ms).min(u32::MAX as u128) as u32
}

/// Start of the first interval not yet applied, never later than `now`.
///
/// Leftover time past the last whole interval carries over to the next call.
fn next_decay_origin(
    policy: &DecayPolicy,
    last_decay: DateTime<Utc>,
    steps: u32,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    if policy.interval.is_zero() {
        return now;
    }
    policy
        .interval
        .checked_mul(steps)
        .and_then(|span| chrono::Duration::from_std(span).ok())
        .and_then(|span| last_decay.checked_add_signed(span))
        .map_or(now, |next| next.min(now))
}
