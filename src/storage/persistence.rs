//! Snapshot persistence for decaying dictionaries

use crate::core::{CacheError, Result};
use crate::dictionary::UsageStat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::NamedTempFile;

pub const SNAPSHOT_VERSION: u32 = 1;

// ============================================================================
// Dictionary Snapshot
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionarySnapshot {
    pub version: u32,
    pub locale: String,
    pub words: BTreeMap<String, UsageStat>,
    pub bigrams: BTreeMap<String, BTreeMap<String, UsageStat>>,
    pub last_decay: DateTime<Utc>,
}

impl DictionarySnapshot {
    pub fn empty(locale: &str, now: DateTime<Utc>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            locale: locale.to_string(),
            words: BTreeMap::new(),
            bigrams: BTreeMap::new(),
            last_decay: now,
        }
    }
}

// ============================================================================
// Snapshot File
// ============================================================================

#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the file with `snapshot`.
    ///
    /// Returns the modification time of the written file.
    pub fn save(&self, snapshot: &DictionarySnapshot) -> Result<Option<SystemTime>> {
        let dir = self.path.parent().ok_or_else(|| {
            CacheError::StorageError(format!(
                "No parent directory for '{}'",
                self.path.display()
            ))
        })?;
        fs::create_dir_all(dir)
            .map_err(|e| storage_error("Failed to create dictionary directory", e))?;

        let serialized = rmp_serde::to_vec_named(snapshot)
            .map_err(|e| storage_error("Failed to serialize snapshot", e))?;
        let mut temp = NamedTempFile::new_in(dir)
            .map_err(|e| storage_error("Failed to create temp file", e))?;
        temp.write_all(&serialized)
            .map_err(|e| storage_error("Failed to write snapshot", e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| storage_error("Failed to sync snapshot", e))?;
        temp.persist(&self.path)
            .map_err(|e| storage_error("Failed to rename snapshot", e.error))?;

        self.modified()
    }

    pub fn load(&self) -> Result<Option<DictionarySnapshot>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error("Failed to read snapshot", e)),
        };
        let snapshot: DictionarySnapshot = rmp_serde::from_slice(&data)
            .map_err(|e| storage_error("Failed to deserialize snapshot", e))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CacheError::StorageError(format!(
                "Unsupported snapshot version {} in '{}'",
                snapshot.version,
                self.path.display()
            )));
        }
        Ok(Some(snapshot))
    }

    /// Modification time of the file, `None` if it does not exist.
    pub fn modified(&self) -> Result<Option<SystemTime>> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(meta.modified()?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn storage_error(what: &str, err: impl std::fmt::Display) -> CacheError {
    CacheError::StorageError(format!("{}: {}", what, err))
}
