//! File-backed key-value store.
//!
//! All slots live in one JSON object. Every mutation rewrites the file through
//! a sibling temp file followed by a rename, so a crash never leaves a
//! half-written store behind.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::{KeyValueStore, StorageError, StorageResult};

/// Durable store persisted as a JSON file.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    slots: Mutex<BTreeMap<String, String>>,
}

impl FileKeyValueStore {
    /// Open the store at `path`, loading existing slots.
    ///
    /// A missing file is an empty store; it is created on the first write.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let slots = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        debug!(path = %path.display(), slots = slots.len(), "Opened key-value store");
        Ok(Self {
            path,
            slots: Mutex::new(slots),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, slots: &BTreeMap<String, String>) -> StorageResult<()> {
        let io_err = |source: std::io::Error| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let body = serde_json::to_string_pretty(slots)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    // Memory only keeps a change the file accepted; a failed write restores
    // the previous slot before the error is returned.
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut slots = self.lock();
        let previous = slots.insert(key.to_string(), value.to_string());
        self.persist(&slots).inspect_err(|_| match previous {
            Some(previous) => {
                slots.insert(key.to_string(), previous);
            }
            None => {
                slots.remove(key);
            }
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut slots = self.lock();
        let Some(previous) = slots.remove(key) else {
            return Ok(());
        };
        self.persist(&slots).inspect_err(|_| {
            slots.insert(key.to_string(), previous);
        })
    }
}
