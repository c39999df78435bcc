//! Key-value store backends for the cache.
//!
//! The persistence engine is an external collaborator: this module only
//! defines the abstract [`KeyValueStore`] interface the cache consumes, plus
//! two single-process backends. Values are opaque bytes; the store imposes
//! no structure and no expiry.
//!
//! - [`MemoryStore`]: a `HashMap` behind a mutex, for tests and short
//!   sessions.
//! - [`DiskStore`]: one file per key under a directory, for project folders
//!   that outlive the process.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// Failure reported by a store backend.
#[derive(Debug, Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

/// Abstract get/put/delete over opaque bytes.
///
/// Single-process only; no distributed-consistency requirement. Timeouts and
/// retries, if any, belong to the backend.
pub trait KeyValueStore: Send + Sync {
    /// Fetches the value stored under `key`, if any.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;
    /// Removes `key`. Deleting a missing key is not an error.
    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;
}

/// An in-memory store backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// A disk-backed store keeping one file per key under a directory.
///
/// Key bytes are hex-encoded into the file name, so arbitrary keys (which
/// may contain separators) map to valid paths. Writes go through a
/// temporary file and a rename, so a reader never observes a partial value.
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .map_err(|e| StoreError(format!("creating {}: {e}", root.display())))?;
        log::debug!("disk store opened at '{}'", root.display());
        Ok(Self { root })
    }

    fn path_for(&self, key: &[u8]) -> PathBuf {
        let mut name = String::with_capacity(key.len() * 2);
        for b in key {
            // write! into a String cannot fail
            let _ = write!(name, "{b:02x}");
        }
        self.root.join(name)
    }
}

impl KeyValueStore for DiskStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError(format!("reading {}: {e}", path.display()))),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, value)
            .map_err(|e| StoreError(format!("writing {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| StoreError(format!("renaming into {}: {e}", path.display())))
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError(format!("deleting {}: {e}", path.display()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise_store(store: &dyn KeyValueStore) {
        assert_eq!(store.get(b"missing").expect("get"), None);

        store.put(b"k1", b"v1").expect("put");
        assert_eq!(store.get(b"k1").expect("get"), Some(b"v1".to_vec()));

        store.put(b"k1", b"v2").expect("overwrite");
        assert_eq!(store.get(b"k1").expect("get"), Some(b"v2".to_vec()));

        store.delete(b"k1").expect("delete");
        assert_eq!(store.get(b"k1").expect("get"), None);

        // deleting a missing key is fine
        store.delete(b"k1").expect("delete missing");
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        exercise_store(&store);
        assert!(store.is_empty());
    }

    #[test]
    fn disk_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DiskStore::open(dir.path()).expect("open");
        exercise_store(&store);
    }

    #[test]
    fn disk_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = DiskStore::open(dir.path()).expect("open");
            store.put(b"record-index/inc/st001", b"[\"abc\"]").expect("put");
        }
        let store = DiskStore::open(dir.path()).expect("reopen");
        assert_eq!(
            store.get(b"record-index/inc/st001").expect("get"),
            Some(b"[\"abc\"]".to_vec())
        );
    }
}
