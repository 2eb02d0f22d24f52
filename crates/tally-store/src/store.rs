//! # Blob Store
//!
//! The key-value abstraction every repository persists through.
//!
//! ## Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       BlobStore Contract                                │
//! │                                                                         │
//! │  put("products", "[{...},{...}]")   whole collection, every time       │
//! │  get("products") → Some(blob)       or None on first run               │
//! │                                                                         │
//! │  Guarantees: NONE beyond "the last successful put wins".               │
//! │  No versioning, no locking across processes, no fsync discipline.      │
//! │  This matches the original storage model (a browser key-value blob     │
//! │  save) and keeps the trait trivially implementable by any host.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::StoreResult;

// =============================================================================
// Trait
// =============================================================================

/// Synchronous key-value blob storage.
///
/// Implementations must be cheap to call: every mutating service
/// operation writes its whole collection through here.
pub trait BlobStore: Send + Sync {
    /// Stores `blob` under `key`, replacing any previous value.
    fn put(&self, key: &str, blob: &str) -> StoreResult<()>;

    /// Retrieves the blob stored under `key`, `None` if absent.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-memory store for tests and hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryStore {
    fn put(&self, key: &str, blob: &str) -> StoreResult<()> {
        let mut blobs = self.blobs.lock().expect("MemoryStore mutex poisoned");
        blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let blobs = self.blobs.lock().expect("MemoryStore mutex poisoned");
        Ok(blobs.get(key).cloned())
    }
}

// =============================================================================
// File Store
// =============================================================================

/// File-backed store: one `<key>.json` file per collection under a
/// directory. Plain `write` semantics - if the process dies mid-write the
/// snapshot is corrupt and [`crate::error::StoreError::Corrupt`] surfaces
/// on the next load.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Opened file store");
        Ok(FileStore { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl BlobStore for FileStore {
    fn put(&self, key: &str, blob: &str) -> StoreResult<()> {
        let path = self.path_for(key);
        debug!(key = %key, bytes = blob.len(), "Writing snapshot");
        fs::write(path, blob)?;
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let blob = fs::read_to_string(path)?;
        Ok(Some(blob))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get("products").unwrap().is_none());

        store.put("products", "[]").unwrap();
        assert_eq!(store.get("products").unwrap().as_deref(), Some("[]"));

        store.put("products", "[1]").unwrap();
        assert_eq!(store.get("products").unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert!(store.get("orders").unwrap().is_none());
        store.put("orders", r#"[{"id":"o-1"}]"#).unwrap();
        assert_eq!(
            store.get("orders").unwrap().as_deref(),
            Some(r#"[{"id":"o-1"}]"#)
        );

        // A second store over the same directory sees the data
        let reopened = FileStore::open(dir.path()).unwrap();
        assert!(reopened.get("orders").unwrap().is_some());
    }
}
