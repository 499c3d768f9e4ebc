//! Snapshot store for persisting flight sets
//!
//! Provides the `SnapshotStore` seam plus two implementations: `DiskStore`, which
//! keeps one JSON file per key in a directory, and `MemoryStore`, which keeps the
//! bytes in a map for tests and other substitutions.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::SnapshotKey;

/// Default snapshot directory, relative to the working directory
pub const DEFAULT_DATA_DIR: &str = "data";

/// Errors that can occur when touching stored snapshots
#[derive(Debug, Error)]
pub enum StoreError {
    /// No snapshot exists for the key
    #[error("snapshot not found: {0}")]
    NotFound(SnapshotKey),

    /// Any other I/O failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Durable mapping from snapshot key to JSON bytes
///
/// `write_atomic` must never let a concurrent `read` observe a partially
/// written snapshot.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn exists(&self, key: &SnapshotKey) -> bool;

    async fn read(&self, key: &SnapshotKey) -> Result<Vec<u8>, StoreError>;

    async fn write_atomic(&self, key: &SnapshotKey, bytes: &[u8]) -> Result<(), StoreError>;

    /// Lists the keys of all stored snapshots, in no particular order
    async fn keys(&self) -> Result<Vec<SnapshotKey>, StoreError>;
}

/// Stores snapshots as `{kind}_{airport}_{date}.json` files in one directory
#[derive(Debug, Clone)]
pub struct DiskStore {
    /// Directory where snapshot files are stored
    data_dir: PathBuf,
}

impl Default for DiskStore {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

impl DiskStore {
    /// Creates a store rooted at the given directory
    ///
    /// The directory is created lazily on the first write.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the path of the snapshot file for the given key
    pub fn snapshot_path(&self, key: &SnapshotKey) -> PathBuf {
        self.data_dir.join(key.file_name())
    }
}

#[async_trait]
impl SnapshotStore for DiskStore {
    async fn exists(&self, key: &SnapshotKey) -> bool {
        fs::try_exists(self.snapshot_path(key))
            .await
            .unwrap_or(false)
    }

    async fn read(&self, key: &SnapshotKey) -> Result<Vec<u8>, StoreError> {
        let path = self.snapshot_path(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(key.clone())),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    async fn write_atomic(&self, key: &SnapshotKey, bytes: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| StoreError::io(&self.data_dir, e))?;

        let path = self.snapshot_path(key);
        let temp_path = self.data_dir.join(format!("{}.tmp", key.file_name()));

        // Write and flush the temp file before it becomes visible under the final name
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StoreError::io(&path, e));
        }

        debug!(path = %path.display(), bytes = bytes.len(), "snapshot written");
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<SnapshotKey>, StoreError> {
        let mut entries = match fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            // Nothing has been written yet
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.data_dir, e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.data_dir, e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(key) = entry.file_name().to_str().and_then(SnapshotKey::from_file_name) {
                keys.push(key);
            }
        }

        Ok(keys)
    }
}

/// Keeps snapshots in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: Mutex<HashMap<SnapshotKey, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a snapshot directly, bypassing `write_atomic`
    pub fn insert(&self, key: SnapshotKey, bytes: Vec<u8>) {
        self.lock().insert(key, bytes);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SnapshotKey, Vec<u8>>> {
        // A panic while holding the guard cannot leave the map half-updated
        self.snapshots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn exists(&self, key: &SnapshotKey) -> bool {
        self.lock().contains_key(key)
    }

    async fn read(&self, key: &SnapshotKey) -> Result<Vec<u8>, StoreError> {
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn write_atomic(&self, key: &SnapshotKey, bytes: &[u8]) -> Result<(), StoreError> {
        self.lock().insert(key.clone(), bytes.to_vec());
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<SnapshotKey>, StoreError> {
        Ok(self.lock().keys().cloned().collect())
    }
}
