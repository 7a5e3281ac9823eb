//! Persistent storage implementation
//!
//! Each slot is a JSON file under `<base>/<namespace>/<slot>.json`. Writes
//! go to a temporary sibling file that is then renamed over the slot, so a
//! crash mid-write leaves either the old or the new contents, never a torn
//! file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use crate::LocalStore;
use crate::error::StorageError;
use crate::keys::SlotKey;

/// File-backed implementation of [`LocalStore`]
#[derive(Debug, Clone)]
pub struct FileLocalStore {
    /// Root directory of the cache
    base_dir: PathBuf,
    /// Whether to fsync before the rename (durability vs performance)
    sync_writes: bool,
}

impl FileLocalStore {
    /// Create a store rooted at `base_dir`, creating the directory if needed
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::with_options(base_dir, true).await
    }

    /// Create with explicit sync options
    pub async fn with_options(
        base_dir: impl AsRef<Path>,
        sync_writes: bool,
    ) -> Result<Self, StorageError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).await?;
        debug!(path = ?base_dir, sync_writes, "Opened file store");

        Ok(Self {
            base_dir,
            sync_writes,
        })
    }

    /// Get the data directory path
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the file backing `key`
    pub fn slot_path(&self, key: &SlotKey) -> PathBuf {
        self.base_dir
            .join(key.namespace.as_key())
            .join(format!("{}.json", key.slot.name()))
    }
}

#[async_trait]
impl LocalStore for FileLocalStore {
    async fn read(&self, key: &SlotKey) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.slot_path(key);
        match fs::read(&path).await {
            Ok(bytes) => {
                trace!(path = ?path, bytes = bytes.len(), "Read slot");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &SlotKey, value: &[u8]) -> Result<(), StorageError> {
        let path = self.slot_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp_path = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        let result = async {
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(value).await?;
            if self.sync_writes {
                file.sync_all().await?;
            }
            drop(file);
            fs::rename(&tmp_path, &path).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        trace!(path = ?path, bytes = value.len(), "Wrote slot");
        Ok(())
    }

    async fn remove(&self, key: &SlotKey) -> Result<(), StorageError> {
        match fs::remove_file(self.slot_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
