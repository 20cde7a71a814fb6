//! Durable records for pin uploads that exhausted their retry budget.
//!
//! The store is a plain directory of small JSON files, one per failed
//! upload, keyed by the source file's base name. It is shared between
//! the pin client (writer), the recovery CLI (reader/deleter) and the
//! notification job (reader) with no locking: concurrent writers to the
//! same key are last-write-wins, and readers skip entries they cannot
//! parse. This is an operator-facing queue, not a transactional log.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name suffix shared by all pending records.
pub const PENDING_SUFFIX: &str = ".pending.json";

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A file upload that failed all configured attempts and is waiting for
/// a manual retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPin {
    /// Absolute path of the local file that failed to pin.
    pub file: String,
    /// Description of the last failure.
    pub error: String,
    /// Number of attempts made before giving up.
    pub attempts: u32,
}

/// Derives the record key for a source file path: `<basename>.pending.json`.
///
/// Two source files that share a base name map to the same key and will
/// overwrite each other's record.
pub fn pending_key(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    format!("{name}{PENDING_SUFFIX}")
}

/// Key-value seam over the pending-pin queue.
///
/// Kept deliberately small so a real embedded store can replace the
/// filesystem implementation without touching callers.
#[async_trait]
pub trait PendingStore: std::fmt::Debug + Send + Sync {
    /// Writes a record, overwriting any existing record with the same key.
    async fn put(&self, key: &str, record: &PendingPin) -> StoreResult<()>;

    /// Returns all parseable records, keyed by file name.
    ///
    /// A missing directory yields an empty list. Entries that fail to
    /// parse are skipped, not reported.
    async fn list(&self) -> StoreResult<Vec<(String, PendingPin)>>;

    /// Deletes a record. Deleting a key that does not exist is a no-op.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// `PendingStore` backed by a directory of `<basename>.pending.json` files.
#[derive(Debug, Clone)]
pub struct FsPendingStore {
    dir: PathBuf,
}

impl FsPendingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FsPendingStore { dir: dir.into() }
    }

    /// Default queue location under the system temp directory.
    pub fn default_location() -> PathBuf {
        std::env::temp_dir().join("pinq_pending_pins")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the record file for a key.
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

#[async_trait]
impl PendingStore for FsPendingStore {
    async fn put(&self, key: &str, record: &PendingPin) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_vec(record)?;
        tokio::fs::write(self.record_path(key), body).await?;
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<(String, PendingPin)>> {
        let mut read_dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(PENDING_SUFFIX) {
                continue;
            }
            let bytes = match tokio::fs::read(entry.path()).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::debug!("skipping unreadable pending record {name}: {e}");
                    continue;
                }
            };
            match serde_json::from_slice::<PendingPin>(&bytes) {
                Ok(record) => records.push((name, record)),
                Err(e) => {
                    log::debug!("skipping corrupt pending record {name}: {e}");
                }
            }
        }
        // Directory iteration order is platform-defined; sort for stable output.
        records.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(records)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        match tokio::fs::remove_file(self.record_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
