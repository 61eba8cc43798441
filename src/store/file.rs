//! File-backed worker store.
//!
//! Persists the store document as pretty-printed JSON, one file per coin
//! namespace. Writes go to a temp file first and are renamed into place, so
//! a crash mid-write never leaves a corrupt document. The commit mutex keeps
//! the apply-then-persist sequence atomic with respect to other commits.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use super::{StoreDocument, StoreError, StoreOp, WorkerBalance, WorkerStore};

pub struct FileStore {
    path: PathBuf,
    doc: Mutex<StoreDocument>,
}

impl FileStore {
    /// Open a store file, creating an empty document if it does not exist.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let doc = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| StoreError::Read(format!("{}: {}", path.display(), e)))?;
            serde_json::from_str(&content)
                .map_err(|e| StoreError::Read(format!("{}: {}", path.display(), e)))?
        } else {
            tracing::info!("No store file at {}, starting empty", path.display());
            StoreDocument::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            doc: Mutex::new(doc),
        })
    }

    /// Snapshot of the current contents.
    pub fn document(&self) -> StoreDocument {
        self.doc.lock().clone()
    }

    fn persist(&self, doc: &StoreDocument) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(doc)
            .map_err(|e| StoreError::Write(e.to_string()))?;

        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, &content)
            .map_err(|e| StoreError::Write(format!("{}: {}", temp_path.display(), e)))?;
        std::fs::rename(&temp_path, &self.path)
            .map_err(|e| StoreError::Write(format!("{}: {}", self.path.display(), e)))?;

        Ok(())
    }
}

#[async_trait]
impl WorkerStore for FileStore {
    async fn fetch_balances(&self) -> Result<Vec<WorkerBalance>, StoreError> {
        Ok(self.doc.lock().balances())
    }

    async fn commit(&self, ops: &[StoreOp]) -> Result<(), StoreError> {
        let mut doc = self.doc.lock();
        let mut updated = doc.clone();
        updated.apply_all(ops);
        self.persist(&updated)?;
        *doc = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::WorkerEntry;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(&dir.path().join("store.json")).unwrap();
        assert!(store.fetch_balances().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.doc.lock().workers.insert(
                "w1".to_string(),
                WorkerEntry {
                    balance: 9_000,
                    min_payout_level: 0,
                    paid: 0,
                },
            );
            store
                .commit(&[StoreOp::DecrBalance {
                    worker: "w1".to_string(),
                    amount: 4_000,
                }])
                .await
                .unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        let balances = reopened.fetch_balances().await.unwrap();
        assert_eq!(balances[0].balance, 5_000);
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_memory_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = FileStore::open(&path).unwrap();
        store.doc.lock().workers.insert(
            "w1".to_string(),
            WorkerEntry {
                balance: 9_000,
                min_payout_level: 0,
                paid: 0,
            },
        );

        // Make the rename target directory unusable by replacing the store
        // path with a directory of the same name
        std::fs::create_dir(&path).unwrap();

        let result = store
            .commit(&[StoreOp::DecrBalance {
                worker: "w1".to_string(),
                amount: 4_000,
            }])
            .await;

        assert!(result.is_err());
        assert_eq!(store.document().workers["w1"].balance, 9_000);
    }
}
