//! In-memory worker store for dry runs and tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{StoreDocument, StoreError, StoreOp, WorkerBalance, WorkerEntry, WorkerStore};

/// Store that keeps everything in memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: Mutex<StoreDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a worker entry.
    pub fn insert_worker(&self, worker_id: &str, balance: u64, min_payout_level: u64) {
        self.doc.lock().workers.insert(
            worker_id.to_string(),
            WorkerEntry {
                balance,
                min_payout_level,
                paid: 0,
            },
        );
    }

    /// Snapshot of the current contents.
    pub fn document(&self) -> StoreDocument {
        self.doc.lock().clone()
    }

    /// Look up one worker entry.
    pub fn worker(&self, worker_id: &str) -> Option<WorkerEntry> {
        self.doc.lock().workers.get(worker_id).cloned()
    }
}

#[async_trait]
impl WorkerStore for MemoryStore {
    async fn fetch_balances(&self) -> Result<Vec<WorkerBalance>, StoreError> {
        Ok(self.doc.lock().balances())
    }

    async fn commit(&self, ops: &[StoreOp]) -> Result<(), StoreError> {
        self.doc.lock().apply_all(ops);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_and_commit() {
        let store = MemoryStore::new();
        store.insert_worker("w1", 5_000, 0);

        let balances = store.fetch_balances().await.unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].balance, 5_000);

        store
            .commit(&[StoreOp::DecrBalance {
                worker: "w1".to_string(),
                amount: 2_000,
            }])
            .await
            .unwrap();

        assert_eq!(store.worker("w1").unwrap().balance, 3_000);
    }
}
