//! Worker balance and payment history storage.
//!
//! The engine is the sole writer of worker balance/paid fields; the store is
//! the single source of truth for balances. Everything the settlement path
//! writes goes through [`StoreOp`] lists applied atomically per batch, so a
//! batch's debits and ledger entries land together or not at all.
//!
//! The production key-value transport is an external collaborator; the
//! [`WorkerStore`] trait is the seam. The document layout mirrors the store
//! schema one-to-one: `workers:<id> -> {balance, minPayoutLevel, paid}` plus
//! the global and per-address payment ledgers with
//! `txHash:amount:fee:ringSize[:destCount]` members.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store read failed: {0}")]
    Read(String),

    #[error("store write failed: {0}")]
    Write(String),
}

/// A worker's payout-relevant fields, read fresh each cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerBalance {
    /// Raw login string the worker mines under
    pub worker_id: String,

    /// Accrued balance in atomic units
    pub balance: u64,

    /// Worker-configured minimum payout level (0 = use the global minimum)
    pub min_payout_level: u64,
}

/// Global payment ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub tx_hash: String,
    pub total_amount: u64,
    pub fee: u64,
    pub ring_size: u32,
    pub destination_count: usize,
    /// Unix seconds at submission confirmation
    pub timestamp: u64,
}

impl SettlementRecord {
    /// Ledger member string: `txHash:totalAmount:fee:ringSize:destinationCount`.
    pub fn member(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.tx_hash, self.total_amount, self.fee, self.ring_size, self.destination_count
        )
    }
}

/// Per-destination payment ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPaymentRecord {
    pub tx_hash: String,
    pub amount: u64,
    pub fee: u64,
    pub ring_size: u32,
    pub timestamp: u64,
}

impl WorkerPaymentRecord {
    /// Ledger member string: `txHash:amount:fee:ringSize`.
    pub fn member(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.tx_hash, self.amount, self.fee, self.ring_size
        )
    }
}

/// One mutation of the store. Ops are applied in order, atomically per list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Decrement a worker's balance (sent amount, or miner-paid fee)
    DecrBalance { worker: String, amount: u64 },

    /// Increment a worker's lifetime paid total
    IncrPaid { worker: String, amount: u64 },

    /// Append to the global payment ledger
    RecordPayment { record: SettlementRecord },

    /// Append to a destination address's payment ledger
    RecordWorkerPayment {
        address: String,
        record: WorkerPaymentRecord,
    },
}

/// Store capability consumed by the engine.
#[async_trait]
pub trait WorkerStore: Send + Sync {
    /// Read all workers with their balance and configured payout level.
    async fn fetch_balances(&self) -> Result<Vec<WorkerBalance>, StoreError>;

    /// Apply an ordered list of mutations as one atomic write.
    async fn commit(&self, ops: &[StoreOp]) -> Result<(), StoreError>;
}

/// Stored fields of one worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerEntry {
    #[serde(default)]
    pub balance: u64,

    #[serde(default)]
    pub min_payout_level: u64,

    #[serde(default)]
    pub paid: u64,
}

/// Time-scored ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub time: u64,
    pub member: String,
}

/// The full store contents for one coin namespace.
///
/// Shared by the in-memory and file-backed stores; the file store persists
/// it verbatim as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub workers: BTreeMap<String, WorkerEntry>,

    #[serde(default)]
    pub payments_all: Vec<LedgerEntry>,

    #[serde(default)]
    pub payments_by_address: BTreeMap<String, Vec<LedgerEntry>>,
}

impl StoreDocument {
    /// Worker balances in stable (sorted) order.
    pub fn balances(&self) -> Vec<WorkerBalance> {
        self.workers
            .iter()
            .map(|(id, entry)| WorkerBalance {
                worker_id: id.clone(),
                balance: entry.balance,
                min_payout_level: entry.min_payout_level,
            })
            .collect()
    }

    /// Apply one mutation.
    pub fn apply(&mut self, op: &StoreOp) {
        match op {
            StoreOp::DecrBalance { worker, amount } => {
                let entry = self.workers.entry(worker.clone()).or_default();
                entry.balance = entry.balance.saturating_sub(*amount);
            }
            StoreOp::IncrPaid { worker, amount } => {
                let entry = self.workers.entry(worker.clone()).or_default();
                entry.paid += amount;
            }
            StoreOp::RecordPayment { record } => {
                self.payments_all.push(LedgerEntry {
                    time: record.timestamp,
                    member: record.member(),
                });
            }
            StoreOp::RecordWorkerPayment { address, record } => {
                self.payments_by_address
                    .entry(address.clone())
                    .or_default()
                    .push(LedgerEntry {
                        time: record.timestamp,
                        member: record.member(),
                    });
            }
        }
    }

    /// Apply a list of mutations in order.
    pub fn apply_all(&mut self, ops: &[StoreOp]) {
        for op in ops {
            self.apply(op);
        }
    }
}
