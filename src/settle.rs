//! Settlement execution: submit each batch, then record it.
//!
//! The two external effects per batch, the wallet transfer and the store
//! debit, are not atomic together. The ordering rule is absolute: the store
//! is only touched after the wallet confirms submission. A failed submission
//! leaves balances intact and the batch becomes eligible again next cycle. A
//! failed store write after a confirmed submission is the worst state the
//! system can reach (funds sent, books not updated) and is surfaced as its
//! own outcome, never retried.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::batch::TransferBatch;
use crate::chain_state::ChainStateResolver;
use crate::rpc::{HeightSource, WalletRpc};
use crate::store::{SettlementRecord, StoreOp, WorkerPaymentRecord, WorkerStore};

/// Outcome of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Submitted and recorded
    Committed { tx_hash: String },

    /// Wallet rejected or errored; store untouched
    SubmitFailed { error: String },

    /// Funds left the wallet but the store write failed. Balances were NOT
    /// debited; the next cycle will consider these workers eligible again.
    /// Requires operator reconciliation.
    CriticalStoreFailure { tx_hash: String, error: String },
}

/// A successful payment to report to the notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    /// Destination address (payment id re-appended when the transfer
    /// carried one)
    pub address: String,

    /// Amount paid to this destination, atomic units
    pub amount: u64,
}

/// Per-cycle settlement results.
#[derive(Debug, Default)]
pub struct SettlementReport {
    pub outcomes: Vec<BatchOutcome>,
    pub notifications: Vec<PaymentNotification>,
}

impl SettlementReport {
    pub fn success_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, BatchOutcome::Committed { .. }))
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    pub fn has_critical_failure(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o, BatchOutcome::CriticalStoreFailure { .. }))
    }
}

/// Executes transfer batches against the wallet and the store.
pub struct SettlementExecutor<'a> {
    wallet: &'a dyn WalletRpc,
    store: &'a dyn WorkerStore,
    height_source: &'a dyn HeightSource,
    resolver: &'a ChainStateResolver,
    payment_id_separator: String,
}

impl<'a> SettlementExecutor<'a> {
    pub fn new(
        wallet: &'a dyn WalletRpc,
        store: &'a dyn WorkerStore,
        height_source: &'a dyn HeightSource,
        resolver: &'a ChainStateResolver,
        payment_id_separator: &str,
    ) -> Self {
        Self {
            wallet,
            store,
            height_source,
            resolver,
            payment_id_separator: payment_id_separator.to_string(),
        }
    }

    /// Settle all batches in order. Failures never abort the run; every
    /// batch gets its attempt and its own outcome.
    pub async fn settle(&self, batches: &[TransferBatch]) -> SettlementReport {
        let mut report = SettlementReport::default();

        for (index, batch) in batches.iter().enumerate() {
            let outcome = self.settle_batch(batch, index as u64, &mut report).await;

            match &outcome {
                BatchOutcome::Committed { tx_hash } => {
                    tracing::info!(
                        tx_hash = %tx_hash,
                        destinations = batch.destinations.len(),
                        amount = batch.total_amount,
                        "batch settled"
                    );
                }
                BatchOutcome::SubmitFailed { error } => {
                    tracing::error!(
                        destinations = batch.destinations.len(),
                        amount = batch.total_amount,
                        "transfer submission failed, balances untouched: {}",
                        error
                    );
                }
                BatchOutcome::CriticalStoreFailure { tx_hash, error } => {
                    tracing::error!(
                        tx_hash = %tx_hash,
                        "CRITICAL: transfer submitted but store update failed; \
                         balances not debited and double payment is likely next \
                         cycle, reconcile manually: {}",
                        error
                    );
                }
            }

            report.outcomes.push(outcome);
        }

        report
    }

    async fn settle_batch(
        &self,
        batch: &TransferBatch,
        batch_index: u64,
        report: &mut SettlementReport,
    ) -> BatchOutcome {
        // Asset overrides reflect the phase at submission time, not at
        // batch-build time
        let overrides = if self.resolver.migration_aware() {
            match self.height_source.current_height().await {
                Ok(height) => self.resolver.asset_overrides(height),
                Err(e) => {
                    return BatchOutcome::SubmitFailed {
                        error: format!("height query before submission failed: {}", e),
                    };
                }
            }
        } else {
            None
        };

        let tx_hash = match self.wallet.submit_transfer(batch, overrides.as_ref()).await {
            Ok(hash) => hash,
            Err(e) => {
                return BatchOutcome::SubmitFailed {
                    error: e.to_string(),
                };
            }
        };

        // Offset keeps ledger scores distinct across batches in one cycle
        let timestamp = unix_now() + batch_index;

        let mut ops = batch.debit_ops.clone();
        ops.push(StoreOp::RecordPayment {
            record: SettlementRecord {
                tx_hash: tx_hash.clone(),
                total_amount: batch.total_amount,
                fee: batch.fee,
                ring_size: batch.ring_size,
                destination_count: batch.destinations.len(),
                timestamp,
            },
        });

        let mut notifications = Vec::with_capacity(batch.destinations.len());
        for dest in &batch.destinations {
            let ledger_address = match &batch.payment_id {
                Some(id) => format!("{}{}{}", dest.address, self.payment_id_separator, id),
                None => dest.address.clone(),
            };
            ops.push(StoreOp::RecordWorkerPayment {
                address: ledger_address.clone(),
                record: WorkerPaymentRecord {
                    tx_hash: tx_hash.clone(),
                    amount: dest.amount,
                    fee: batch.fee,
                    ring_size: batch.ring_size,
                    timestamp,
                },
            });
            notifications.push(PaymentNotification {
                address: ledger_address,
                amount: dest.amount,
            });
        }

        match self.store.commit(&ops).await {
            Ok(()) => {
                report.notifications.extend(notifications);
                BatchOutcome::Committed { tx_hash }
            }
            Err(e) => BatchOutcome::CriticalStoreFailure {
                tx_hash,
                error: e.to_string(),
            },
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
