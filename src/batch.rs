//! Transfer batch packing.
//!
//! Packs payout candidates into the smallest number of wallet transactions a
//! greedy single pass produces, honoring three constraints at once: a
//! destination-count limit, a total-amount limit (amounts are capped to the
//! remaining headroom, never dropped), and payment-id exclusivity (payment
//! ids are transaction-scoped on this chain family, so a payment-id-bearing
//! destination gets a transaction to itself).
//!
//! The packer is deterministic: the same candidate sequence always yields
//! the same batches. It makes no optimality claim.

use crate::candidates::PayoutCandidate;
use crate::config::PaymentsConfig;
use crate::store::StoreOp;

/// One transfer destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub address: String,
    pub amount: u64,
}

/// A unit of atomic external submission: one wallet RPC call.
///
/// Alongside the RPC fields, a batch carries the store mutations to apply
/// only after the wallet confirms submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferBatch {
    pub destinations: Vec<Destination>,

    /// Transaction-scoped payment id
    pub payment_id: Option<String>,

    pub fee: u64,
    pub ring_size: u32,

    /// Running sum of destination amounts
    pub total_amount: u64,

    /// Debits and paid-total updates, keyed by original worker identity
    pub debit_ops: Vec<StoreOp>,
}

impl TransferBatch {
    fn new(payments: &PaymentsConfig) -> Self {
        Self {
            destinations: Vec::new(),
            payment_id: None,
            fee: payments.transfer_fee,
            ring_size: payments.ring_size,
            total_amount: 0,
            debit_ops: Vec::new(),
        }
    }
}

/// Pack candidates into transfer batches, in candidate order.
pub fn build_batches(
    candidates: &[PayoutCandidate],
    payments: &PaymentsConfig,
) -> Vec<TransferBatch> {
    let mut batches = Vec::new();
    let mut current = TransferBatch::new(payments);

    for candidate in candidates {
        // Cap to the open batch's remaining headroom. This happens before
        // the payment-id close below, so a capped amount stands even when
        // the destination ends up opening a fresh batch.
        let mut amount = candidate.amount;
        if let Some(max) = payments.max_transaction_amount {
            if amount + current.total_amount > max {
                amount = max - current.total_amount;
            }
        }

        // A payment-id-bearing destination cannot share a transaction:
        // close anything already open
        if candidate.with_payment_id && !current.destinations.is_empty() {
            batches.push(std::mem::replace(&mut current, TransferBatch::new(payments)));
        }

        current.destinations.push(Destination {
            address: candidate.address.clone(),
            amount,
        });
        if let Some(id) = &candidate.payment_id {
            current.payment_id = Some(id.clone());
        }

        current.debit_ops.push(StoreOp::DecrBalance {
            worker: candidate.worker_id.clone(),
            amount,
        });
        if payments.dynamic_transfer_fee && payments.miner_pay_fee {
            current.debit_ops.push(StoreOp::DecrBalance {
                worker: candidate.worker_id.clone(),
                amount: payments.transfer_fee,
            });
        }
        current.debit_ops.push(StoreOp::IncrPaid {
            worker: candidate.worker_id.clone(),
            amount,
        });

        current.total_amount += amount;
        if payments.dynamic_transfer_fee {
            current.fee = payments.transfer_fee * current.destinations.len() as u64;
        }

        let full = current.destinations.len() >= payments.max_addresses
            || payments
                .max_transaction_amount
                .is_some_and(|max| current.total_amount >= max)
            || candidate.with_payment_id;
        if full {
            batches.push(std::mem::replace(&mut current, TransferBatch::new(payments)));
        }
    }

    if !current.destinations.is_empty() {
        batches.push(current);
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn candidate(worker: &str, amount: u64) -> PayoutCandidate {
        PayoutCandidate {
            worker_id: worker.to_string(),
            amount,
            address: worker.to_string(),
            payment_id: None,
            with_payment_id: false,
        }
    }

    fn candidate_with_id(worker: &str, amount: u64, id: &str) -> PayoutCandidate {
        PayoutCandidate {
            worker_id: worker.to_string(),
            amount,
            address: worker.split('+').next().unwrap_or(worker).to_string(),
            payment_id: Some(id.to_string()),
            with_payment_id: true,
        }
    }

    #[test]
    fn test_single_batch() {
        let config = test_config();
        let batches = build_batches(
            &[candidate("w1", 1_000), candidate("w2", 2_000)],
            &config.payments,
        );

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].destinations.len(), 2);
        assert_eq!(batches[0].total_amount, 3_000);
        assert_eq!(batches[0].payment_id, None);
    }

    #[test]
    fn test_max_addresses_closes_batch() {
        let mut config = test_config();
        config.payments.max_addresses = 2;

        let candidates: Vec<_> = (0..5)
            .map(|i| candidate(&format!("w{}", i), 1_000))
            .collect();
        let batches = build_batches(&candidates, &config.payments);

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].destinations.len(), 2);
        assert_eq!(batches[1].destinations.len(), 2);
        assert_eq!(batches[2].destinations.len(), 1);
    }

    #[test]
    fn test_amount_capped_to_headroom() {
        let mut config = test_config();
        config.payments.max_transaction_amount = Some(5_000);

        // Second amount exceeds remaining headroom: capped to 2000, batch
        // closes at the limit, remainder is not re-queued
        let batches = build_batches(
            &[candidate("w1", 3_000), candidate("w2", 4_000)],
            &config.payments,
        );

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].destinations[1].amount, 2_000);
        assert_eq!(batches[0].total_amount, 5_000);

        // The debit matches the capped amount, so the remainder stays in
        // the worker's balance for the next cycle
        assert!(batches[0].debit_ops.contains(&StoreOp::DecrBalance {
            worker: "w2".to_string(),
            amount: 2_000,
        }));
        assert!(batches[0].debit_ops.contains(&StoreOp::IncrPaid {
            worker: "w2".to_string(),
            amount: 2_000,
        }));
    }

    #[test]
    fn test_oversized_single_candidate_capped() {
        let mut config = test_config();
        config.payments.max_transaction_amount = Some(5_000);

        let batches = build_batches(&[candidate("w1", 9_000)], &config.payments);

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].destinations[0].amount, 5_000);
    }

    #[test]
    fn test_payment_id_destination_is_alone() {
        let config = test_config();
        let batches = build_batches(
            &[
                candidate("w1", 1_000),
                candidate_with_id("w2+deadbeefdeadbeef", 2_000, "deadbeefdeadbeef"),
                candidate("w3", 3_000),
            ],
            &config.payments,
        );

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].destinations.len(), 1);
        assert_eq!(batches[1].destinations.len(), 1);
        assert_eq!(batches[1].payment_id, Some("deadbeefdeadbeef".to_string()));
        assert_eq!(batches[2].destinations.len(), 1);
        assert_eq!(batches[2].payment_id, None);
    }

    #[test]
    fn test_leading_payment_id_destination() {
        let config = test_config();
        let batches = build_batches(
            &[
                candidate_with_id("w1+deadbeefdeadbeef", 1_000, "deadbeefdeadbeef"),
                candidate("w2", 2_000),
            ],
            &config.payments,
        );

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].destinations.len(), 1);
        assert_eq!(batches[1].destinations.len(), 1);
    }

    #[test]
    fn test_dynamic_fee_tracks_destination_count() {
        let mut config = test_config();
        config.payments.dynamic_transfer_fee = true;
        config.payments.transfer_fee = 100;

        let batches = build_batches(
            &[candidate("w1", 1_000), candidate("w2", 2_000), candidate("w3", 3_000)],
            &config.payments,
        );

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].fee, 300);
    }

    #[test]
    fn test_static_fee() {
        let config = test_config();
        let batches = build_batches(&[candidate("w1", 1_000)], &config.payments);
        assert_eq!(batches[0].fee, config.payments.transfer_fee);
    }

    #[test]
    fn test_miner_paid_fee_debited() {
        let mut config = test_config();
        config.payments.dynamic_transfer_fee = true;
        config.payments.miner_pay_fee = true;
        config.payments.transfer_fee = 100;

        let batches = build_batches(&[candidate("w1", 1_000)], &config.payments);
        assert_eq!(
            batches[0].debit_ops,
            vec![
                StoreOp::DecrBalance {
                    worker: "w1".to_string(),
                    amount: 1_000,
                },
                StoreOp::DecrBalance {
                    worker: "w1".to_string(),
                    amount: 100,
                },
                StoreOp::IncrPaid {
                    worker: "w1".to_string(),
                    amount: 1_000,
                },
            ]
        );
    }

    #[test]
    fn test_amounts_conserved() {
        let mut config = test_config();
        config.payments.max_addresses = 3;
        config.payments.max_transaction_amount = Some(10_000);

        let candidates: Vec<_> = (0..10)
            .map(|i| candidate(&format!("w{}", i), 1_500 + i * 700))
            .collect();
        let batches = build_batches(&candidates, &config.payments);

        // Every batch honors both limits
        for batch in &batches {
            assert!(batch.destinations.len() <= 3);
            assert!(batch.total_amount <= 10_000);
            let sum: u64 = batch.destinations.iter().map(|d| d.amount).sum();
            assert_eq!(sum, batch.total_amount);
        }

        // Packing neither creates nor loses amounts beyond capping
        let packed: u64 = batches.iter().map(|b| b.total_amount).sum();
        let requested: u64 = candidates.iter().map(|c| c.amount).sum();
        assert!(packed <= requested);

        // Debits mirror exactly what was packed
        let debited: u64 = batches
            .iter()
            .flat_map(|b| &b.debit_ops)
            .filter_map(|op| match op {
                StoreOp::DecrBalance { amount, .. } => Some(*amount),
                _ => None,
            })
            .sum();
        assert_eq!(debited, packed);
    }

    #[test]
    fn test_deterministic() {
        let mut config = test_config();
        config.payments.max_addresses = 4;
        config.payments.max_transaction_amount = Some(7_000);

        let candidates: Vec<_> = (0..12)
            .map(|i| candidate(&format!("w{}", i), 900 + i * 333))
            .collect();

        let first = build_batches(&candidates, &config.payments);
        let second = build_batches(&candidates, &config.payments);
        assert_eq!(first, second);
    }
}
