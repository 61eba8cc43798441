//! Payout eligibility and amount calculation.

use crate::chain_state::{ChainPhase, ChainStateResolver};
use crate::config::PaymentsConfig;
use crate::store::WorkerBalance;

/// One worker due payment this cycle. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutCandidate {
    /// Original login string; all bookkeeping stays keyed to this
    pub worker_id: String,

    /// Payout amount in atomic units, rounded to the denomination and net of
    /// any miner-paid fee
    pub amount: u64,

    /// Effective destination address for the current phase
    pub address: String,

    /// Explicit payment id carried by the login, if any
    pub payment_id: Option<String>,

    /// Whether the destination must be alone in its transaction
    pub with_payment_id: bool,
}

/// Compute payout candidates from a balance snapshot.
///
/// Workers below their effective minimum are skipped; the effective minimum
/// is the worker's configured level clamped to the global min/max. Amounts
/// are rounded down to a multiple of the denomination, and when the miner
/// pays the network fee it is deducted here. A zero or negative result
/// excludes the worker.
pub fn compute_candidates(
    balances: &[WorkerBalance],
    payments: &PaymentsConfig,
    resolver: &ChainStateResolver,
    phase: ChainPhase,
) -> Vec<PayoutCandidate> {
    let mut candidates = Vec::new();

    for worker in balances {
        let min_level = effective_min_level(worker, payments);
        if worker.balance < min_level {
            continue;
        }
        if min_level != payments.min_payment {
            tracing::debug!(
                worker = %worker.worker_id,
                level = min_level,
                default = payments.min_payment,
                "custom payout level"
            );
        }

        let rounded = worker.balance - (worker.balance % payments.denomination);
        let amount = if payments.dynamic_transfer_fee && payments.miner_pay_fee {
            match rounded.checked_sub(payments.transfer_fee) {
                Some(net) => net,
                None => continue,
            }
        } else {
            rounded
        };
        if amount == 0 {
            continue;
        }

        let recipient = resolver.resolve_recipient(phase, &worker.worker_id);

        candidates.push(PayoutCandidate {
            worker_id: worker.worker_id.clone(),
            amount,
            address: recipient.address,
            payment_id: recipient.payment_id,
            with_payment_id: recipient.with_payment_id,
        });
    }

    candidates
}

fn effective_min_level(worker: &WorkerBalance, payments: &PaymentsConfig) -> u64 {
    let mut level = if worker.min_payout_level == 0 {
        payments.min_payment
    } else {
        worker.min_payout_level
    };
    if level < payments.min_payment {
        level = payments.min_payment;
    }
    if let Some(max) = payments.max_payment {
        if level > max {
            level = max;
        }
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn worker(id: &str, balance: u64, min_level: u64) -> WorkerBalance {
        WorkerBalance {
            worker_id: id.to_string(),
            balance,
            min_payout_level: min_level,
        }
    }

    fn compute(balances: &[WorkerBalance], payments: &PaymentsConfig) -> Vec<PayoutCandidate> {
        let config = test_config();
        let resolver = ChainStateResolver::from_config(&config);
        compute_candidates(balances, payments, &resolver, ChainPhase::Disabled)
    }

    #[test]
    fn test_minimum_threshold_filters() {
        // Denomination 1000, minimum 500000: only w1 qualifies
        let config = test_config();
        let candidates = compute(
            &[worker("w1", 1_000_000, 0), worker("w2", 50, 0)],
            &config.payments,
        );

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].worker_id, "w1");
        assert_eq!(candidates[0].amount, 1_000_000);
    }

    #[test]
    fn test_denomination_rounding() {
        let config = test_config();
        let candidates = compute(&[worker("w1", 1_234_567, 0)], &config.payments);
        assert_eq!(candidates[0].amount, 1_234_000);
        assert_eq!(candidates[0].amount % config.payments.denomination, 0);
    }

    #[test]
    fn test_miner_pays_fee_deduction() {
        let mut config = test_config();
        config.payments.dynamic_transfer_fee = true;
        config.payments.miner_pay_fee = true;
        config.payments.transfer_fee = 10_000;

        let candidates = compute(&[worker("w1", 1_000_000, 0)], &config.payments);
        assert_eq!(candidates[0].amount, 990_000);
    }

    #[test]
    fn test_fee_consuming_whole_payout_excludes_worker() {
        let mut config = test_config();
        config.payments.min_payment = 1_000;
        config.payments.dynamic_transfer_fee = true;
        config.payments.miner_pay_fee = true;
        config.payments.transfer_fee = 10_000;

        // Rounded payout 9000 is below the fee
        let candidates = compute(&[worker("w1", 9_500, 0)], &config.payments);
        assert!(candidates.is_empty());

        // Exactly the fee nets to zero, also excluded
        let candidates = compute(&[worker("w1", 10_000, 0)], &config.payments);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_custom_level_clamped_to_global_bounds() {
        let mut config = test_config();
        config.payments.min_payment = 100_000;
        config.payments.max_payment = Some(2_000_000);

        // Below the global minimum: clamped up, balance 150k qualifies
        let candidates = compute(&[worker("w1", 150_000, 50_000)], &config.payments);
        assert_eq!(candidates.len(), 1);

        // Above the global maximum: clamped down to 2M
        let candidates = compute(&[worker("w1", 2_500_000, 9_000_000)], &config.payments);
        assert_eq!(candidates.len(), 1);

        // Worker raised their own level above their balance
        let candidates = compute(&[worker("w1", 500_000, 800_000)], &config.payments);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_payment_id_login_resolved() {
        let config = test_config();
        let candidates = compute(
            &[worker("addr1+deadbeefdeadbeef", 1_000_000, 0)],
            &config.payments,
        );
        assert_eq!(candidates[0].address, "addr1");
        assert_eq!(candidates[0].payment_id, Some("deadbeefdeadbeef".to_string()));
        assert!(candidates[0].with_payment_id);
        // Bookkeeping key is the original login
        assert_eq!(candidates[0].worker_id, "addr1+deadbeefdeadbeef");
    }

    #[test]
    fn test_idempotent_on_same_snapshot() {
        let config = test_config();
        let balances = vec![
            worker("w1", 1_000_000, 0),
            worker("w2+deadbeefdeadbeef", 800_000, 0),
            worker("w3", 50, 0),
        ];
        let first = compute(&balances, &config.payments);
        let second = compute(&balances, &config.payments);
        assert_eq!(first, second);
    }
}
