//! One settlement cycle.
//!
//! Strictly sequential: height check, balance fetch, eligibility, batch
//! build, settle. Every error is cycle-local; the engine reports and defers
//! to the next scheduled cycle, it never takes the host process down.

use thiserror::Error;

use crate::batch;
use crate::candidates;
use crate::chain_state::{ChainPhase, ChainStateResolver};
use crate::config::Config;
use crate::rpc::{HeightSource, RpcError, WalletRpc};
use crate::settle::{SettlementExecutor, SettlementReport};
use crate::store::{StoreError, WorkerStore};

/// Errors that abort a cycle before any payment is attempted.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("height query failed: {0}")]
    HeightQuery(RpcError),

    #[error("balance fetch failed: {0}")]
    StoreRead(StoreError),
}

/// Why a cycle ended without attempting payments. Not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Settlement globally suspended at this height
    PayoutBlackout { height: u64 },

    /// No worker reached their payout threshold
    NoEligibleWorkers,
}

/// Result of a completed cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Cycle was a clean no-op
    Skipped(SkipReason),

    /// Batches were attempted; per-batch results inside
    Settled(SettlementReport),
}

/// The settlement engine. One instance, one cycle at a time.
pub struct PaymentEngine {
    config: Config,
    resolver: ChainStateResolver,
    store: Box<dyn WorkerStore>,
    wallet: Box<dyn WalletRpc>,
    height_source: Box<dyn HeightSource>,
}

impl PaymentEngine {
    pub fn new(
        config: Config,
        store: Box<dyn WorkerStore>,
        wallet: Box<dyn WalletRpc>,
        height_source: Box<dyn HeightSource>,
    ) -> Self {
        let resolver = ChainStateResolver::from_config(&config);
        Self {
            config,
            resolver,
            store,
            wallet,
            height_source,
        }
    }

    /// Delay between cycles.
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.payments.interval_secs)
    }

    /// Run one settlement cycle end to end.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        let phase = if self.resolver.migration_aware() {
            let height = self
                .height_source
                .current_height()
                .await
                .map_err(CycleError::HeightQuery)?;
            let phase = self.resolver.phase(Some(height));
            tracing::debug!(height, phase = %phase, "resolved chain phase");

            if phase.is_blackout() {
                tracing::info!(height, "payout blackout active, skipping settlement cycle");
                return Ok(CycleOutcome::Skipped(SkipReason::PayoutBlackout { height }));
            }
            phase
        } else {
            ChainPhase::Disabled
        };

        let balances = self
            .store
            .fetch_balances()
            .await
            .map_err(CycleError::StoreRead)?;

        let candidates =
            candidates::compute_candidates(&balances, &self.config.payments, &self.resolver, phase);
        if candidates.is_empty() {
            tracing::info!("no worker balances reached the minimum payment threshold");
            return Ok(CycleOutcome::Skipped(SkipReason::NoEligibleWorkers));
        }

        let batches = batch::build_batches(&candidates, &self.config.payments);
        tracing::info!(
            workers = candidates.len(),
            batches = batches.len(),
            "submitting transfer batches"
        );

        let executor = SettlementExecutor::new(
            self.wallet.as_ref(),
            self.store.as_ref(),
            self.height_source.as_ref(),
            &self.resolver,
            &self.config.payment_id.address_separator,
        );
        let report = executor.settle(&batches).await;

        tracing::info!(
            sent = report.success_count(),
            failed = report.failure_count(),
            "settlement cycle complete"
        );

        Ok(CycleOutcome::Settled(report))
    }
}
