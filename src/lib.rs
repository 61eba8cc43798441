//! CryptoNote Pool Payment Processor
//!
//! A settlement engine for mining pool operators: it reads accrued worker
//! balances from the pool's store, decides who is due payment, packs payouts
//! into the minimum number of wallet transactions a greedy pass produces,
//! submits each transfer, and records debits and payment history after the
//! wallet confirms submission.
//!
//! # Architecture
//!
//! A cycle runs strictly in sequence: resolve the chain phase from the
//! current height (the underlying chain undergoes a multi-phase
//! address/asset migration), fetch balances, compute payout candidates,
//! pack transfer batches, settle each batch. The store is debited only
//! after a confirmed submission; a store failure after a confirmed
//! submission is surfaced as its own loud outcome because it is the one
//! state that risks double payment.
//!
//! External collaborators sit behind capability traits: the balance store
//! ([`store::WorkerStore`]), the wallet ([`rpc::WalletRpc`]), the chain
//! height ([`rpc::HeightSource`]), and the notification delivery
//! ([`notify::NotificationSink`]).

pub mod amounts;
pub mod batch;
pub mod candidates;
pub mod chain_state;
pub mod config;
pub mod engine;
pub mod identity;
pub mod notify;
pub mod rpc;
pub mod settle;
pub mod store;

pub use chain_state::{ChainPhase, ChainStateResolver};
pub use config::Config;
pub use engine::{CycleError, CycleOutcome, PaymentEngine, SkipReason};
pub use settle::{BatchOutcome, SettlementReport};
pub use store::{FileStore, MemoryStore, WorkerStore};
