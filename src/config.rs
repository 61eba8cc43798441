//! Configuration for the payment processor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which backend stores worker balances and payment history.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSON document on disk with atomic writes
    #[default]
    File,
    /// In-memory store (dry runs and tests; nothing survives a restart)
    Memory,
}

/// Wallet daemon family, selected once at configuration time.
///
/// Controls the shape of the transfer RPC request and which response field
/// carries the transaction hash.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DaemonFamily {
    /// Cryptonote `transfer` request
    #[default]
    Default,
    /// Legacy bytecoin-style `sendTransaction` request
    Bytecoin,
}

/// How successful payments are reported to miners.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationMode {
    /// No notifications
    #[default]
    None,
    /// Print notifications to stdout as JSON lines
    Stdout,
    /// POST notifications to a webhook URL
    Webhook,
}

/// Coin identity and display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinConfig {
    /// Coin name, used as the store namespace
    pub name: String,

    /// Ticker symbol for display
    pub symbol: String,

    /// Atomic units per whole coin
    pub units: u64,

    /// Decimal places for display (defaults to the digit count of `units`)
    pub decimal_places: Option<u32>,
}

impl CoinConfig {
    /// Decimal places to use when formatting amounts.
    pub fn display_decimals(&self) -> u32 {
        self.decimal_places
            .unwrap_or_else(|| self.units.max(1).ilog10())
    }
}

/// Store backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend kind
    #[serde(default)]
    pub backend: StoreBackend,

    /// Path of the store document (file backend)
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("pool_store.json")
}

/// Chain daemon RPC endpoint (height queries).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// JSON-RPC endpoint URL
    #[serde(default = "default_daemon_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            url: default_daemon_url(),
            timeout_secs: default_rpc_timeout(),
        }
    }
}

fn default_daemon_url() -> String {
    "http://127.0.0.1:18081/json_rpc".to_string()
}

/// Wallet daemon RPC endpoint (transfer submission).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// JSON-RPC endpoint URL
    #[serde(default = "default_wallet_url")]
    pub url: String,

    /// Daemon family, selects the transfer request shape
    #[serde(default)]
    pub family: DaemonFamily,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            url: default_wallet_url(),
            family: DaemonFamily::default(),
            timeout_secs: default_rpc_timeout(),
        }
    }
}

fn default_wallet_url() -> String {
    "http://127.0.0.1:18082/json_rpc".to_string()
}

fn default_rpc_timeout() -> u64 {
    30
}

/// Payout eligibility, rounding, and batching limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    /// Delay between settlement cycles, armed after each cycle completes
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Global minimum payout in atomic units
    pub min_payment: u64,

    /// Global maximum payout level a worker may configure
    #[serde(default)]
    pub max_payment: Option<u64>,

    /// Payout granularity; balances are rounded down to a multiple of this
    #[serde(default = "default_denomination")]
    pub denomination: u64,

    /// Network fee per transfer (per destination in dynamic mode)
    #[serde(default = "default_transfer_fee")]
    pub transfer_fee: u64,

    /// Recompute the batch fee as transfer_fee x destination count
    #[serde(default)]
    pub dynamic_transfer_fee: bool,

    /// Deduct the transfer fee from the miner's payout
    #[serde(default)]
    pub miner_pay_fee: bool,

    /// Maximum destinations per transaction
    #[serde(default = "default_max_addresses")]
    pub max_addresses: usize,

    /// Maximum total amount per transaction; destination amounts are capped,
    /// never dropped, to honor this
    #[serde(default)]
    pub max_transaction_amount: Option<u64>,

    /// Transfer priority passed through to the wallet
    #[serde(default)]
    pub priority: u32,

    /// Unlock time passed through to the wallet
    #[serde(default)]
    pub unlock_time: u64,

    /// Ring size (decoy count) for transfers
    #[serde(default = "default_ring_size")]
    pub ring_size: u32,

    /// Send the ring size in the legacy `mixin` field instead of `ring_size`
    #[serde(default)]
    pub use_mixin_field: bool,
}

fn default_interval() -> u64 {
    600
}

fn default_denomination() -> u64 {
    100
}

fn default_transfer_fee() -> u64 {
    10_000
}

fn default_max_addresses() -> usize {
    10
}

fn default_ring_size() -> u32 {
    11
}

/// Payment-id handling in worker logins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIdConfig {
    /// Separator between address and payment id in a login
    #[serde(default = "default_address_separator")]
    pub address_separator: String,
}

impl Default for PaymentIdConfig {
    fn default() -> Self {
        Self {
            address_separator: default_address_separator(),
        }
    }
}

fn default_address_separator() -> String {
    "+".to_string()
}

/// Address prefix tables.
///
/// The engine only needs boolean address classification; the prefix strings
/// configured here stand in for the chain's base58 prefix decoding, which is
/// an external concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressConfig {
    /// Prefixes of integrated addresses (payment-id-bearing by encoding)
    #[serde(default)]
    pub integrated_prefixes: Vec<String>,

    /// Prefixes of primary-chain addresses (dual-login validation)
    #[serde(default)]
    pub primary_prefixes: Vec<String>,

    /// Prefixes of migration-target addresses (dual-login validation)
    #[serde(default)]
    pub successor_prefixes: Vec<String>,
}

/// Fixed-difficulty login suffix stripping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedDiffConfig {
    /// Whether logins may carry a fixed-difficulty suffix
    #[serde(default)]
    pub enabled: bool,

    /// Separator between address and difficulty
    #[serde(default = "default_fixed_diff_separator")]
    pub address_separator: String,
}

impl Default for FixedDiffConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address_separator: default_fixed_diff_separator(),
        }
    }
}

fn default_fixed_diff_separator() -> String {
    ".".to_string()
}

/// Height thresholds of the chain migration, all optional.
///
/// A missing threshold simply never triggers its phase; the resolver degrades
/// to legacy behavior rather than failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationHeights {
    pub audit_phase1: Option<u64>,
    pub audit_complete: Option<u64>,
    pub require_dual_login: Option<u64>,
    pub carrot: Option<u64>,
}

/// Chain migration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Master switch for height-gated behavior
    #[serde(default)]
    pub enabled: bool,

    /// Separator for dual-address logins (falls back to the payment-id
    /// separator when unset)
    #[serde(default)]
    pub address_separator: Option<String>,

    /// Asset symbol below the transition height
    #[serde(default)]
    pub legacy_symbol: Option<String>,

    /// Asset symbol at and above the transition height
    #[serde(default)]
    pub successor_symbol: Option<String>,

    /// Transaction-type discriminator sent with migration-aware transfers
    #[serde(default = "default_tx_type")]
    pub tx_type: u32,

    /// Phase thresholds
    #[serde(default)]
    pub heights: MigrationHeights,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address_separator: None,
            legacy_symbol: None,
            successor_symbol: None,
            tx_type: default_tx_type(),
            heights: MigrationHeights::default(),
        }
    }
}

fn default_tx_type() -> u32 {
    3
}

/// Miner notification settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Delivery mode
    #[serde(default)]
    pub mode: NotificationMode,

    /// Webhook URL (required if mode = webhook)
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub coin: CoinConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,

    #[serde(default)]
    pub wallet: WalletConfig,

    pub payments: PaymentsConfig,

    #[serde(default)]
    pub payment_id: PaymentIdConfig,

    #[serde(default)]
    pub addresses: AddressConfig,

    #[serde(default)]
    pub fixed_diff: FixedDiffConfig,

    #[serde(default)]
    pub migration: MigrationConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.coin.units == 0 {
            anyhow::bail!("coin.units must be greater than zero");
        }

        if self.payments.denomination == 0 {
            anyhow::bail!("payments.denomination must be greater than zero");
        }

        if self.payments.max_addresses == 0 {
            anyhow::bail!("payments.max_addresses must be greater than zero");
        }

        if let Some(max) = self.payments.max_transaction_amount {
            if max == 0 {
                anyhow::bail!("payments.max_transaction_amount must be greater than zero");
            }
        }

        if let Some(max) = self.payments.max_payment {
            if max < self.payments.min_payment {
                anyhow::bail!("payments.max_payment must be >= payments.min_payment");
            }
        }

        if self.payment_id.address_separator.is_empty() {
            anyhow::bail!("payment_id.address_separator must not be empty");
        }

        if self.migration.enabled
            && (self.migration.legacy_symbol.is_none() || self.migration.successor_symbol.is_none())
        {
            tracing::warn!(
                "migration enabled without legacy/successor symbols; \
                 asset overrides will not be applied"
            );
        }

        if self.notifications.mode == NotificationMode::Webhook
            && self.notifications.webhook_url.is_none()
        {
            anyhow::bail!("notifications.webhook_url is required when mode = webhook");
        }

        Ok(())
    }

    /// Separator used for dual-address logins.
    pub fn dual_address_separator(&self) -> &str {
        self.migration
            .address_separator
            .as_deref()
            .unwrap_or(&self.payment_id.address_separator)
    }
}

/// Baseline configuration for unit tests across the crate.
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        coin: CoinConfig {
            name: "testcoin".to_string(),
            symbol: "TST".to_string(),
            units: 100_000_000,
            decimal_places: None,
        },
        store: StoreConfig::default(),
        daemon: DaemonConfig::default(),
        wallet: WalletConfig::default(),
        payments: PaymentsConfig {
            interval_secs: 600,
            min_payment: 500_000,
            max_payment: None,
            denomination: 1000,
            transfer_fee: 10_000,
            dynamic_transfer_fee: false,
            miner_pay_fee: false,
            max_addresses: 10,
            max_transaction_amount: None,
            priority: 0,
            unlock_time: 0,
            ring_size: 11,
            use_mixin_field: false,
        },
        payment_id: PaymentIdConfig::default(),
        addresses: AddressConfig::default(),
        fixed_diff: FixedDiffConfig::default(),
        migration: MigrationConfig::default(),
        notifications: NotificationConfig::default(),
    }
}
