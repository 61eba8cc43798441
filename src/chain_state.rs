//! Height-gated chain state resolution.
//!
//! The underlying chain goes through a multi-phase address/asset migration at
//! configured block heights. Everything the engine needs to know about that
//! migration is resolved here: the current phase, the effective asset symbol,
//! and the effective payout recipient for a worker login. No other module
//! derives phase behavior from raw heights.

use crate::config::Config;
use crate::identity::{self, AddressBook, ParsedRecipient};

/// Migration phase, ordered by ascending activation height.
///
/// For a fixed, non-decreasing threshold configuration the resolved phase is
/// monotonic non-decreasing in height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChainPhase {
    /// Migration feature off or height unknown
    Disabled,
    /// Below all thresholds
    Normal,
    /// Settlement globally suspended pending audit
    PayoutBlackout,
    /// Audit complete, payouts resumed
    PayoutResume,
    /// Workers must log in with a dual address; payouts go to the primary half
    DualRequired,
    /// Terminal phase; payouts go to the migration-target half
    CarrotPayouts,
}

impl ChainPhase {
    /// Whether settlement must be suppressed entirely in this phase.
    pub fn is_blackout(&self) -> bool {
        matches!(self, ChainPhase::PayoutBlackout)
    }
}

impl std::fmt::Display for ChainPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChainPhase::Disabled => "disabled",
            ChainPhase::Normal => "normal",
            ChainPhase::PayoutBlackout => "payout_blackout",
            ChainPhase::PayoutResume => "payout_resume",
            ChainPhase::DualRequired => "dual_required",
            ChainPhase::CarrotPayouts => "carrot_payouts",
        };
        f.write_str(name)
    }
}

/// Asset fields applied to a transfer when the migration is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetOverrides {
    /// Effective asset symbol for source, destination, and every destination
    /// entry of the transfer
    pub asset: String,

    /// Transaction-type discriminator
    pub tx_type: u32,
}

/// Resolves phase, asset, and recipient from the current height.
#[derive(Debug, Clone)]
pub struct ChainStateResolver {
    enabled: bool,
    audit_phase1: Option<u64>,
    audit_complete: Option<u64>,
    require_dual_login: Option<u64>,
    carrot: Option<u64>,
    legacy_symbol: Option<String>,
    successor_symbol: Option<String>,
    tx_type: u32,
    payment_id_separator: String,
    dual_separator: String,
    fixed_diff: crate::config::FixedDiffConfig,
    book: AddressBook,
}

impl ChainStateResolver {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enabled: config.migration.enabled,
            audit_phase1: config.migration.heights.audit_phase1,
            audit_complete: config.migration.heights.audit_complete,
            require_dual_login: config.migration.heights.require_dual_login,
            carrot: config.migration.heights.carrot,
            legacy_symbol: config.migration.legacy_symbol.clone(),
            successor_symbol: config.migration.successor_symbol.clone(),
            tx_type: config.migration.tx_type,
            payment_id_separator: config.payment_id.address_separator.clone(),
            dual_separator: config.dual_address_separator().to_string(),
            fixed_diff: config.fixed_diff.clone(),
            book: AddressBook::from_config(&config.addresses),
        }
    }

    /// Whether height queries are needed at all.
    pub fn migration_aware(&self) -> bool {
        self.enabled
    }

    /// Resolve the phase for a height. Unknown height or a disabled feature
    /// resolves to `Disabled`, which callers treat as legacy behavior.
    ///
    /// Thresholds are evaluated highest to lowest; the first satisfied one
    /// wins. A missing threshold never triggers its phase.
    pub fn phase(&self, height: Option<u64>) -> ChainPhase {
        if !self.enabled {
            return ChainPhase::Disabled;
        }
        let height = match height {
            Some(h) => h,
            None => return ChainPhase::Disabled,
        };

        if at_or_above(height, self.carrot) {
            ChainPhase::CarrotPayouts
        } else if at_or_above(height, self.require_dual_login) {
            ChainPhase::DualRequired
        } else if at_or_above(height, self.audit_complete) {
            ChainPhase::PayoutResume
        } else if at_or_above(height, self.audit_phase1) {
            ChainPhase::PayoutBlackout
        } else {
            ChainPhase::Normal
        }
    }

    /// Effective asset symbol at a height, independent of phase: legacy below
    /// the transition threshold, successor at or above it.
    ///
    /// Returns None when the migration is off or not fully configured, which
    /// means the transfer carries no asset fields at all.
    pub fn asset_symbol(&self, height: u64) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        let transition = self.audit_phase1?;
        let legacy = self.legacy_symbol.as_deref()?;
        let successor = self.successor_symbol.as_deref()?;

        Some(if height >= transition { successor } else { legacy })
    }

    /// Asset override fields for a transfer submitted at a height.
    pub fn asset_overrides(&self, height: u64) -> Option<AssetOverrides> {
        self.asset_symbol(height).map(|asset| AssetOverrides {
            asset: asset.to_string(),
            tx_type: self.tx_type,
        })
    }

    /// Resolve the effective payout recipient for a worker login in a phase.
    ///
    /// Dual phases fall back soft to legacy parsing when the login is not a
    /// well-formed dual address.
    pub fn resolve_recipient(&self, phase: ChainPhase, login: &str) -> ParsedRecipient {
        let mut recipient = match phase {
            ChainPhase::DualRequired => self
                .resolve_dual(login, |dual| dual.primary)
                .unwrap_or_else(|| self.parse_legacy(login)),
            ChainPhase::CarrotPayouts => self
                .resolve_dual(login, |dual| dual.successor)
                .unwrap_or_else(|| self.parse_legacy(login)),
            _ => self.parse_legacy(login),
        };

        recipient.address = identity::strip_fixed_diff(&recipient.address, &self.fixed_diff)
            .to_string();
        recipient
    }

    fn resolve_dual(
        &self,
        login: &str,
        pick: impl Fn(identity::DualAddress) -> String,
    ) -> Option<ParsedRecipient> {
        let dual = identity::parse_dual(login, &self.dual_separator, &self.book)?;
        let address = pick(dual);
        let with_payment_id = self.book.is_integrated(&address);
        Some(ParsedRecipient {
            address,
            payment_id: None,
            with_payment_id,
        })
    }

    fn parse_legacy(&self, login: &str) -> ParsedRecipient {
        identity::parse_legacy(login, &self.payment_id_separator, &self.book)
    }
}

fn at_or_above(height: u64, threshold: Option<u64>) -> bool {
    threshold.is_some_and(|t| height >= t)
}
