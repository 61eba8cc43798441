//! Worker login parsing.
//!
//! A worker's login string encodes where to pay them: a bare address, an
//! address plus payment id, or (during the chain migration) a pair of
//! addresses for the old and new chain. Logins may also carry a
//! fixed-difficulty suffix that has nothing to do with payouts and must be
//! stripped.

use crate::config::{AddressConfig, FixedDiffConfig};

/// Boolean address classification backed by configured prefix tables.
///
/// Stands in for the chain's base58 prefix decode; the engine only ever
/// needs yes/no answers.
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    integrated: Vec<String>,
    primary: Vec<String>,
    successor: Vec<String>,
}

impl AddressBook {
    pub fn from_config(addresses: &AddressConfig) -> Self {
        Self {
            integrated: addresses.integrated_prefixes.clone(),
            primary: addresses.primary_prefixes.clone(),
            successor: addresses.successor_prefixes.clone(),
        }
    }

    /// Whether the address carries an embedded payment id.
    pub fn is_integrated(&self, address: &str) -> bool {
        matches_any(&self.integrated, address)
    }

    /// Whether the address is a valid primary-chain address.
    pub fn is_primary(&self, address: &str) -> bool {
        matches_any(&self.primary, address)
    }

    /// Whether the address is a valid migration-target address.
    pub fn is_successor(&self, address: &str) -> bool {
        matches_any(&self.successor, address)
    }
}

fn matches_any(prefixes: &[String], address: &str) -> bool {
    prefixes.iter().any(|p| address.starts_with(p.as_str()))
}

/// A login resolved to a single payout destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecipient {
    /// Destination address
    pub address: String,

    /// Validated explicit payment id, if the login carried one
    pub payment_id: Option<String>,

    /// Whether the destination is payment-id-bearing (explicit id or
    /// integrated address); such destinations must be alone in their
    /// transaction
    pub with_payment_id: bool,
}

/// A dual-address login from the migration window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualAddress {
    /// Primary-chain address
    pub primary: String,

    /// Migration-target address
    pub successor: String,
}

/// Validate a raw payment id segment.
///
/// Non-alphanumeric characters are stripped first; the result is accepted
/// only at exactly 16 or 64 characters.
pub fn sanitize_payment_id(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if cleaned.len() == 16 || cleaned.len() == 64 {
        Some(cleaned)
    } else {
        None
    }
}

/// Parse a login as `<address>[<sep><paymentId>]`.
pub fn parse_legacy(login: &str, separator: &str, book: &AddressBook) -> ParsedRecipient {
    let parts: Vec<&str> = login.split(separator).collect();
    let address = parts[0].to_string();
    let payment_id = parts.get(1).and_then(|raw| sanitize_payment_id(raw));

    let with_payment_id = payment_id.is_some() || book.is_integrated(&address);

    ParsedRecipient {
        address,
        payment_id,
        with_payment_id,
    }
}

/// Parse a login as `<primary><sep><successor>`, validating both halves
/// against the configured prefix tables.
///
/// Returns None when the login is not a well-formed dual address; callers
/// fall back to legacy parsing.
pub fn parse_dual(login: &str, separator: &str, book: &AddressBook) -> Option<DualAddress> {
    let parts: Vec<&str> = login.split(separator).collect();
    if parts.len() < 2 {
        return None;
    }

    let primary = parts[0];
    let successor = parts[1];

    if !book.is_primary(primary) || !book.is_successor(successor) {
        return None;
    }

    Some(DualAddress {
        primary: primary.to_string(),
        successor: successor.to_string(),
    })
}

/// Strip a fixed-difficulty suffix (`<address><sep><difficulty>`) if the
/// feature is enabled.
pub fn strip_fixed_diff<'a>(address: &'a str, fixed_diff: &FixedDiffConfig) -> &'a str {
    if !fixed_diff.enabled {
        return address;
    }
    match address.split_once(fixed_diff.address_separator.as_str()) {
        Some((base, _)) if !base.is_empty() => base,
        _ => address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> AddressBook {
        AddressBook {
            integrated: vec!["4B".to_string()],
            primary: vec!["SaLv".to_string()],
            successor: vec!["SC".to_string()],
        }
    }

    #[test]
    fn test_payment_id_lengths() {
        assert_eq!(
            sanitize_payment_id("deadbeefdeadbeef"),
            Some("deadbeefdeadbeef".to_string())
        );
        assert_eq!(sanitize_payment_id(&"a".repeat(64)), Some("a".repeat(64)));

        // 32 chars is not a valid payment id length
        assert_eq!(sanitize_payment_id("deadbeefdeadbeefdeadbeefdeadbeef"), None);
        assert_eq!(sanitize_payment_id(""), None);
    }

    #[test]
    fn test_payment_id_strips_punctuation() {
        assert_eq!(
            sanitize_payment_id("dead-beef-dead-beef!"),
            Some("deadbeefdeadbeef".to_string())
        );
    }

    #[test]
    fn test_legacy_plain_address() {
        let parsed = parse_legacy("Sa1plainaddr", "+", &book());
        assert_eq!(parsed.address, "Sa1plainaddr");
        assert_eq!(parsed.payment_id, None);
        assert!(!parsed.with_payment_id);
    }

    #[test]
    fn test_legacy_with_payment_id() {
        let parsed = parse_legacy("Sa1plainaddr+deadbeefdeadbeef", "+", &book());
        assert_eq!(parsed.address, "Sa1plainaddr");
        assert_eq!(parsed.payment_id, Some("deadbeefdeadbeef".to_string()));
        assert!(parsed.with_payment_id);
    }

    #[test]
    fn test_legacy_invalid_payment_id_discarded() {
        // 32 hex chars: wrong length, treated as a plain address
        let parsed = parse_legacy("addrA+deadbeefdeadbeefdeadbeefdeadbeef", "+", &book());
        assert_eq!(parsed.address, "addrA");
        assert_eq!(parsed.payment_id, None);
        assert!(!parsed.with_payment_id);
    }

    #[test]
    fn test_integrated_address_is_payment_id_bearing() {
        let parsed = parse_legacy("4Bintegrated", "+", &book());
        assert_eq!(parsed.payment_id, None);
        assert!(parsed.with_payment_id);

        // Even an invalid explicit id does not downgrade an integrated address
        let parsed = parse_legacy("4Bintegrated+tooshort", "+", &book());
        assert_eq!(parsed.payment_id, None);
        assert!(parsed.with_payment_id);
    }

    #[test]
    fn test_dual_parse() {
        let dual = parse_dual("SaLvOld+SCNew", "+", &book()).unwrap();
        assert_eq!(dual.primary, "SaLvOld");
        assert_eq!(dual.successor, "SCNew");
    }

    #[test]
    fn test_dual_parse_rejects_bad_halves() {
        assert!(parse_dual("SaLvOld", "+", &book()).is_none());
        assert!(parse_dual("WrongOld+SCNew", "+", &book()).is_none());
        assert!(parse_dual("SaLvOld+WrongNew", "+", &book()).is_none());
    }

    #[test]
    fn test_strip_fixed_diff() {
        let enabled = FixedDiffConfig {
            enabled: true,
            address_separator: ".".to_string(),
        };
        let disabled = FixedDiffConfig::default();

        assert_eq!(strip_fixed_diff("addr.5000", &enabled), "addr");
        assert_eq!(strip_fixed_diff("addr", &enabled), "addr");
        assert_eq!(strip_fixed_diff("addr.5000", &disabled), "addr.5000");
    }
}
