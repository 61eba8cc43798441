//! Human-readable coin amounts for logs and status output.

use crate::config::CoinConfig;

/// Format an atomic-unit amount as a readable coin value with symbol.
pub fn format_amount(coin: &CoinConfig, atomic: u64) -> String {
    format!("{} {}", format_amount_bare(coin, atomic), coin.symbol)
}

/// Format an atomic-unit amount without the symbol.
pub fn format_amount_bare(coin: &CoinConfig, atomic: u64) -> String {
    let decimals = coin.display_decimals() as usize;
    let value = atomic as f64 / coin.units.max(1) as f64;
    format!("{:.*}", decimals, value)
}

/// Shorten an address for notification display: first and last 7 characters.
pub fn truncate_address(address: &str) -> String {
    if address.len() <= 14 {
        return address.to_string();
    }
    format!(
        "{}...{}",
        &address[..7],
        &address[address.len() - 7..]
    )
}
