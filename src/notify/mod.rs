//! Miner payment notification sinks.
//!
//! Delivery of notifications (mail, chat, and so on) belongs to an external
//! collaborator; this module only hands successful payments over to it:
//! - Stdout (JSON lines)
//! - Webhook (HTTP POST)

mod stdout;
mod webhook;

pub use stdout::StdoutSink;
pub use webhook::WebhookSink;

use async_trait::async_trait;
use serde::Serialize;

use crate::amounts;
use crate::config::{CoinConfig, NotificationConfig, NotificationMode};
use crate::settle::PaymentNotification;

/// What the collaborator receives per paid destination.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// Full destination address
    pub address: String,

    /// Shortened address for display
    pub address_short: String,

    /// Amount in atomic units
    pub amount: u64,

    /// Readable amount with symbol
    pub amount_formatted: String,
}

impl NotificationPayload {
    pub fn new(payment: &PaymentNotification, coin: &CoinConfig) -> Self {
        Self {
            address: payment.address.clone(),
            address_short: amounts::truncate_address(&payment.address),
            amount: payment.amount,
            amount_formatted: amounts::format_amount(coin, payment.amount),
        }
    }
}

/// Trait for notification sinks.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Hand over one payment notification.
    async fn notify(&self, payment: &NotificationPayload) -> anyhow::Result<()>;

    /// Hand over a batch of notifications.
    async fn notify_batch(&self, payments: &[NotificationPayload]) -> anyhow::Result<()> {
        for payment in payments {
            self.notify(payment).await?;
        }
        Ok(())
    }
}

/// Create a sink from configuration. None when notifications are off.
pub fn create_sink(
    config: &NotificationConfig,
) -> anyhow::Result<Option<Box<dyn NotificationSink>>> {
    match config.mode {
        NotificationMode::None => Ok(None),
        NotificationMode::Stdout => Ok(Some(Box::new(StdoutSink::new()))),
        NotificationMode::Webhook => {
            let url = config
                .webhook_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("webhook_url required for webhook notifications"))?;
            Ok(Some(Box::new(WebhookSink::new(url)?)))
        }
    }
}
