//! Stdout notification sink.

use super::{NotificationPayload, NotificationSink};
use async_trait::async_trait;

/// Sink that prints payment notifications to stdout as JSON lines.
pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for StdoutSink {
    async fn notify(&self, payment: &NotificationPayload) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string(payment)?);
        Ok(())
    }
}
