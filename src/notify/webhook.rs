//! Webhook notification sink.
//!
//! POSTs payment notifications to a configured URL.

use super::{NotificationPayload, NotificationSink};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Sink that POSTs notifications to a webhook URL.
pub struct WebhookSink {
    client: Client,
    url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl WebhookSink {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        })
    }

    async fn post_once(&self, payments: &[NotificationPayload]) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(payments)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "webhook returned status {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            );
        }

        tracing::debug!("posted {} payment notifications to webhook", payments.len());

        Ok(())
    }

    async fn post_with_retry(&self, payments: &[NotificationPayload]) -> anyhow::Result<()> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tracing::warn!("webhook notification retry {}", attempt);
                tokio::time::sleep(self.retry_delay * attempt).await;
            }

            match self.post_once(payments).await {
                Ok(()) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("unknown webhook error")))
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn notify(&self, payment: &NotificationPayload) -> anyhow::Result<()> {
        self.post_with_retry(std::slice::from_ref(payment)).await
    }

    async fn notify_batch(&self, payments: &[NotificationPayload]) -> anyhow::Result<()> {
        self.post_with_retry(payments).await
    }
}
