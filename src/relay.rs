use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of a webhook post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayMessage {
    pub username: String,
    pub avatar_url: Option<String>,
    pub content: String,
}

/// One-way forwarder of chat activity
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &RelayMessage) -> Result<()>;
}

/// Discord-style webhook relay. Without a URL every call is a no-op.
pub struct WebhookRelay {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookRelay {
    pub fn new(url: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self {
            client,
            url: url.map(str::to_string),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }
}

#[async_trait]
impl Notifier for WebhookRelay {
    async fn notify(&self, message: &RelayMessage) -> Result<()> {
        let Some(url) = &self.url else {
            return Ok(());
        };

        debug!("Relaying message from {} to webhook", message.username);

        let response = self
            .client
            .post(url)
            .json(message)
            .send()
            .await
            .context("Failed to send webhook request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Webhook error ({}): {}", status, body);
        }

        Ok(())
    }
}
