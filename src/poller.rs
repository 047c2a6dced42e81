//! Live chat polling loop.
//!
//! The poller owns the page cursor and feeds each new message through the
//! [`Pipeline`] one at a time. It never gives up: every failure becomes a
//! delay before the next attempt.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::bot::Pipeline;
use crate::platform::{ChatError, ChatProvider, ErrorKind};

/// Delay used when the provider does not suggest one
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5_000);
/// Floor applied to the provider's suggestion
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

const LIVE_STATUS: &str = "live";

/// Pick the chat of the broadcast that is currently live.
pub async fn find_live_chat_id(provider: &dyn ChatProvider) -> Result<String> {
    let broadcasts = provider
        .list_active_broadcasts()
        .await
        .context("Failed to list broadcasts")?;

    if broadcasts.is_empty() {
        anyhow::bail!("No active broadcasts found for this account");
    }

    let live = broadcasts
        .iter()
        .find(|b| b.lifecycle_status == LIVE_STATUS)
        .with_context(|| {
            format!(
                "None of the {} active broadcasts is live",
                broadcasts.len()
            )
        })?;

    let chat_id = live
        .live_chat_id
        .clone()
        .with_context(|| format!("Live broadcast {} has no chat", live.id))?;

    info!("Attached to live broadcast {} (chat {})", live.id, chat_id);
    Ok(chat_id)
}

/// Delay before the next poll after a successful fetch
pub fn next_delay(suggested_ms: Option<u64>) -> Duration {
    match suggested_ms {
        Some(ms) => Duration::from_millis(ms).max(MIN_POLL_INTERVAL),
        None => DEFAULT_POLL_INTERVAL,
    }
}

/// Delay before the next poll after a failure
pub fn backoff_for(err: &ChatError) -> Duration {
    err.kind().backoff()
}

pub struct ChatPoller {
    provider: Arc<dyn ChatProvider>,
    live_chat_id: String,
    pipeline: Pipeline,
    cursor: Option<String>,
    first_run: bool,
}

impl ChatPoller {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        live_chat_id: impl Into<String>,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            provider,
            live_chat_id: live_chat_id.into(),
            pipeline,
            cursor: None,
            first_run: true,
        }
    }

    /// Poll forever
    pub async fn run(mut self) {
        info!("Chat poller started for {}", self.live_chat_id);
        loop {
            let delay = self.poll_once().await;
            debug!(
                "Next poll in {}ms (cursor: {:?})",
                delay.as_millis(),
                self.cursor()
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Run a single poll and return how long to wait before the next one.
    pub async fn poll_once(&mut self) -> Duration {
        match self.fetch_and_process().await {
            Ok(delay) => delay,
            Err(e) => {
                let delay = backoff_for(&e);
                match e.kind() {
                    ErrorKind::RateLimited => {
                        warn!("Chat poll rate limited, backing off {}ms: {}", delay.as_millis(), e)
                    }
                    ErrorKind::Transient => {
                        warn!("Chat poll failed, retrying in {}ms: {}", delay.as_millis(), e)
                    }
                    ErrorKind::Fatal => {
                        error!("Chat poll failed, retrying in {}ms: {}", delay.as_millis(), e)
                    }
                }
                delay
            }
        }
    }

    async fn fetch_and_process(&mut self) -> Result<Duration, ChatError> {
        let page = self
            .provider
            .list_messages(&self.live_chat_id, self.cursor.as_deref())
            .await?;

        if self.first_run {
            // Skip the backlog that built up before we attached
            info!("Skipping {} messages from chat history", page.items.len());
            self.first_run = false;
        } else {
            for msg in &page.items {
                self.pipeline.handle(msg).await;
            }
        }

        self.cursor = page.next_cursor;
        Ok(next_delay(page.suggested_interval_ms))
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }
}
