use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{info, warn};

use crate::config::TimedMessage;
use crate::platform::Outbound;
use crate::scheduler::Scheduler;

/// Periodic canned announcements, one repeated job per configured message.
///
/// Text is sent verbatim; placeholders are not expanded here.
pub struct TimedAnnouncer {
    outbound: Outbound,
    messages: Vec<TimedMessage>,
}

impl TimedAnnouncer {
    pub fn new(outbound: Outbound, messages: Vec<TimedMessage>) -> Self {
        Self { outbound, messages }
    }

    /// Register every announcement on the scheduler. Returns the job count.
    pub fn register(&self, scheduler: &Scheduler) -> anyhow::Result<usize> {
        info!(
            "Registering {} announcements for chat {}",
            self.messages.len(),
            self.outbound.live_chat_id()
        );
        for (i, timed) in self.messages.iter().enumerate() {
            let outbound = self.outbound.clone();
            let text: Arc<str> = Arc::from(timed.message.as_str());
            scheduler
                .add_repeated_job(
                    Duration::from_millis(timed.interval),
                    &format!("announcement-{}", i),
                    move || {
                        let outbound = outbound.clone();
                        let text = text.clone();
                        async move { announce(&outbound, &text).await }.boxed()
                    },
                )?;
        }
        Ok(self.messages.len())
    }
}

/// Send one announcement. Failures are logged and never stop the job.
pub async fn announce(outbound: &Outbound, text: &str) {
    match outbound.send(text).await {
        Ok(()) => info!("Sent timed announcement"),
        Err(e) => warn!("Failed to send timed announcement: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::FakeProvider;

    #[tokio::test]
    async fn test_announce_sends_literal_text() {
        let provider = Arc::new(FakeProvider::default());
        let outbound = Outbound::new(provider.clone(), "chat-1");
        announce(&outbound, "Hi {user}, live for {uptime}").await;
        assert_eq!(provider.sent(), vec!["Hi {user}, live for {uptime}".to_string()]);
    }

    #[tokio::test]
    async fn test_announce_failure_is_swallowed() {
        let provider = Arc::new(FakeProvider {
            fail_sends: true,
            ..Default::default()
        });
        let outbound = Outbound::new(provider.clone(), "chat-1");
        announce(&outbound, "hello").await;
        assert!(provider.sent().is_empty());
    }

    fn announcer(provider: &Arc<FakeProvider>, interval: u64) -> TimedAnnouncer {
        TimedAnnouncer::new(
            Outbound::new(provider.clone(), "chat-1"),
            vec![TimedMessage {
                interval,
                message: "Follow the channel!".into(),
            }],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeats_on_interval() {
        let provider = Arc::new(FakeProvider::default());
        let scheduler = Scheduler::new();
        assert_eq!(announcer(&provider, 1_000).register(&scheduler).unwrap(), 1);
        scheduler.start().unwrap();

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        scheduler.shutdown();

        let sent = provider.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|s| s == "Follow the channel!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_intervals_keep_millisecond_precision() {
        let every_1500 = Arc::new(FakeProvider::default());
        let every_500 = Arc::new(FakeProvider::default());
        let scheduler = Scheduler::new();
        announcer(&every_1500, 1_500).register(&scheduler).unwrap();
        announcer(&every_500, 500).register(&scheduler).unwrap();
        scheduler.start().unwrap();

        tokio::time::sleep(Duration::from_millis(3_200)).await;
        assert_eq!(every_500.sent().len(), 6);

        tokio::time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(every_1500.sent().len(), 4);
        scheduler.shutdown();
    }
}
