pub mod youtube;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// A chat message received from the live chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Platform-specific author ID (YouTube channel id)
    pub author_id: String,
    /// Display name of the author
    pub author_display_name: String,
    /// Profile picture, when the platform provides one
    pub avatar_url: Option<String>,
    /// The message text
    pub text: String,
}

/// One page of chat returned by the provider
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub items: Vec<ChatMessage>,
    pub next_cursor: Option<String>,
    pub suggested_interval_ms: Option<u64>,
}

/// An active broadcast owned by the authorized account
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub id: String,
    pub lifecycle_status: String,
    pub live_chat_id: Option<String>,
}

/// How a provider failure should be treated by the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimited,
    Transient,
    Fatal,
}

impl ErrorKind {
    /// Delay before the next poll after a failure of this kind.
    pub fn backoff(self) -> Duration {
        match self {
            ErrorKind::RateLimited => Duration::from_millis(60_000),
            ErrorKind::Transient | ErrorKind::Fatal => Duration::from_millis(10_000),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("fatal: {0}")]
    Fatal(String),
}

impl ChatError {
    /// Classify the error. Any description mentioning "quota" counts as
    /// rate limiting regardless of the variant.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::RateLimited(_) => ErrorKind::RateLimited,
            _ if self.to_string().to_lowercase().contains("quota") => ErrorKind::RateLimited,
            ChatError::Transient(_) => ErrorKind::Transient,
            ChatError::Fatal(_) => ErrorKind::Fatal,
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        ChatError::Transient(e.to_string())
    }
}

/// The live chat provider (YouTube Live, or a fake in tests)
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn list_messages(
        &self,
        live_chat_id: &str,
        cursor: Option<&str>,
    ) -> Result<MessagePage, ChatError>;

    async fn send_message(&self, live_chat_id: &str, text: &str) -> Result<(), ChatError>;

    async fn list_active_broadcasts(&self) -> Result<Vec<Broadcast>, ChatError>;
}

/// Send primitive bound to one live chat. Cheap to clone; the poller and
/// the announcer each hold a copy.
#[derive(Clone)]
pub struct Outbound {
    provider: Arc<dyn ChatProvider>,
    live_chat_id: String,
}

impl Outbound {
    pub fn new(provider: Arc<dyn ChatProvider>, live_chat_id: impl Into<String>) -> Self {
        Self {
            provider,
            live_chat_id: live_chat_id.into(),
        }
    }

    pub fn live_chat_id(&self) -> &str {
        &self.live_chat_id
    }

    pub async fn send(&self, text: &str) -> Result<(), ChatError> {
        self.provider.send_message(&self.live_chat_id, text).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_durations() {
        assert_eq!(ErrorKind::RateLimited.backoff(), Duration::from_millis(60_000));
        assert_eq!(ErrorKind::Transient.backoff(), Duration::from_millis(10_000));
        assert_eq!(ErrorKind::Fatal.backoff(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_quota_text_counts_as_rate_limited() {
        let err = ChatError::Transient("The request cannot be completed: quotaExceeded".into());
        assert_eq!(err.kind(), ErrorKind::RateLimited);

        let err = ChatError::Transient("connection reset by peer".into());
        assert_eq!(err.kind(), ErrorKind::Transient);

        let err = ChatError::RateLimited("429 Too Many Requests".into());
        assert_eq!(err.kind(), ErrorKind::RateLimited);

        let err = ChatError::Fatal("401 Unauthorized".into());
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[tokio::test]
    async fn test_outbound_sends_to_bound_chat() {
        let provider = Arc::new(testing::FakeProvider::default());
        let outbound = Outbound::new(provider.clone(), "chat-1");
        outbound.send("hello").await.unwrap();
        assert_eq!(outbound.live_chat_id(), "chat-1");
        assert_eq!(provider.sent(), vec!["hello".to_string()]);
    }
}
