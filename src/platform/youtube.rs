use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Broadcast, ChatError, ChatMessage, ChatProvider, MessagePage};

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BROADCAST_RESULTS: u32 = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveChatMessageList {
    next_page_token: Option<String>,
    polling_interval_millis: Option<u64>,
    #[serde(default)]
    items: Vec<LiveChatItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveChatItem {
    snippet: LiveChatSnippet,
    author_details: AuthorDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveChatSnippet {
    display_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorDetails {
    channel_id: String,
    display_name: String,
    profile_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BroadcastList {
    #[serde(default)]
    items: Vec<BroadcastItem>,
}

#[derive(Debug, Deserialize)]
struct BroadcastItem {
    id: String,
    status: BroadcastStatus,
    snippet: BroadcastSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BroadcastStatus {
    life_cycle_status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BroadcastSnippet {
    live_chat_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertRequest<'a> {
    snippet: InsertSnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertSnippet<'a> {
    live_chat_id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text_message_details: TextMessageDetails<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextMessageDetails<'a> {
    message_text: &'a str,
}

impl From<LiveChatMessageList> for MessagePage {
    fn from(list: LiveChatMessageList) -> Self {
        let items = list
            .items
            .into_iter()
            .filter_map(|item| {
                // Deletions, bans and other non-text events carry no display message
                let text = item.snippet.display_message?;
                Some(ChatMessage {
                    author_id: item.author_details.channel_id,
                    author_display_name: item.author_details.display_name,
                    avatar_url: item.author_details.profile_image_url,
                    text,
                })
            })
            .collect();

        MessagePage {
            items,
            next_cursor: list.next_page_token,
            suggested_interval_ms: list.polling_interval_millis,
        }
    }
}

/// Map a non-success YouTube API response onto a typed error.
///
/// Quota exhaustion arrives as 403 with `quotaExceeded` or
/// `rateLimitExceeded` in the error reason, throttling as 429.
fn classify_status(status: StatusCode, body: &str) -> ChatError {
    let description = format!("YouTube API error ({}): {}", status, body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => ChatError::RateLimited(description),
        StatusCode::FORBIDDEN
            if body.contains("quotaExceeded") || body.contains("rateLimitExceeded") =>
        {
            ChatError::RateLimited(description)
        }
        StatusCode::UNAUTHORIZED => ChatError::Fatal(description),
        _ => ChatError::Transient(description),
    }
}

/// YouTube Data API v3 client for live chat
pub struct YouTubeClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl YouTubeClient {
    pub fn new(base_url: &str, access_token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build YouTube HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ChatError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }

    /// The signed-in channel's broadcasts that are live right now
    fn broadcasts_request(&self) -> reqwest::RequestBuilder {
        let max_results = MAX_BROADCAST_RESULTS.to_string();
        self.client
            .get(format!("{}/liveBroadcasts", self.base_url))
            .bearer_auth(&self.access_token)
            .query(&[
                ("part", "snippet,status"),
                ("broadcastStatus", "active"),
                ("broadcastType", "all"),
                ("maxResults", max_results.as_str()),
            ])
    }
}

#[async_trait]
impl ChatProvider for YouTubeClient {
    async fn list_messages(
        &self,
        live_chat_id: &str,
        cursor: Option<&str>,
    ) -> Result<MessagePage, ChatError> {
        let url = format!("{}/liveChat/messages", self.base_url);
        let mut request = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("liveChatId", live_chat_id), ("part", "snippet,authorDetails")]);
        if let Some(token) = cursor {
            request = request.query(&[("pageToken", token)]);
        }

        debug!("Listing live chat messages (cursor: {:?})", cursor);
        let response = Self::check(request.send().await?).await?;
        let list: LiveChatMessageList = response
            .json()
            .await
            .map_err(|e| ChatError::Transient(format!("Failed to parse chat messages: {}", e)))?;
        Ok(list.into())
    }

    async fn send_message(&self, live_chat_id: &str, text: &str) -> Result<(), ChatError> {
        let url = format!("{}/liveChat/messages", self.base_url);
        let body = InsertRequest {
            snippet: InsertSnippet {
                live_chat_id,
                kind: "textMessageEvent",
                text_message_details: TextMessageDetails { message_text: text },
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("part", "snippet")])
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list_active_broadcasts(&self) -> Result<Vec<Broadcast>, ChatError> {
        let response = self.broadcasts_request().send().await?;
        let list: BroadcastList = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ChatError::Transient(format!("Failed to parse broadcasts: {}", e)))?;

        Ok(list
            .items
            .into_iter()
            .map(|item| Broadcast {
                id: item.id,
                lifecycle_status: item.status.life_cycle_status,
                live_chat_id: item.snippet.live_chat_id,
            })
            .collect())
    }
}
