use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::commands::{render_user, CommandTable, RenderContext};
use crate::moderation::ModerationFilter;
use crate::participants::ParticipantStore;
use crate::platform::{ChatMessage, Outbound};
use crate::relay::{Notifier, RelayMessage};

const MODERATION_RELAY_NAME: &str = "Moderation";

/// The broadcast the bot is attached to, fixed for the process lifetime
#[derive(Debug, Clone)]
pub struct StreamSession {
    pub started_at: DateTime<Utc>,
    pub live_chat_id: String,
}

impl StreamSession {
    pub fn new(live_chat_id: impl Into<String>) -> Self {
        Self {
            started_at: Utc::now(),
            live_chat_id: live_chat_id.into(),
        }
    }

    pub fn uptime_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }
}

/// What the pipeline ended up doing with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Moderated,
    Command(String),
    Ignored,
}

/// Per-message decision pipeline: relay, welcome, moderation, commands.
///
/// The order is fixed. Welcoming never short-circuits; moderation does.
pub struct Pipeline {
    outbound: Outbound,
    relay: Arc<dyn Notifier>,
    participants: ParticipantStore,
    moderation: ModerationFilter,
    commands: CommandTable,
    welcome_template: String,
    session: StreamSession,
}

impl Pipeline {
    pub fn new(
        outbound: Outbound,
        relay: Arc<dyn Notifier>,
        participants: ParticipantStore,
        moderation: ModerationFilter,
        commands: CommandTable,
        welcome_template: impl Into<String>,
        session: StreamSession,
    ) -> Self {
        Self {
            outbound,
            relay,
            participants,
            moderation,
            commands,
            welcome_template: welcome_template.into(),
            session,
        }
    }

    pub async fn handle(&mut self, msg: &ChatMessage) -> Outcome {
        info!(
            "Chat message from {} ({}): {}",
            msg.author_display_name, msg.author_id, msg.text
        );

        self.forward(RelayMessage {
            username: msg.author_display_name.clone(),
            avatar_url: msg.avatar_url.clone(),
            content: msg.text.clone(),
        })
        .await;

        if self.participants.insert(&msg.author_id).await {
            info!("New participant: {}", msg.author_display_name);
            let welcome = render_user(&self.welcome_template, &msg.author_display_name);
            self.reply(&welcome).await;
        }

        if let Some(word) = self.moderation.offending_word(&msg.text) {
            info!(
                "Moderating message from {} (matched '{}')",
                msg.author_display_name, word
            );
            let warning = self.moderation.warning_for(&msg.author_display_name);
            self.reply(&warning).await;
            self.forward(RelayMessage {
                username: MODERATION_RELAY_NAME.to_string(),
                avatar_url: None,
                content: self.moderation.notice_for(&msg.author_display_name, &msg.text),
            })
            .await;
            return Outcome::Moderated;
        }

        let Some(command) = self.commands.resolve(&msg.text) else {
            return Outcome::Ignored;
        };
        let trigger = command.trigger.clone();
        let response = command.render(&self.render_context(msg));
        info!("Command {} from {}", trigger, msg.author_display_name);
        self.reply(&response).await;
        Outcome::Command(trigger)
    }

    fn render_context<'a>(&self, msg: &'a ChatMessage) -> RenderContext<'a> {
        RenderContext {
            user: &msg.author_display_name,
            uptime_ms: self.session.uptime_ms(),
            text: &msg.text,
        }
    }

    async fn reply(&self, text: &str) {
        if let Err(e) = self.outbound.send(text).await {
            warn!("Failed to send chat reply: {}", e);
        }
    }

    async fn forward(&self, message: RelayMessage) {
        if let Err(e) = self.relay.notify(&message).await {
            warn!("Failed to relay message: {:#}", e);
        }
    }
}
