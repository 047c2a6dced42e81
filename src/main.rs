mod bot;
mod commands;
mod config;
mod moderation;
mod participants;
mod platform;
mod poller;
mod relay;
mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::{Pipeline, StreamSession};
use crate::commands::CommandTable;
use crate::config::Config;
use crate::moderation::ModerationFilter;
use crate::participants::ParticipantStore;
use crate::platform::youtube::YouTubeClient;
use crate::platform::{ChatProvider, Outbound};
use crate::poller::ChatPoller;
use crate::relay::WebhookRelay;
use crate::scheduler::announcements::TimedAnnouncer;
use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chatwarden=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Banned words: {}", config.banned_words.len());
    info!("  Commands: {}", config.commands.len());
    info!("  Timed messages: {}", config.timed_messages.len());

    let access_token = config.access_token()?;
    let provider: Arc<dyn ChatProvider> =
        Arc::new(YouTubeClient::new(&config.youtube.api_base_url, access_token)?);

    let live_chat_id = poller::find_live_chat_id(provider.as_ref()).await?;
    let session = StreamSession::new(live_chat_id);
    let outbound = Outbound::new(provider.clone(), session.live_chat_id.clone());

    // Timed announcements share the outbound channel with the poller
    let scheduler = Scheduler::new();
    let announcer = TimedAnnouncer::new(outbound.clone(), config.timed_messages.clone());
    let jobs = announcer.register(&scheduler)?;
    scheduler.start()?;
    info!("{} timed announcements scheduled", jobs);

    let participants = ParticipantStore::load(&config.participants_file).await?;
    let relay = Arc::new(WebhookRelay::new(config.webhook_url())?);
    info!("Webhook relay enabled: {}", relay.is_enabled());

    let commands = CommandTable::from_config(&config.commands);
    if commands.is_empty() {
        info!("No chat commands configured");
    }

    let live_chat_id = session.live_chat_id.clone();
    let pipeline = Pipeline::new(
        outbound,
        relay,
        participants,
        ModerationFilter::new(&config.banned_words, config.warning_message.clone()),
        commands,
        config.welcome_message.clone(),
        session,
    );

    info!("Bot is starting...");
    let poller = ChatPoller::new(provider, live_chat_id, pipeline);
    tokio::select! {
        _ = poller.run() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
        }
    }

    scheduler.shutdown();
    Ok(())
}
