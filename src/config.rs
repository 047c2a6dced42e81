use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::platform::youtube::DEFAULT_API_BASE_URL;

pub const ACCESS_TOKEN_ENV: &str = "YOUTUBE_ACCESS_TOKEN";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default, alias = "bannedWords")]
    pub banned_words: Vec<String>,
    #[serde(default, alias = "discordWebhook")]
    pub discord_webhook: Option<WebhookConfig>,
    #[serde(default, alias = "timedMessages")]
    pub timed_messages: Vec<TimedMessage>,
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
    #[serde(default = "default_welcome_message", alias = "welcomeMessage")]
    pub welcome_message: String,
    #[serde(default = "default_warning_message", alias = "warningMessage")]
    pub warning_message: String,
    #[serde(default = "default_participants_file", alias = "participantsFile")]
    pub participants_file: PathBuf,
    #[serde(default)]
    pub youtube: YouTubeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimedMessage {
    /// Period in milliseconds
    pub interval: u64,
    pub message: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommandConfig {
    pub trigger: String,
    pub response: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct YouTubeConfig {
    /// Pre-issued OAuth bearer token. `YOUTUBE_ACCESS_TOKEN` takes precedence.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_base_url: default_api_base_url(),
        }
    }
}

fn default_welcome_message() -> String {
    "Welcome to the stream, {user}!".to_string()
}

fn default_warning_message() -> String {
    "@{user}, please keep the chat friendly.".to_string()
}

fn default_participants_file() -> PathBuf {
    PathBuf::from("participants.json")
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (i, timed) in self.timed_messages.iter().enumerate() {
            if timed.interval == 0 {
                anyhow::bail!("timed_messages[{}]: interval must be greater than 0", i);
            }
            if timed.message.trim().is_empty() {
                anyhow::bail!("timed_messages[{}]: message must not be empty", i);
            }
        }

        if let Some(webhook) = &self.discord_webhook {
            if webhook.enable && webhook.url.trim().is_empty() {
                anyhow::bail!("discord_webhook is enabled but has no url");
            }
        }

        for (i, command) in self.commands.iter().enumerate() {
            if command.trigger.trim().is_empty() {
                anyhow::bail!("commands[{}]: trigger must not be empty", i);
            }
        }

        Ok(())
    }

    /// Webhook URL, only when relaying is switched on.
    pub fn webhook_url(&self) -> Option<&str> {
        self.discord_webhook
            .as_ref()
            .filter(|w| w.enable)
            .map(|w| w.url.as_str())
    }

    /// Bearer token for the chat API, from the environment or the file.
    pub fn access_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                return Ok(token);
            }
        }
        self.youtube
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .with_context(|| {
                format!(
                    "No access token: set {} or youtube.access_token",
                    ACCESS_TOKEN_ENV
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
banned_words = ["spoiler", "Scam"]
participants_file = "data/participants.json"

[discord_webhook]
enable = true
url = "https://discord.com/api/webhooks/1/abc"

[[timed_messages]]
interval = 600000
message = "Follow the channel!"

[[commands]]
trigger = "!help"
response = "Commands: !help, !uptime"
description = "List commands"
aliases = ["!h", "!commands"]

[[commands]]
trigger = "!uptime"
response = "Live for {uptime}"
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.banned_words, vec!["spoiler", "Scam"]);
        assert_eq!(
            config.webhook_url(),
            Some("https://discord.com/api/webhooks/1/abc")
        );
        assert_eq!(config.timed_messages.len(), 1);
        assert_eq!(config.timed_messages[0].interval, 600_000);
        assert_eq!(config.commands.len(), 2);
        assert_eq!(config.commands[0].aliases, vec!["!h", "!commands"]);
        assert!(config.commands[1].aliases.is_empty());
        assert_eq!(
            config.participants_file,
            PathBuf::from("data/participants.json")
        );
        assert_eq!(config.youtube.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_defaults_for_empty_file() {
        let config = Config::parse("").unwrap();
        assert!(config.banned_words.is_empty());
        assert!(config.webhook_url().is_none());
        assert!(config.commands.is_empty());
        assert!(config.welcome_message.contains("{user}"));
        assert_eq!(config.participants_file, PathBuf::from("participants.json"));
    }

    #[test]
    fn test_camel_case_keys_accepted() {
        let raw = r#"
bannedWords = ["x"]

[discordWebhook]
enable = false
url = "https://example.invalid/hook"

[[timedMessages]]
interval = 1000
message = "hi"
"#;
        let config = Config::parse(raw).unwrap();
        assert_eq!(config.banned_words, vec!["x"]);
        assert!(config.discord_webhook.is_some());
        assert!(config.webhook_url().is_none());
        assert_eq!(config.timed_messages.len(), 1);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let raw = "[[timed_messages]]\ninterval = 0\nmessage = \"hi\"\n";
        assert!(Config::parse(raw).is_err());
    }

    #[test]
    fn test_enabled_webhook_without_url_rejected() {
        let raw = "[discord_webhook]\nenable = true\n";
        assert!(Config::parse(raw).is_err());
    }

    #[test]
    fn test_empty_trigger_rejected() {
        let raw = "[[commands]]\ntrigger = \"  \"\nresponse = \"x\"\n";
        assert!(Config::parse(raw).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.commands[1].trigger, "!uptime");
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Config::load(Path::new("/nonexistent/chatwarden.toml")).is_err());
    }

    #[test]
    fn test_access_token_from_file() {
        let config = Config::parse("[youtube]\naccess_token = \"ya29.token\"\n").unwrap();
        // The environment may carry a real token on a developer machine
        if std::env::var(ACCESS_TOKEN_ENV).is_err() {
            assert_eq!(config.access_token().unwrap(), "ya29.token");
        }
    }
}
