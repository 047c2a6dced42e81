use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::CommandConfig;

/// A chat command loaded from config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Canonical lowercase trigger
    pub trigger: String,
    /// Response template
    pub response: String,
    /// Shown in the load log only
    pub description: Option<String>,
    /// Lowercased aliases
    pub aliases: Vec<String>,
}

/// Values available to a response template
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub user: &'a str,
    pub uptime_ms: i64,
    pub text: &'a str,
}

/// Static mapping from lowercase trigger text (and every alias) to a command.
///
/// Keys share one flat namespace. When two definitions claim the same key the
/// one loaded later wins; a command's aliases are inserted after its trigger.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: Vec<Command>,
    keys: HashMap<String, usize>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(defs: &[CommandConfig]) -> Self {
        let mut table = Self::new();
        for def in defs {
            table.register(Command {
                trigger: def.trigger.trim().to_lowercase(),
                response: def.response.clone(),
                description: def.description.clone(),
                aliases: def
                    .aliases
                    .iter()
                    .map(|a| a.trim().to_lowercase())
                    .filter(|a| !a.is_empty())
                    .collect(),
            });
        }
        debug!("Loaded {} commands ({} keys)", table.len(), table.keys.len());
        table
    }

    /// Register a command under its trigger and all of its aliases
    pub fn register(&mut self, command: Command) {
        debug!(
            "Registering command {} ({})",
            command.trigger,
            command.description.as_deref().unwrap_or("no description")
        );
        let index = self.commands.len();
        let keys = std::iter::once(command.trigger.clone())
            .chain(command.aliases.iter().cloned());
        for key in keys {
            if let Some(previous) = self.keys.insert(key.clone(), index) {
                warn!(
                    "Command key '{}' redefined: '{}' replaces '{}'",
                    key, command.trigger, self.commands[previous].trigger
                );
            }
        }
        self.commands.push(command);
    }

    /// Exact lookup of an already-lowercased key
    pub fn get(&self, key: &str) -> Option<&Command> {
        self.keys.get(key).map(|&i| &self.commands[i])
    }

    /// Find the command a chat message invokes.
    ///
    /// The whole lowercased message must equal a key. The only exception is a
    /// template that takes `{args}`: then the first token alone selects it.
    pub fn resolve(&self, text: &str) -> Option<&Command> {
        let normalized = text.trim().to_lowercase();
        if let Some(command) = self.get(&normalized) {
            return Some(command);
        }
        let first = normalized.split_whitespace().next()?;
        self.get(first)
            .filter(|command| command.response.contains("{args}"))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Command {
    /// Fill in `{user}`, `{uptime}` and `{args}`
    pub fn render(&self, ctx: &RenderContext<'_>) -> String {
        render_template(&self.response, ctx)
    }
}

pub fn render_template(template: &str, ctx: &RenderContext<'_>) -> String {
    substitute(template, |name| match name {
        "user" => Some(ctx.user.to_string()),
        "uptime" => Some(format_uptime(ctx.uptime_ms)),
        "args" => Some(strip_first_token(ctx.text).to_string()),
        _ => None,
    })
}

/// Fill in `{user}` only
pub fn render_user(template: &str, user: &str) -> String {
    substitute(template, |name| (name == "user").then(|| user.to_string()))
}

/// Single left-to-right pass over `{name}` placeholders.
///
/// Substituted values are copied verbatim and never rescanned. Names the
/// lookup doesn't know stay as written, braces included.
fn substitute(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after
            .find('}')
            .and_then(|close| lookup(&after[..close]).map(|v| (v, close)));
        match value {
            Some((value, close)) => {
                out.push_str(&value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Message text without its first whitespace-delimited token
pub fn strip_first_token(text: &str) -> &str {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(pos) => text[pos..].trim(),
        None => "",
    }
}

/// Elapsed milliseconds as `"{h}h {m}m {s}s"`
pub fn format_uptime(elapsed_ms: i64) -> String {
    let total_secs = elapsed_ms.max(0) / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{}h {}m {}s", hours, minutes, seconds)
}
