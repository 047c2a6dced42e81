use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info};

/// Durable set of chat authors that have already been welcomed.
///
/// Stored as a JSON array of ids and rewritten in full after every insert.
pub struct ParticipantStore {
    path: Option<PathBuf>,
    seen: HashSet<String>,
}

impl ParticipantStore {
    /// Load the store from disk. A missing file is an empty store.
    pub async fn load(path: &Path) -> Result<Self> {
        let seen = match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let ids: Vec<String> = serde_json::from_str(&content).with_context(|| {
                    format!("Failed to parse participants file: {}", path.display())
                })?;
                ids.into_iter().collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Participants file not found: {}, starting empty",
                    path.display()
                );
                HashSet::new()
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read participants file: {}", path.display())
                })
            }
        };

        info!("Loaded {} known participants", seen.len());
        Ok(Self {
            path: Some(path.to_path_buf()),
            seen,
        })
    }

    /// Store without a backing file
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            seen: HashSet::new(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Record a participant. Returns `true` if it was new.
    ///
    /// A failed write is logged and otherwise ignored: the in-memory set stays
    /// correct, only durability for this entry is lost.
    pub async fn insert(&mut self, id: &str) -> bool {
        if !self.seen.insert(id.to_string()) {
            return false;
        }
        if let Err(e) = self.persist().await {
            error!("Failed to persist participant {}: {:#}", id, e);
        }
        true
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut ids: Vec<&String> = self.seen.iter().collect();
        ids.sort();
        let json = serde_json::to_string_pretty(&ids)?;

        // Write-then-rename so a crash never leaves a truncated file behind
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}
