use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Process configuration. Loaded from `~/.typewatch/config.toml` when
/// present; every field has a default, and `DISCORD_TOKEN` overrides the
/// token so a bare environment is enough to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discord bot token. Required at startup.
    pub bot_token: String,
    /// Where the active-guild set is persisted as a JSON array.
    pub active_guilds_path: PathBuf,
    /// Seconds of typing silence before a pause is announced.
    pub stop_secs: u64,
    /// Seconds of typing silence before the status message is discarded.
    pub stale_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            active_guilds_path: PathBuf::from("active.json"),
            stop_secs: 12,
            stale_secs: 60,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|dirs| {
            dirs.home_dir()
                .join(".typewatch")
                .join("config.toml")
        })
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path(),
        };

        let mut config = match path {
            Some(ref p) if p.exists() => {
                let raw = fs::read_to_string(p)
                    .with_context(|| format!("failed to read {}", p.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("invalid config file {}", p.display()))?
            }
            _ => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("DISCORD_TOKEN") {
            if !token.is_empty() {
                self.bot_token = token;
            }
        }
    }

    pub fn stop_after(&self) -> Duration {
        Duration::from_secs(self.stop_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_secs)
    }
}
