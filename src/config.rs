use anyhow::{Context, Result};
use directories::BaseDirs;
use feed_core::Follow;
use nostr_sdk::{Keys, PublicKey};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment fallback for the private key.
pub const NSEC_ENV: &str = "NOSTR_FEED_NSEC";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub relays: Vec<RelayConfig>,
    #[serde(default)]
    pub following: Vec<FollowConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RelayConfig {
    pub url: String,
    #[serde(default = "default_true")]
    pub read: bool,
    #[serde(default = "default_true")]
    pub write: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FollowConfig {
    /// npub or hex public key
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `$XDG_CONFIG_HOME/nostr-feed/config.toml`, or `./config.toml` when no
/// home directory can be determined.
pub fn default_config_path() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.config_dir().join("nostr-feed").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let expanded_path = shellexpand::tilde(path);
        let content = fs::read_to_string(expanded_path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).with_context(|| "Failed to parse TOML config")?;

        // Apply environment variable fallback for the private key
        if config.private_key.is_none() {
            if let Ok(nsec) = std::env::var(NSEC_ENV) {
                config.private_key = Some(nsec);
            }
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for relay in &self.relays {
            if !relay.url.starts_with("wss://") && !relay.url.starts_with("ws://") {
                anyhow::bail!("Relay URL must start with ws:// or wss://: {}", relay.url);
            }
        }

        if self.read_relays().is_empty() {
            anyhow::bail!("No read relays configured");
        }

        self.follows().map(|_| ())
    }

    /// Relay URLs we subscribe on.
    pub fn read_relays(&self) -> Vec<String> {
        self.relays
            .iter()
            .filter(|r| r.read)
            .map(|r| r.url.clone())
            .collect()
    }

    pub fn keys(&self) -> Result<Keys> {
        let secret = self
            .private_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No private key configured (set private_key or {})", NSEC_ENV))?;
        Keys::parse(secret).map_err(|e| anyhow::anyhow!("Failed to parse private key: {}", e))
    }

    pub fn follows(&self) -> Result<Vec<Follow>> {
        self.following
            .iter()
            .map(|f| {
                let key = PublicKey::parse(&f.key)
                    .with_context(|| format!("Invalid follow key: {}", f.key))?;
                Ok(Follow {
                    key,
                    name: f.name.clone().filter(|n| !n.trim().is_empty()),
                })
            })
            .collect()
    }
}
