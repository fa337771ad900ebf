//! Front-end configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use mockview_core::protocol_constants::{
    DEFAULT_API_BASE_URL, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_PLAYER_COMMAND,
    DEFAULT_READ_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use mockview_core::{ClientConfig, PlaybackConfig};
use serde::Deserialize;

/// Front-end configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CliConfig {
    /// Base URL of the interview backend.
    /// Override: `MOCKVIEW_API_BASE_URL`
    pub api_base_url: String,

    /// Connection timeout in seconds.
    /// Override: `MOCKVIEW_CONNECT_TIMEOUT_SECS`
    pub connect_timeout_secs: u64,

    /// Longest pause between reads of a reply, in seconds. Also bounds the
    /// wait for the first byte while the backend prepares a question.
    /// Override: `MOCKVIEW_READ_TIMEOUT_SECS`
    pub read_timeout_secs: u64,

    /// Deadline for the whole feedback request, in seconds.
    /// Override: `MOCKVIEW_REQUEST_TIMEOUT_SECS`
    pub request_timeout_secs: u64,

    /// Player program and arguments; must read MP3 from stdin.
    /// Override: `MOCKVIEW_PLAYER` (whitespace separated)
    pub player: Vec<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            player: DEFAULT_PLAYER_COMMAND.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides looked up by variable name.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("MOCKVIEW_API_BASE_URL") {
            self.api_base_url = url;
        }

        for (key, field) in [
            ("MOCKVIEW_CONNECT_TIMEOUT_SECS", &mut self.connect_timeout_secs),
            ("MOCKVIEW_READ_TIMEOUT_SECS", &mut self.read_timeout_secs),
            ("MOCKVIEW_REQUEST_TIMEOUT_SECS", &mut self.request_timeout_secs),
        ] {
            if let Some(val) = lookup(key) {
                match val.parse() {
                    Ok(secs) => *field = secs,
                    Err(_) => log::warn!("Ignoring invalid {}={}", key, val),
                }
            }
        }

        if let Some(val) = lookup("MOCKVIEW_PLAYER") {
            self.set_player(&val);
        }

        // Note: MOCKVIEW_LOG_LEVEL is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Replaces the player command with a whitespace separated command line.
    pub fn set_player(&mut self, command: &str) {
        let parts: Vec<String> = command.split_whitespace().map(str::to_string).collect();
        if !parts.is_empty() {
            self.player = parts;
        }
    }

    /// Converts to mockview-core's client configuration.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            api_base_url: self.api_base_url.clone(),
            connect_timeout_secs: self.connect_timeout_secs,
            read_timeout_secs: self.read_timeout_secs,
            request_timeout_secs: self.request_timeout_secs,
        }
    }

    /// Converts to mockview-core's playback configuration.
    pub fn to_playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            player_command: self.player.clone(),
        }
    }
}
