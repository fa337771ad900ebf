//! Core configuration types.
//!
//! Front-ends build these from their own configuration sources (YAML, flags,
//! environment) and hand them to the client and media backend.

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    DEFAULT_API_BASE_URL, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_PLAYER_COMMAND,
    DEFAULT_READ_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};

/// Configuration for talking to the interview backend.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the backend, without a trailing path.
    pub api_base_url: String,

    /// Connection establishment timeout (seconds).
    pub connect_timeout_secs: u64,

    /// Idle timeout between reads (seconds). Applies to every request,
    /// including the wait for the first byte of a reply. Streamed speech is
    /// never cut off by a total deadline.
    pub read_timeout_secs: u64,

    /// Whole-request deadline (seconds), applied only to JSON requests.
    pub request_timeout_secs: u64,
}

impl ClientConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        let url = self.api_base_url.trim();
        if url.is_empty() {
            return Err("api_base_url must not be empty".to_string());
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!(
                "api_base_url must start with http:// or https:// (got {})",
                url
            ));
        }
        for (name, secs) in [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("read_timeout_secs", self.read_timeout_secs),
            ("request_timeout_secs", self.request_timeout_secs),
        ] {
            if secs == 0 {
                return Err(format!("{} must be >= 1", name));
            }
        }
        Ok(())
    }

    /// Joins an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim().trim_end_matches('/'), path)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Configuration for speech playback.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Player program and arguments. The program must read MP3 from stdin
    /// and exit successfully once stdin is closed and playback finished.
    pub player_command: Vec<String>,
}

impl PlaybackConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        match self.player_command.first() {
            Some(program) if !program.trim().is_empty() => Ok(()),
            _ => Err("player_command must name a program".to_string()),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            player_command: DEFAULT_PLAYER_COMMAND.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ClientConfig::default().validate().is_ok());
        assert!(PlaybackConfig::default().validate().is_ok());
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = ClientConfig {
            api_base_url: "https://interview.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.endpoint("/start-interview"),
            "https://interview.example.com/start-interview"
        );
    }

    #[test]
    fn rejects_non_http_base_url() {
        let config = ClientConfig {
            api_base_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("http://"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = ClientConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            read_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("read_timeout_secs"));
    }

    #[test]
    fn rejects_empty_player_command() {
        let config = PlaybackConfig {
            player_command: vec![],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"api_base_url": "http://10.0.0.2:5000"}"#).unwrap();
        assert_eq!(config.api_base_url, "http://10.0.0.2:5000");
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.read_timeout_secs, DEFAULT_READ_TIMEOUT_SECS);
    }
}
