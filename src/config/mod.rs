mod env;
pub use env::apply_env_overrides;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::message::MessageType;

/// Complete corplink configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// Connection manager configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Push endpoint; the auth token is appended as `?token=`
    #[serde(default = "default_url")]
    pub url: String,
    /// Fixed delay before a reconnect attempt (milliseconds)
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_ms: u64,
    /// Involuntary closes tolerated before giving up
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Heartbeat period while connected (milliseconds)
    #[serde(default = "default_ping_interval")]
    pub ping_interval_ms: u64,
}

fn default_url() -> String {
    "ws://localhost:8080/api/v1/ws".to_string()
}

fn default_reconnect_interval() -> u64 {
    3_000
}

fn default_max_reconnect_attempts() -> u32 {
    10
}

fn default_ping_interval() -> u64 {
    30_000
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            reconnect_interval_ms: default_reconnect_interval(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            ping_interval_ms: default_ping_interval(),
        }
    }
}

impl WebSocketConfig {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    /// Endpoint URL with the token attached as a query parameter.
    pub fn endpoint_with_token(&self, token: &str) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}token={}", self.url, separator, urlencoding::encode(token))
    }
}

/// Monitor binary configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Message types the monitor subscribes to
    #[serde(default = "default_monitor_types")]
    pub types: Vec<MessageType>,
}

fn default_monitor_types() -> Vec<MessageType> {
    MessageType::INBOUND.to_vec()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            types: default_monitor_types(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file '{}'", path))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.websocket.url, "ws://localhost:8080/api/v1/ws");
        assert_eq!(config.websocket.reconnect_interval_ms, 3000);
        assert_eq!(config.websocket.max_reconnect_attempts, 10);
        assert_eq!(config.websocket.ping_interval_ms, 30000);
        assert_eq!(config.monitor.types.len(), MessageType::INBOUND.len());
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [websocket]
            url = "wss://office.example.com/api/v1/ws"
            reconnect_interval_ms = 500
            max_reconnect_attempts = 3
            ping_interval_ms = 10000

            [monitor]
            types = ["task.update", "notification"]
        "#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.websocket.url, "wss://office.example.com/api/v1/ws");
        assert_eq!(config.websocket.reconnect_interval(), Duration::from_millis(500));
        assert_eq!(config.websocket.max_reconnect_attempts, 3);
        assert_eq!(config.websocket.ping_interval(), Duration::from_secs(10));
        assert_eq!(
            config.monitor.types,
            vec![MessageType::TaskUpdate, MessageType::Notification]
        );
    }

    #[test]
    fn test_partial_config() {
        // Missing sections and fields use defaults
        let toml = r#"
            [websocket]
            max_reconnect_attempts = 1
        "#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.websocket.max_reconnect_attempts, 1);
        assert_eq!(config.websocket.reconnect_interval_ms, 3000);
        assert_eq!(config.monitor.types.len(), MessageType::INBOUND.len());
    }

    #[test]
    fn test_endpoint_with_token_encodes() {
        let config = WebSocketConfig::default();
        assert_eq!(
            config.endpoint_with_token("a b/c"),
            "ws://localhost:8080/api/v1/ws?token=a%20b%2Fc"
        );

        let config = WebSocketConfig {
            url: "ws://host/ws?company=7".to_string(),
            ..WebSocketConfig::default()
        };
        assert_eq!(config.endpoint_with_token("tok"), "ws://host/ws?company=7&token=tok");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[websocket]\nping_interval_ms = 1234").unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.websocket.ping_interval_ms, 1234);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/corplink.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
