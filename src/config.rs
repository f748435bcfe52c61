use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/realtime.json";

pub const ENV_SOCKET_URL: &str = "COLLABFORGE_SOCKET_URL";
pub const ENV_API_URL: &str = "COLLABFORGE_API_URL";
pub const ENV_TOKEN: &str = "COLLABFORGE_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub socket_url: String,
    pub api_url: String,
    /// Bearer token; usually supplied through the environment instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub max_reconnect_attempts: u32,
    pub reconnect_base_delay_ms: u64,
    pub connect_timeout_ms: u64,
    /// A session that stays up this long restores the full reconnect budget.
    pub stable_connection_ms: u64,
    pub typing_timeout_ms: u64,
    pub typing_debounce_ms: u64,
    pub channel_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            socket_url: "http://localhost:5000".to_string(),
            api_url: "http://localhost:5000/api".to_string(),
            token: None,
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1000,
            connect_timeout_ms: 10_000,
            stable_connection_ms: 10_000,
            typing_timeout_ms: 5000,
            typing_debounce_ms: 3000,
            channel_capacity: 100,
        }
    }
}

impl AppConfig {
    /// Applies `COLLABFORGE_*` overrides on top of the file values.
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = env::var(ENV_SOCKET_URL) {
            self.socket_url = url;
        }
        if let Ok(url) = env::var(ENV_API_URL) {
            self.api_url = url;
        }
        if let Ok(token) = env::var(ENV_TOKEN) {
            self.token = Some(token);
        }
        self
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            server_url: self.socket_url.clone(),
            token: self.token.clone().filter(|token| !token.trim().is_empty()),
            max_reconnect_attempts: self.max_reconnect_attempts,
            reconnect_base_delay: Duration::from_millis(self.reconnect_base_delay_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            stable_connection: Duration::from_millis(self.stable_connection_ms),
            typing_timeout: Duration::from_millis(self.typing_timeout_ms),
            channel_capacity: self.channel_capacity.max(1),
        }
    }

    pub fn typing_debounce(&self) -> Duration {
        Duration::from_millis(self.typing_debounce_ms)
    }
}

/// Settings for one realtime session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: String,
    pub token: Option<String>,
    pub max_reconnect_attempts: u32,
    pub reconnect_base_delay: Duration,
    pub connect_timeout: Duration,
    pub stable_connection: Duration,
    pub typing_timeout: Duration,
    pub channel_capacity: usize,
}

impl ClientConfig {
    /// Delay before reconnect attempt `attempt` (1-based): linear backoff.
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        self.reconnect_base_delay.saturating_mul(attempt)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        AppConfig::default().client_config()
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &str, config: &AppConfig) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config("definitely/not/here.json");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("realtime.json");
        fs::write(&path, r#"{"socket_url":"https://chat.example","max_reconnect_attempts":2}"#)
            .unwrap();

        let config = load_config(path.to_str().unwrap());
        assert_eq!(config.socket_url, "https://chat.example");
        assert_eq!(config.max_reconnect_attempts, 2);
        assert_eq!(config.reconnect_base_delay_ms, 1000);
    }

    #[test]
    fn unparsable_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("realtime.json");
        fs::write(&path, "{ nope").unwrap();

        assert_eq!(load_config(path.to_str().unwrap()), AppConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/realtime.json");
        let path = path.to_str().unwrap();
        let config = AppConfig {
            typing_debounce_ms: 1500,
            ..AppConfig::default()
        };

        save_config(path, &config).unwrap();
        assert_eq!(load_config(path), config);
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let config = AppConfig {
            token: Some("   ".into()),
            ..AppConfig::default()
        };
        assert_eq!(config.client_config().token, None);
    }

    #[test]
    fn reconnect_delay_is_linear() {
        let config = ClientConfig::default();
        assert_eq!(config.reconnect_delay(1), Duration::from_millis(1000));
        assert_eq!(config.reconnect_delay(3), Duration::from_millis(3000));
        assert_eq!(config.reconnect_delay(5), Duration::from_millis(5000));
    }

    #[test]
    fn reconnect_delay_saturates() {
        let config = ClientConfig {
            reconnect_base_delay: Duration::MAX,
            ..ClientConfig::default()
        };
        assert_eq!(config.reconnect_delay(u32::MAX), Duration::MAX);
    }
}
