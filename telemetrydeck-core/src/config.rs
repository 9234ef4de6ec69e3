//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/telemetrydeck/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/telemetrydeck/` (~/.config/telemetrydeck/)
//! - State/Logs: `$XDG_STATE_HOME/telemetrydeck/` (~/.local/state/telemetrydeck/)

use crate::client::ClientOption;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base name of the log file inside the state directory
pub const LOG_FILE_NAME: &str = "telemetrydeck.log";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Client settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[client]` table
///
/// Every field is optional; anything left out keeps the client default.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ClientConfig {
    /// TelemetryDeck app ID (required to send anything)
    pub app_id: Option<String>,

    /// Ingest endpoint override
    pub endpoint: Option<String>,

    /// Salt appended to the user ID before hashing
    pub hash_salt: Option<String>,

    /// Explicit user identifier
    pub user_id: Option<String>,

    /// Fixed session identifier
    pub session_id: Option<String>,

    /// Send signals flagged as test data
    #[serde(default)]
    pub test_mode: bool,

    /// HTTP request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        match self.app_id.as_deref() {
            None | Some("") => {
                return Err(Error::Config("client.app_id is required".to_string()));
            }
            Some(_) => {}
        }

        if let Some(endpoint) = &self.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "client.endpoint must be an http(s) URL, got {:?}",
                    endpoint
                )));
            }
        }

        if self.timeout_secs == Some(0) {
            return Err(Error::Config(
                "client.timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Client options equivalent to this table, in application order
    pub fn to_options(&self) -> Vec<ClientOption> {
        let mut options = Vec::new();

        if let Some(endpoint) = &self.endpoint {
            options.push(ClientOption::Endpoint(endpoint.clone()));
        }
        if let Some(user_id) = &self.user_id {
            options.push(ClientOption::UserId(user_id.clone()));
        }
        if let Some(salt) = &self.hash_salt {
            options.push(ClientOption::HashSalt(salt.clone()));
        }
        if let Some(session_id) = &self.session_id {
            options.push(ClientOption::SessionId(session_id.clone()));
        }
        if self.test_mode {
            options.push(ClientOption::TestMode);
        }
        if let Some(secs) = self.timeout_secs {
            options.push(ClientOption::Timeout(Duration::from_secs(secs)));
        }

        options
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/telemetrydeck/config.toml` (~/.config/telemetrydeck/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("telemetrydeck").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/telemetrydeck/` (~/.local/state/telemetrydeck/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("telemetrydeck")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join(LOG_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::identity::hash_user_id;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.client.app_id.is_none());
        assert!(!config.client.test_mode);
        assert_eq!(config.logging.level, "info");
        assert!(config.client.to_options().is_empty());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[client]
app_id = "11111111-2222-3333-4444-555555555555"
endpoint = "http://localhost:8080/v2/"
hash_salt = "MySalt"
user_id = "somebody@example.com"
test_mode = true
timeout_secs = 10

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(
            config.client.app_id.as_deref(),
            Some("11111111-2222-3333-4444-555555555555")
        );
        assert!(config.client.test_mode);
        assert_eq!(config.client.timeout_secs, Some(10));
        assert_eq!(config.logging.level, "debug");
        assert!(config.client.validate().is_ok());
    }

    #[test]
    fn test_client_config_validation() {
        assert!(ClientConfig::default().validate().is_err());

        let config = ClientConfig {
            app_id: Some(String::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            app_id: Some("app".to_string()),
            endpoint: Some("nom.telemetrydeck.com".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            app_id: Some("app".to_string()),
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            app_id: Some("app".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_from_config() {
        let config = ClientConfig {
            app_id: Some("app".to_string()),
            endpoint: Some("http://localhost:8080/v2/".to_string()),
            hash_salt: Some("MySalt".to_string()),
            user_id: Some("somebody@example.com".to_string()),
            session_id: Some("session".to_string()),
            test_mode: true,
            timeout_secs: Some(5),
        };

        let client = Client::from_config(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v2/");
        assert_eq!(client.session_id(), "session");
        assert_eq!(
            client.user_id_hash(),
            hash_user_id("somebody@example.com", "MySalt")
        );
        assert!(client.is_test_mode());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[client]\napp_id = \"from-file\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.client.app_id.as_deref(), Some("from-file"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[client\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
