//! Reader supervisor configuration
//!
//! Loaded once from a TOML file at startup. Every field except the reader
//! identity and RF parameters has a default, so a minimal file only needs
//! `[reader]` and `[parameters]`.

use crate::device::probe::DEFAULT_LLRP_PORT;
use crate::device::{AdminCredentials, ReaderMode, SearchMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Factory login of the reader's administrative shell
const DEFAULT_ADMIN_USERNAME: &str = "root";
const DEFAULT_ADMIN_PASSWORD: &str = "impinj";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupervisorConfig {
    pub reader: ReaderSection,
    pub parameters: OperatingParameters,
    #[serde(default)]
    pub connection: ConnectionSection,
    #[serde(default)]
    pub admin: AdminSection,
}

/// Identity of the remote reader
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReaderSection {
    /// Display name used in logs and events
    pub name: String,
    /// Hostname or IP address
    pub address: String,
    #[serde(default = "default_llrp_port")]
    pub llrp_port: u16,
}

/// RF parameters pushed to the reader on every full configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperatingParameters {
    /// Transmit power in hundredths of a dBm (3000 = 30.00 dBm)
    pub tx_power_centi_dbm: u32,
    /// Gen2 session index (0-3)
    pub session: u16,
    #[serde(default)]
    pub search_mode: SearchMode,
    #[serde(default)]
    pub reader_mode: ReaderMode,
}

impl OperatingParameters {
    pub fn tx_power_dbm(&self) -> f64 {
        f64::from(self.tx_power_centi_dbm) / 100.0
    }
}

/// Connection supervision timings and thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionSection {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Keepalive period the reader is told to use
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    /// Missed keepalives before the reader drops the link
    #[serde(default = "default_max_keepalive_lost")]
    pub max_keepalive_lost: u16,
    /// Failed reconnects before a reboot is issued (0 disables escalation)
    #[serde(default = "default_reboot_after_reconnects")]
    pub reboot_after_reconnects: u32,
    /// Window after a disconnect during which the reader keeps its settings
    #[serde(default = "default_grace_window_secs")]
    pub grace_window_secs: u64,
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            keepalive_secs: default_keepalive_secs(),
            max_keepalive_lost: default_max_keepalive_lost(),
            reboot_after_reconnects: default_reboot_after_reconnects(),
            grace_window_secs: default_grace_window_secs(),
            health_check_interval_ms: default_health_check_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl ConnectionSection {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn grace_window(&self) -> Duration {
        Duration::from_secs(self.grace_window_secs)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Administrative shell access used for reboot escalation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminSection {
    #[serde(default = "default_admin_username")]
    pub username: String,
    /// Environment variable holding the shell password
    pub password_env: Option<String>,
    #[serde(default = "default_admin_session_timeout_ms")]
    pub session_timeout_ms: u64,
}

impl Default for AdminSection {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password_env: None,
            session_timeout_ms: default_admin_session_timeout_ms(),
        }
    }
}

impl AdminSection {
    /// Resolve credentials, falling back to the factory password when the
    /// environment variable is unset
    pub fn credentials(&self) -> AdminCredentials {
        let password = self
            .password_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
            .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string());

        AdminCredentials {
            username: self.username.clone(),
            password,
        }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}

fn default_llrp_port() -> u16 {
    DEFAULT_LLRP_PORT
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_keepalive_secs() -> u64 {
    5
}

fn default_max_keepalive_lost() -> u16 {
    3
}

fn default_reboot_after_reconnects() -> u32 {
    10
}

fn default_grace_window_secs() -> u64 {
    35
}

fn default_health_check_interval_ms() -> u64 {
    2000
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

fn default_admin_username() -> String {
    DEFAULT_ADMIN_USERNAME.to_string()
}

fn default_admin_session_timeout_ms() -> u64 {
    5000
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SupervisorConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SupervisorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reader.name.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "reader.name must not be empty".to_string(),
            ));
        }
        if self.reader.address.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "reader.address must not be empty".to_string(),
            ));
        }
        if self.parameters.session > 3 {
            return Err(ConfigError::InvalidConfig(format!(
                "parameters.session must be between 0 and 3, got {}",
                self.parameters.session
            )));
        }
        if self.connection.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "connection.connect_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.connection.keepalive_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "connection.keepalive_secs must be greater than 0".to_string(),
            ));
        }
        if self.connection.health_check_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "connection.health_check_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[reader]
name = "test-reader"
address = "127.0.0.1"

[parameters]
tx_power_centi_dbm = 3000
session = 2
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}
