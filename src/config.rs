//! Configuration management module.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lanbox::{AckMode, TransportKind, encode_password};

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(AppConfig),
    /// Config file missing (first run).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// LanBox connection settings.
///
/// Only `host`/`tcp_port` are used to open a channel here; the other
/// transport fields describe links the caller wires up itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port (default: 777).
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,
    /// UDP port (default: 4777).
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,
    #[serde(default = "default_serial_device")]
    pub serial_device: String,
    #[serde(default = "default_midi_device")]
    pub midi_device: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_connection_name")]
    pub connection_name: String,
}

fn default_host() -> String {
    "192.168.1.77".to_string()
}

fn default_serial_device() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_midi_device() -> String {
    "USB-MIDI".to_string()
}

fn default_password() -> String {
    "777".to_string()
}

fn default_connection_name() -> String {
    "LanBox Connection".to_string()
}

fn default_tcp_port() -> u16 {
    777
}

fn default_udp_port() -> u16 {
    4777
}

/// Session behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Connect timeout in seconds (default: 5).
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub ack_mode: AckMode,
    /// Reply timeout in seconds, used when waiting for acks (default: 5).
    #[serde(default = "default_timeout_secs")]
    pub response_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    5
}

/// Log output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for a daily-rotated log file; console only when unset.
    pub directory: Option<PathBuf>,
}

impl AppConfig {
    /// Get config file path in the platform config directory.
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "lanbox-control")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => match config.validate() {
                    Ok(()) => ConfigLoadResult::Loaded(config),
                    Err(e) => ConfigLoadResult::Invalid(e),
                },
                Err(e) => ConfigLoadResult::Invalid(ConfigError::Parse(e)),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let controller = &self.controller;
        if matches!(controller.transport, TransportKind::Tcp | TransportKind::Udp) && controller.host.trim().is_empty() {
            return Err(ConfigError::Validation("Controller host cannot be empty".to_string()));
        }
        if controller.tcp_port == 0 {
            return Err(ConfigError::Validation("TCP port must be greater than 0".to_string()));
        }
        if controller.udp_port == 0 {
            return Err(ConfigError::Validation("UDP port must be greater than 0".to_string()));
        }
        if let Err(e) = encode_password(&controller.password) {
            return Err(ConfigError::Validation(format!("Password rejected: {e}")));
        }
        if self.session.connect_timeout_secs < 1 {
            return Err(ConfigError::Validation(
                "Connect timeout must be at least 1 second".to_string(),
            ));
        }
        if self.session.response_timeout_secs < 1 {
            return Err(ConfigError::Validation(
                "Response timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to file, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl ControllerConfig {
    /// Socket address for the TCP transport.
    pub fn tcp_addr(&self) -> String {
        format!("{}:{}", self.host, self.tcp_port)
    }

    /// Human-readable endpoint for the selected transport.
    pub fn endpoint(&self) -> String {
        match self.transport {
            TransportKind::Tcp => self.tcp_addr(),
            TransportKind::Udp => format!("{}:{}", self.host, self.udp_port),
            TransportKind::Serial => self.serial_device.clone(),
            TransportKind::Midi => self.midi_device.clone(),
        }
    }
}

impl SessionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Tcp,
            host: default_host(),
            tcp_port: default_tcp_port(),
            udp_port: default_udp_port(),
            serial_device: default_serial_device(),
            midi_device: default_midi_device(),
            password: default_password(),
            connection_name: default_connection_name(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_timeout_secs(),
            ack_mode: AckMode::FireAndForget,
            response_timeout_secs: default_timeout_secs(),
        }
    }
}
