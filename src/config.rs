//! Configuration management for the price bridge
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides
//! of the API credentials.

use crate::error::{NomosError, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

mod defaults;

/// Environment variable that overrides `credentials.client_id`
pub const ENV_CLIENT_ID: &str = "NOMOS_CLIENT_ID";

/// Environment variable that overrides `credentials.client_secret`
pub const ENV_CLIENT_SECRET: &str = "NOMOS_CLIENT_SECRET";

/// Locations searched by [`Config::load`], in order
pub const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "nomos_config.yaml",
    "/data/nomos_config.yaml",
    "/etc/nomos/config.yaml",
];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OAuth client credentials for the price API
    pub credentials: CredentialsConfig,

    /// Upstream API connection settings
    pub api: ApiConfig,

    /// IANA zone used to bucket prices into local hours
    pub timezone: String,

    /// Seconds between scheduled refreshes
    pub refresh_interval_seconds: u64,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,
}

/// OAuth client credentials
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CredentialsConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Upstream API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL without trailing slash
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level
    pub console_level: Option<String>,

    /// Optional file-specific level
    pub file_level: Option<String>,

    /// Log file path or directory
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from an explicit path or the default locations,
    /// then apply environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => DEFAULT_CONFIG_PATHS
                .iter()
                .map(Path::new)
                .find(|p| p.exists())
                .map_or_else(|| Ok(Config::default()), Self::from_file)?,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay credentials from the environment; empty values are ignored
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup(ENV_CLIENT_ID).filter(|v| !v.trim().is_empty()) {
            self.credentials.client_id = id;
        }
        if let Some(secret) = lookup(ENV_CLIENT_SECRET).filter(|v| !v.trim().is_empty()) {
            self.credentials.client_secret = secret;
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parsed timezone
    pub fn tz(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|_| {
            NomosError::validation(
                "timezone".to_string(),
                format!("Unknown timezone: {}", self.timezone),
            )
        })
    }

    /// Interval between scheduled refreshes
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.credentials.client_id.trim().is_empty() {
            return Err(NomosError::validation(
                "credentials.client_id",
                "Client ID cannot be empty",
            ));
        }

        if self.credentials.client_secret.trim().is_empty() {
            return Err(NomosError::validation(
                "credentials.client_secret",
                "Client secret cannot be empty",
            ));
        }

        if self.api.base_url.trim().is_empty() {
            return Err(NomosError::validation(
                "api.base_url",
                "Base URL cannot be empty",
            ));
        }

        if self.api.timeout_seconds == 0 {
            return Err(NomosError::validation(
                "api.timeout_seconds",
                "Must be greater than 0",
            ));
        }

        self.tz()?;

        if self.refresh_interval_seconds == 0 {
            return Err(NomosError::validation(
                "refresh_interval_seconds",
                "Must be greater than 0",
            ));
        }

        if self.web.port == 0 {
            return Err(NomosError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        Ok(())
    }
}
