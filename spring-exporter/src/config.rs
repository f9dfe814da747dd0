//! Configuration for the Spring exporter.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mapping::is_valid_metric_name;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Scrape target settings.
    #[serde(default)]
    pub target: TargetConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The Spring endpoint to scrape and how to publish its values.
///
/// Set once at startup and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Metrics endpoint URI (default: "http://localhost:8080/metrics").
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Metric namespace prefix (default: "spring").
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure: bool,

    /// Basic auth username. Sent even when empty.
    #[serde(default)]
    pub basic_auth_user: String,

    /// Basic auth password. Sent even when empty.
    #[serde(default)]
    pub basic_auth_password: String,

    /// Request timeout covering the whole round trip (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_uri() -> String {
    "http://localhost:8080/metrics".to_string()
}

fn default_namespace() -> String {
    "spring".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl TargetConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            namespace: default_namespace(),
            insecure: false,
            basic_auth_user: String::new(),
            basic_auth_password: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Prometheus HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (default: "0.0.0.0:9420").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_listen() -> String {
    "0.0.0.0:9420".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let uri = reqwest::Url::parse(&self.target.uri).map_err(|e| {
            ConfigError::Validation(format!("Invalid target uri {}: {}", self.target.uri, e))
        })?;
        if uri.scheme() != "http" && uri.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Target uri must use http or https, got {}",
                uri.scheme()
            )));
        }

        // The namespace is followed by '_', so it only has to be a valid name prefix.
        if !self.target.namespace.is_empty() && !is_valid_metric_name(&self.target.namespace) {
            return Err(ConfigError::Validation(format!(
                "Invalid namespace: {}",
                self.target.namespace
            )));
        }

        if self.target.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        if self.server.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.server.listen
            )));
        }

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        if self.server.path == "/" || self.server.path == "/health" {
            return Err(ConfigError::Validation(format!(
                "Metrics path {} is reserved",
                self.server.path
            )));
        }

        Ok(())
    }
}
