//! Configuration management for Costwatch

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store configuration
    pub store: StoreConfig,

    /// Telemetry log configuration
    pub telemetry: TelemetryConfig,

    /// Alerting configuration
    pub alerting: AlertingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from defaults, an optional TOML file, and
    /// `COSTWATCH_*` environment overrides (e.g. `COSTWATCH_STORE__PATH`)
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder
            .add_source(
                config::Environment::with_prefix("COSTWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| Error::config(e.to_string()))
    }
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let base = directories::ProjectDirs::from("io", "costwatch", "costwatch")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            path: base.join("costwatch.db"),
        }
    }
}

/// Telemetry log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Path to the append-only JSON-lines usage log
    pub log_path: PathBuf,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        let base = directories::ProjectDirs::from("io", "costwatch", "costwatch")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            log_path: base.join("usage.jsonl"),
        }
    }
}

/// Alerting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Evaluation window in minutes for rate and latency metrics
    /// (daily cost always uses a trailing 24 hours)
    pub window_minutes: i64,

    /// Webhook delivery timeout in seconds
    pub delivery_timeout_seconds: u64,
}

impl AlertingConfig {
    /// Delivery timeout as a `Duration`
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_seconds)
    }
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            window_minutes: 60,
            delivery_timeout_seconds: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();

        assert_eq!(config.alerting.window_minutes, 60);
        assert_eq!(config.alerting.delivery_timeout_seconds, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn loads_without_a_file() {
        let config = Config::load(None).unwrap();

        assert_eq!(config.alerting.window_minutes, 60);
    }
}
