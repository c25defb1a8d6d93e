//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `telemetry.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ServerConfig: bind address for the http api.
//!     - SystemConfig: update interval, record bound, auto cleanup toggle.
//!       reported verbatim by GET /status.
//!     - CleanupConfig: how often the prune task runs.
//!     - LoggingConfig: log level and per-reading logging.
//!
//! every key has a default, so a partial file is valid.
//!
//! ==============================================================================

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// env var naming an explicit config file
pub const CONFIG_ENV: &str = "TELEMETRY_HUB_CONFIG";

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HubConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SystemConfig {
    /// seconds between device updates, advertised to clients
    pub update_interval: u64,
    pub max_records: usize,
    pub auto_cleanup: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CleanupConfig {
    pub interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 5000 }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self { update_interval: 1, max_records: 100, auto_cleanup: true }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self { interval_seconds: 60 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl HubConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: HubConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        if config.cleanup.interval_seconds == 0 {
            anyhow::bail!("cleanup.interval_seconds must be greater than zero");
        }

        Ok(config)
    }

    /// Load with default fallback
    ///
    /// returns the config plus the path it came from, if any. logging is not
    /// initialised yet when this runs, so problems are returned as warnings
    /// for the caller to emit.
    pub fn load_or_default() -> (Self, Option<PathBuf>, Vec<String>) {
        let mut warnings = Vec::new();

        let paths = match std::env::var(CONFIG_ENV) {
            Ok(explicit) => vec![PathBuf::from(explicit)],
            Err(_) => vec![
                PathBuf::from("config").join("telemetry.toml"),
                PathBuf::from("..").join("config").join("telemetry.toml"),
            ],
        };

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => return (config, Some(path.clone()), warnings),
                    Err(e) => warnings.push(format!("Failed to load {}: {}", path.display(), e)),
                }
            } else if std::env::var_os(CONFIG_ENV).is_some() {
                warnings.push(format!("Config file {} does not exist", path.display()));
            }
        }

        warnings.push("No config file found - using defaults".to_string());
        (Self::default(), None, warnings)
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        tracing::info!(
            bind = %self.server.bind_addr(),
            update_interval = self.system.update_interval,
            max_records = self.system.max_records,
            auto_cleanup = self.system.auto_cleanup,
            cleanup_interval_seconds = self.cleanup.interval_seconds,
            log_level = %self.logging.level,
            "Configuration loaded"
        );
    }
}
