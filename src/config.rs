//! Configuration system using Figment.
//!
//! Strongly-typed configuration loading for the bridge. Configuration is
//! merged from:
//! 1. a TOML file (default `config/bridge.toml`)
//! 2. environment variables prefixed with `SENSOR_BRIDGE_`, with `__`
//!    separating the section from the key so that keys containing an
//!    underscore stay addressable
//!    (e.g. `SENSOR_BRIDGE_APPLICATION__LOG_LEVEL=debug`,
//!    `SENSOR_BRIDGE_AGGREGATION__WINDOW_SIZE=5`)
//!
//! Every field carries a default matching the deployed sensor node, so a
//! missing file section falls back to a runnable configuration.

use crate::error::{AppResult, BridgeError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application-level settings.
    #[serde(default)]
    pub application: ApplicationSettings,
    /// Serial link to the sensor node.
    #[serde(default)]
    pub serial: SerialSettings,
    /// Interval aggregation and window sizing.
    #[serde(default)]
    pub aggregation: AggregationSettings,
    /// Persisted log and snapshot locations.
    #[serde(default)]
    pub storage: StorageSettings,
    /// External analyzer invocation.
    #[serde(default)]
    pub analyzer: AnalyzerSettings,
}

/// Application-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Serial port configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Serial port path (e.g. "/dev/ttyUSB0", "COM4").
    #[serde(default = "default_port")]
    pub port: String,
    /// Communication speed.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Per-read timeout so the interval tick stays prompt with no traffic.
    #[serde(with = "humantime_serde", default = "default_read_timeout")]
    pub read_timeout: Duration,
}

/// Aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationSettings {
    /// Fixed reduction interval; one `AggregateRecord` is emitted per elapsed
    /// interval.
    #[serde(with = "humantime_serde", default = "default_interval")]
    pub interval: Duration,
    /// Window capacity in records. The analysis cycle period is
    /// `window_size * interval`.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Append-only log of aggregate records.
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    /// Append-only log of derived window statistics.
    #[serde(default = "default_stats_path")]
    pub stats_path: PathBuf,
    /// Intermediate window snapshot handed to the analyzer.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

/// External analyzer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerSettings {
    /// Analyzer executable, invoked as `<program> --window <snapshot>` or
    /// `<program> --cmd <snapshot> <text>`.
    #[serde(default = "default_analyzer_program")]
    pub program: PathBuf,
    /// Upper bound on one analyzer invocation; a timeout is an analysis
    /// error, not a hang.
    #[serde(with = "humantime_serde", default = "default_analyzer_timeout")]
    pub timeout: Duration,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_read_timeout() -> Duration {
    Duration::from_millis(100)
}

fn default_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_window_size() -> usize {
    90
}

fn default_history_path() -> PathBuf {
    PathBuf::from("sensor_history.csv")
}

fn default_stats_path() -> PathBuf {
    PathBuf::from("window_stats.csv")
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("window_snapshot.json")
}

fn default_analyzer_program() -> PathBuf {
    PathBuf::from("analyzer")
}

fn default_analyzer_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            read_timeout: default_read_timeout(),
        }
    }
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            window_size: default_window_size(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
            stats_path: default_stats_path(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            program: default_analyzer_program(),
            timeout: default_analyzer_timeout(),
        }
    }
}

impl Settings {
    /// Load configuration from the default file and environment variables.
    pub fn load() -> AppResult<Self> {
        Self::load_from("config/bridge.toml")
    }

    /// Load configuration from a specific file path.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SENSOR_BRIDGE_").split("__"))
            .extract()?;
        Ok(settings)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(BridgeError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.aggregation.interval.is_zero() {
            return Err(BridgeError::Configuration(
                "aggregation.interval must be greater than zero".to_string(),
            ));
        }

        if self.aggregation.window_size == 0 {
            return Err(BridgeError::Configuration(
                "aggregation.window_size must be at least 1".to_string(),
            ));
        }

        if self.serial.read_timeout.is_zero() {
            return Err(BridgeError::Configuration(
                "serial.read_timeout must be greater than zero".to_string(),
            ));
        }

        if self.analyzer.timeout.is_zero() {
            return Err(BridgeError::Configuration(
                "analyzer.timeout must be greater than zero".to_string(),
            ));
        }

        if self.storage.history_path == self.storage.stats_path {
            return Err(BridgeError::Configuration(
                "storage.history_path and storage.stats_path must differ".to_string(),
            ));
        }

        Ok(())
    }

    /// Period of the window analysis cycle: one full window's worth of records.
    pub fn analysis_period(&self) -> Duration {
        self.aggregation.interval * self.aggregation.window_size as u32
    }
}
