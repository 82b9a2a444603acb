//! Tracing infrastructure.
//!
//! Structured, async-aware logging built on `tracing` and
//! `tracing-subscriber`. The log level comes from the application
//! configuration but can always be overridden through `RUST_LOG`.
//!
//! Initialization is idempotent: if a global subscriber is already set
//! (common in tests, where several cases may init), it returns Ok without
//! error.

use crate::config::Settings;
use crate::error::{AppResult, BridgeError};
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Initialize tracing from the loaded settings.
pub fn init_from_settings(settings: &Settings) -> AppResult<()> {
    let level = parse_log_level(&settings.application.log_level)?;
    init(level)
}

/// Initialize tracing with an explicit default level.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init(level: Level) -> AppResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let fmt_layer = fmt::layer()
        .compact()
        .with_target(true)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .or_else(|e| {
            // Already-initialized is expected when tests share a process.
            if e.to_string()
                .contains("a global default trace dispatcher has already been set")
            {
                Ok(())
            } else {
                Err(BridgeError::Configuration(format!(
                    "Failed to initialize tracing: {e}"
                )))
            }
        })
}

/// Parse a log level string into a tracing `Level`.
pub fn parse_log_level(level: &str) -> AppResult<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(BridgeError::Configuration(format!(
            "Invalid log level '{other}'. Must be one of: trace, debug, info, warn, error"
        ))),
    }
}
