//! Custom error types for the application.
//!
//! This module defines the primary error type, `BridgeError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different failure classes of the bridge:
//!
//! - **`Config` / `Configuration`**: loading or semantic validation of the
//!   TOML configuration failed.
//! - **`Io`**: standard `std::io::Error`, covering file and port I/O.
//! - **`Serial`**: errors from the serial link to the sensor node.
//! - **`Storage`**: the persisted CSV logs could not be opened or written.
//!   This is the only fatal class: losing write capability mid-run means
//!   silent data loss, so the owning loop propagates it and terminates.
//! - **`Analysis`**: the external analyzer failed to launch, exited non-zero,
//!   timed out, or produced no recognizable output. Always recoverable; the
//!   calling loop logs and proceeds to the next cycle.
//! - **`Snapshot`**: the window snapshot could not be serialized.
//!
//! By using `#[from]`, `BridgeError` can be seamlessly created from underlying
//! error types with the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, BridgeError>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration could not be loaded or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration loaded but failed semantic validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// I/O error outside the persisted logs.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial link to the sensor node failed.
    #[error("Serial port error: {0}")]
    Serial(String),

    /// A persisted log could not be opened or written. Fatal to the owning loop.
    #[error("Storage error: {0}")]
    Storage(String),

    /// External analyzer invocation or output parsing failed. Never fatal.
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// The window snapshot could not be serialized.
    #[error("Snapshot serialization error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl BridgeError {
    /// Whether the owning loop may log this error and continue.
    ///
    /// Storage failures are the only condition that should stop ingestion.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, BridgeError::Storage(_))
    }
}

impl From<tokio_serial::Error> for BridgeError {
    fn from(value: tokio_serial::Error) -> Self {
        BridgeError::Serial(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_fatal() {
        let err = BridgeError::Storage("disk full".into());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn analysis_errors_are_recoverable() {
        let err = BridgeError::Analysis("analyzer exited with status 1".into());
        assert!(err.is_recoverable());
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::from(std::io::ErrorKind::NotFound);
        let err: BridgeError = io.into();
        assert!(matches!(err, BridgeError::Io(_)));
    }
}
