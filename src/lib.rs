//! # Sensor Bridge Core Library
//!
//! Continuous telemetry ingestion and windowed-aggregation bridge for a
//! single embedded sensor node. The library reads a raw line-oriented sensor
//! stream, reduces it to fixed-interval aggregate records, maintains a
//! bounded sliding window of recent records, and periodically hands that
//! window to an external statistics/decision process, fanning the results
//! back out to a remote control surface and to durable storage. Discrete
//! free-text commands from the control surface travel the same bridge and
//! apply the returned action to a small actuator state.
//!
//! ## Crate Structure
//!
//! - **`config`**: typed configuration loaded from TOML and environment
//!   variables. See [`config::Settings`].
//! - **`error`**: the central [`error::BridgeError`] enum; storage failures
//!   are the only fatal class.
//! - **`logging`**: tracing initialization.
//! - **`parser`**: sensor line grammar, one [`parser::Reading`] per line.
//! - **`aggregate`**: interval reduction with carry-forward into
//!   [`aggregate::AggregateRecord`]s.
//! - **`window`**: the bounded sliding [`window::WindowBuffer`].
//! - **`storage`**: append-only CSV logs with crash-safe per-row flushing.
//! - **`analyzer`**: the [`analyzer::Analyzer`] capability and its
//!   subprocess implementation.
//! - **`stats`**: [`stats::WindowStats`] parsed from analyzer output.
//! - **`bridge`**: snapshot serialization and invocation discipline around
//!   the analyzer, plus command [`bridge::Action`]s.
//! - **`actuator`**: the tri-channel [`actuator::ActuatorState`].
//! - **`remote`**: the remote control channel seam (publisher trait,
//!   inbound control events, shipped adapters).
//! - **`serial`**: the sensor line source over the serial link.
//! - **`pipeline`**: the persistent ingestion, analysis, and control workers.

pub mod actuator;
pub mod aggregate;
pub mod analyzer;
pub mod bridge;
pub mod config;
pub mod error;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod remote;
pub mod serial;
pub mod stats;
pub mod storage;
pub mod window;
