//! Remote control channel seam.
//!
//! The physical transport to the control surface (cloud pub/sub, dashboard,
//! serial console) is an adapter detail outside the core. The core only
//! needs two things:
//!
//! - an outbound [`RemotePublisher`]: publish a named value, at-most-once,
//!   fire-and-forget (delivery failures are logged, never retried);
//! - an inbound stream of [`ControlEvent`]s delivered over an mpsc channel
//!   by whatever adapter fronts the transport.
//!
//! Two adapters ship with the binary: [`TracingPublisher`], which surfaces
//! publishes as structured log events, and [`spawn_stdin_control`], which
//! turns console lines into control events for headless operation.

use crate::actuator::Channel;
use crate::error::AppResult;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Outbound topic names.
pub mod topics {
    /// LED channel state.
    pub const LED: &str = "led";
    /// Motor channel state.
    pub const MOTOR: &str = "motor";
    /// Buzzer channel state.
    pub const BUZZER: &str = "buzzer";
    /// Window temperature mean.
    pub const TEMP_MEAN: &str = "temp/mean";
    /// Window temperature standard deviation.
    pub const TEMP_STD: &str = "temp/std";
    /// Window humidity mean.
    pub const HUM_MEAN: &str = "hum/mean";
    /// Window humidity standard deviation.
    pub const HUM_STD: &str = "hum/std";
    /// Window sound mean.
    pub const SOUND_MEAN: &str = "sound/mean";
    /// Window sound maximum.
    pub const SOUND_MAX: &str = "sound/max";
    /// Seconds with motion detected in the window.
    pub const MOTION_TIME: &str = "motion/time";
    /// Seconds with a valid distance echo in the window.
    pub const DIST_TIME: &str = "dist/time";
}

/// One inbound write from the control surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    /// Authoritative actuator write (`LED control`, `Motor control`,
    /// `Buzzer control`).
    Write(Channel, u8),
    /// Free-text command (`NLU input`) to forward to the analyzer.
    Command(String),
}

/// Capability: publish a named value to the remote control surface.
#[async_trait]
pub trait RemotePublisher: Send + Sync {
    /// Publish `value` on `topic`. At-most-once; callers log failures and
    /// move on.
    async fn publish(&self, topic: &str, value: f64) -> AppResult<()>;
}

/// Publisher that surfaces every publish as a structured log event.
///
/// Stands in for a real transport adapter when running headless.
#[derive(Debug, Default, Clone)]
pub struct TracingPublisher;

#[async_trait]
impl RemotePublisher for TracingPublisher {
    async fn publish(&self, topic: &str, value: f64) -> AppResult<()> {
        tracing::info!(topic, value, "remote publish");
        Ok(())
    }
}

/// Parse one console control line.
///
/// Grammar: `led|motor|buzzer <0|1>` or `cmd <free text>`. Unknown lines
/// yield `None`; the caller skips them (unknown remote topics are
/// transient-ignorable).
pub fn parse_control_line(line: &str) -> Option<ControlEvent> {
    let line = line.trim();
    let (keyword, rest) = line.split_once(char::is_whitespace)?;
    let rest = rest.trim();

    match keyword.to_lowercase().as_str() {
        "led" => Some(ControlEvent::Write(Channel::Led, parse_bit(rest)?)),
        "motor" => Some(ControlEvent::Write(Channel::Motor, parse_bit(rest)?)),
        "buzzer" => Some(ControlEvent::Write(Channel::Buzzer, parse_bit(rest)?)),
        "cmd" if !rest.is_empty() => Some(ControlEvent::Command(rest.to_string())),
        _ => None,
    }
}

fn parse_bit(token: &str) -> Option<u8> {
    match token {
        "0" => Some(0),
        "1" => Some(1),
        _ => None,
    }
}

/// Spawn the stdin control adapter: reads console lines for the process
/// lifetime and forwards recognized control events.
pub fn spawn_stdin_control(tx: mpsc::Sender<ControlEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_control_line(&line) {
                    Some(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        if !line.trim().is_empty() {
                            tracing::warn!(line = %line.trim(), "unrecognized control line");
                        }
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "control input read failed");
                    break;
                }
            }
        }
    })
}
