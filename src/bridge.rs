//! Analyzer bridge.
//!
//! Both analysis entry points share the same discipline: take the invocation
//! lock, rewrite the intermediate snapshot file, run the external analyzer
//! against it, parse its stdout. The lock guarantees that two invocations
//! never overlap and that the snapshot is never rewritten under a running
//! analyzer; it is a different lock from the window buffer's, so holding it
//! for the duration of a slow subprocess cannot stall ingestion.

use crate::actuator::Channel;
use crate::aggregate::AggregateRecord;
use crate::analyzer::Analyzer;
use crate::error::{AppResult, BridgeError};
use crate::stats::WindowStats;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A closed-set instruction returned by the analyzer in command mode.
///
/// Tokens outside the known set are carried as `Unknown` rather than an
/// error: the analyzer may grow new actions before this bridge learns about
/// them, and an unknown token must not disturb actuator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Flip the LED channel.
    ToggleLed,
    /// Flip the motor channel.
    ToggleMotor,
    /// Flip the buzzer channel.
    ToggleBuzzer,
    /// Token outside the known set; logged, no state change.
    Unknown(String),
}

impl Action {
    /// Interpret one trimmed analyzer output token.
    pub fn parse(token: &str) -> Self {
        match token {
            "TOGGLE_LED" => Action::ToggleLed,
            "TOGGLE_MOTOR" => Action::ToggleMotor,
            "TOGGLE_BUZZER" => Action::ToggleBuzzer,
            other => Action::Unknown(other.to_string()),
        }
    }

    /// The actuator channel this action targets, if it is a known action.
    pub fn channel(&self) -> Option<Channel> {
        match self {
            Action::ToggleLed => Some(Channel::Led),
            Action::ToggleMotor => Some(Channel::Motor),
            Action::ToggleBuzzer => Some(Channel::Buzzer),
            Action::Unknown(_) => None,
        }
    }
}

/// Serializes window snapshots to the analyzer and parses its replies.
pub struct AnalyzerBridge {
    analyzer: Arc<dyn Analyzer>,
    snapshot_path: PathBuf,
    interval: Duration,
    /// Guards snapshot rewrite + subprocess invocation as one critical section.
    invocation: Mutex<()>,
}

impl AnalyzerBridge {
    /// Create a bridge writing snapshots to `snapshot_path`.
    ///
    /// `interval` is the aggregation interval, used to convert the
    /// analyzer's sample counts into elapsed time.
    pub fn new(analyzer: Arc<dyn Analyzer>, snapshot_path: PathBuf, interval: Duration) -> Self {
        Self {
            analyzer,
            snapshot_path,
            interval,
            invocation: Mutex::new(()),
        }
    }

    /// Run a full-window analysis cycle.
    ///
    /// Fails with [`BridgeError::Analysis`] when the analyzer cannot be run
    /// or none of its output lines are recognizable. Non-fatal: the caller
    /// logs and proceeds to the next scheduled cycle.
    pub async fn run_window_analysis(
        &self,
        window: &[AggregateRecord],
    ) -> AppResult<WindowStats> {
        let _guard = self.invocation.lock().await;
        self.write_snapshot(window).await?;

        let output = self.analyzer.analyze_window(&self.snapshot_path).await?;
        tracing::debug!(bytes = output.len(), "analyzer window output received");

        let stats = WindowStats::parse(&output, self.interval);
        if stats.is_empty() {
            return Err(BridgeError::Analysis(
                "analyzer produced no recognizable statistics lines".to_string(),
            ));
        }
        Ok(stats)
    }

    /// Forward a command with the current window and interpret the reply.
    ///
    /// The window has no fullness precondition here; commands may run
    /// against a partial window.
    pub async fn run_command(
        &self,
        window: &[AggregateRecord],
        command_text: &str,
    ) -> AppResult<Action> {
        let _guard = self.invocation.lock().await;
        self.write_snapshot(window).await?;

        let output = self
            .analyzer
            .analyze_command(&self.snapshot_path, command_text)
            .await?;
        Ok(Action::parse(output.trim()))
    }

    async fn write_snapshot(&self, window: &[AggregateRecord]) -> AppResult<()> {
        let json = serde_json::to_vec(window)?;
        tokio::fs::write(&self.snapshot_path, json)
            .await
            .map_err(BridgeError::Io)
    }
}
