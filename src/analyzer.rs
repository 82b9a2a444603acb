//! External analyzer invocation.
//!
//! The statistics/decision process is an opaque executable. This module
//! models it as a narrow capability trait so the subprocess invocation is
//! swappable with a test double, and provides [`ProcessAnalyzer`], the real
//! implementation built on `tokio::process`.
//!
//! Every failure mode of the subprocess (failed launch, non-zero exit,
//! timeout) maps to [`BridgeError::Analysis`], which is never fatal to the
//! calling loop.

use crate::error::{AppResult, BridgeError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Capability: turn a window snapshot into a statistics report or an action.
///
/// Implementations must be safe to call from several tasks; the bridge
/// serializes invocations externally.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Run the analyzer in windowed-stats mode against the snapshot file and
    /// return its raw stdout text.
    async fn analyze_window(&self, snapshot_path: &Path) -> AppResult<String>;

    /// Run the analyzer in command mode with free-form command text and
    /// return its raw stdout text (expected to be one action token).
    async fn analyze_command(&self, snapshot_path: &Path, command: &str) -> AppResult<String>;
}

/// Analyzer backed by an external executable.
///
/// Invoked as `<program> --window <snapshot>` or
/// `<program> --cmd <snapshot> <command-text>`.
#[derive(Debug, Clone)]
pub struct ProcessAnalyzer {
    program: PathBuf,
    timeout: Duration,
}

impl ProcessAnalyzer {
    /// Create an analyzer for `program` with a per-invocation timeout.
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }

    async fn run(&self, args: &[&str]) -> AppResult<String> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            BridgeError::Analysis(format!(
                "analyzer '{}' timed out after {:?}",
                self.program.display(),
                self.timeout
            ))
        })?
        .map_err(|e| {
            BridgeError::Analysis(format!(
                "failed to launch analyzer '{}': {e}",
                self.program.display()
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BridgeError::Analysis(format!(
                "analyzer '{}' exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Analyzer for ProcessAnalyzer {
    async fn analyze_window(&self, snapshot_path: &Path) -> AppResult<String> {
        let snapshot = snapshot_path.to_string_lossy();
        self.run(&["--window", snapshot.as_ref()]).await
    }

    async fn analyze_command(&self, snapshot_path: &Path, command: &str) -> AppResult<String> {
        let snapshot = snapshot_path.to_string_lossy();
        self.run(&["--cmd", snapshot.as_ref(), command]).await
    }
}
