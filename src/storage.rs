//! Append-only persisted logs.
//!
//! Both persisted logs (aggregate history and window statistics) are CSV
//! files with a fixed column header written exactly once, on first creation.
//! Every appended row is flushed and synced to durable storage before the
//! call returns; nothing is buffered across a process crash.
//!
//! Open or write failures map to [`BridgeError::Storage`], the one error
//! class that terminates the owning loop.

use crate::aggregate::AggregateRecord;
use crate::error::{AppResult, BridgeError};
use crate::stats::WindowStats;
use chrono::{DateTime, Local, SecondsFormat};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Column header of the aggregate history log.
pub const HISTORY_HEADER: [&str; 6] = ["datetime", "sound_avg", "motion", "temp", "hum", "dist"];

/// Column header of the window statistics log.
pub const STATS_HEADER: [&str; 9] = [
    "datetime",
    "temp_mean",
    "temp_std",
    "hum_mean",
    "hum_std",
    "sound_mean",
    "sound_max",
    "motion_time",
    "dist_time",
];

/// One append-only CSV log target.
///
/// Holds a second handle to the same open file so each row can be synced
/// after the csv writer flushes it.
#[derive(Debug)]
pub struct CsvLog {
    path: PathBuf,
    writer: csv::Writer<File>,
    file: File,
}

impl CsvLog {
    /// Open (or create) the log at `path`, writing `header` only if the
    /// target did not previously exist. Idempotent across restarts.
    pub fn open(path: &Path, header: &[&str]) -> AppResult<Self> {
        let existed = path.exists();

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| storage_error(path, "open", &e))?;
        let writer_file = file
            .try_clone()
            .map_err(|e| storage_error(path, "clone handle for", &e))?;

        let mut log = Self {
            path: path.to_path_buf(),
            writer: csv::Writer::from_writer(writer_file),
            file,
        };

        if !existed {
            log.append(header)?;
            tracing::info!(path = %log.path.display(), "created persisted log");
        }

        Ok(log)
    }

    /// Append one row and force it to durable storage before returning.
    pub fn append<I, F>(&mut self, row: I) -> AppResult<()>
    where
        I: IntoIterator<Item = F>,
        F: AsRef<[u8]>,
    {
        self.writer
            .write_record(row)
            .map_err(|e| BridgeError::Storage(format!(
                "Failed to write row to '{}': {e}",
                self.path.display()
            )))?;
        self.writer
            .flush()
            .map_err(|e| storage_error(&self.path, "flush", &e))?;
        self.file
            .sync_data()
            .map_err(|e| storage_error(&self.path, "sync", &e))
    }
}

fn storage_error(path: &Path, action: &str, err: &std::io::Error) -> BridgeError {
    BridgeError::Storage(format!("Failed to {action} '{}': {err}", path.display()))
}

/// Persisted log of aggregate records (Log #1).
#[derive(Debug)]
pub struct HistoryLog {
    log: CsvLog,
}

impl HistoryLog {
    /// Open the history log, initializing its header on first creation.
    pub fn open(path: &Path) -> AppResult<Self> {
        Ok(Self {
            log: CsvLog::open(path, &HISTORY_HEADER)?,
        })
    }

    /// Append one aggregate record.
    pub fn append(&mut self, record: &AggregateRecord) -> AppResult<()> {
        self.log.append([
            format_timestamp(&record.timestamp),
            record.sound_avg.to_string(),
            record.motion.to_string(),
            record.temp.to_string(),
            record.hum.to_string(),
            record.dist.to_string(),
        ])
    }
}

/// Persisted log of derived window statistics (Log #2).
#[derive(Debug)]
pub struct StatsLog {
    log: CsvLog,
}

impl StatsLog {
    /// Open the stats log, initializing its header on first creation.
    pub fn open(path: &Path) -> AppResult<Self> {
        Ok(Self {
            log: CsvLog::open(path, &STATS_HEADER)?,
        })
    }

    /// Append one statistics row. Absent metric groups serialize as empty
    /// cells.
    pub fn append(&mut self, timestamp: &DateTime<Local>, stats: &WindowStats) -> AppResult<()> {
        self.log.append([
            format_timestamp(timestamp),
            format_cell(stats.temp_mean),
            format_cell(stats.temp_std),
            format_cell(stats.hum_mean),
            format_cell(stats.hum_std),
            format_cell(stats.sound_mean),
            format_cell(stats.sound_max),
            format_cell(stats.motion_time),
            format_cell(stats.dist_time),
        ])
    }
}

fn format_timestamp(timestamp: &DateTime<Local>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, false)
}

fn format_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
