//! The bridge's persistent workers.
//!
//! Three concurrent paths share the window buffer, actuator state, and
//! analyzer bridge, each injected as owned `Arc` state (no globals) and each
//! guarded by its own lock:
//!
//! - the **ingestion loop**: read line / accumulate / tick, appending one
//!   aggregate record per interval to the history log and the window;
//! - the **analysis loop**: once per full window's worth of time, snapshot
//!   the window (only when full) and run the external analyzer;
//! - the **control loop**: apply remote actuator writes and forward free-text
//!   commands through the analyzer in command mode.
//!
//! Only a storage failure terminates a loop; analysis failures and unknown
//! actions are logged and the loop proceeds to the next cycle.

use crate::actuator::ActuatorState;
use crate::aggregate::IntervalAggregator;
use crate::bridge::AnalyzerBridge;
use crate::error::AppResult;
use crate::parser::parse_line;
use crate::remote::{topics, ControlEvent, RemotePublisher};
use crate::stats::WindowStats;
use crate::storage::{HistoryLog, StatsLog};
use crate::window::WindowBuffer;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Ingestion worker: accumulate parsed readings and emit exactly one
/// aggregate record per elapsed interval.
///
/// A lost sensor link does not stop ingestion: the tick keeps emitting
/// carry-forward records. Only a [`crate::error::BridgeError::Storage`]
/// failure propagates out.
pub async fn ingest_loop(
    mut lines: mpsc::Receiver<AppResult<String>>,
    mut aggregator: IntervalAggregator,
    window: Arc<WindowBuffer>,
    mut history: HistoryLog,
    interval: Duration,
) -> AppResult<()> {
    let mut ticker = tokio::time::interval(interval);
    // An overdue tick re-arms from "now"; ticks are never coalesced.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Consume the immediate first tick so the first record covers one full
    // interval.
    ticker.tick().await;

    let mut lines_open = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let record = aggregator.tick(Local::now());
                history.append(&record)?;
                window.append(record).await;
                let fill = window.len().await;
                tracing::debug!(fill, capacity = window.capacity(), "aggregate record appended");
            }
            received = lines.recv(), if lines_open => {
                match received {
                    Some(Ok(line)) => {
                        if let Some(reading) = parse_line(&line) {
                            aggregator.observe(&reading);
                        } else {
                            tracing::trace!(line = %line, "skipping unparseable line");
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "sensor link failed; continuing on carry-forward");
                    }
                    None => {
                        lines_open = false;
                        tracing::warn!("sensor line channel closed");
                    }
                }
            }
        }
    }
}

/// Periodic analysis worker.
///
/// The cycle period is one full window's worth of records. A cycle is
/// skipped entirely while the window is not yet full: no partial-window
/// analysis, no retry backoff beyond the next scheduled tick.
pub async fn analysis_loop(
    window: Arc<WindowBuffer>,
    bridge: Arc<AnalyzerBridge>,
    mut stats_log: StatsLog,
    remote: Arc<dyn RemotePublisher>,
    period: Duration,
) -> AppResult<()> {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // The first tick fires immediately, allowing a fast first pass once
        // the window has filled.
        ticker.tick().await;

        if !window.is_full().await {
            let fill = window.len().await;
            tracing::debug!(fill, capacity = window.capacity(), "window not full; skipping analysis cycle");
            continue;
        }

        let snapshot = window.snapshot().await;
        match bridge.run_window_analysis(&snapshot).await {
            Ok(stats) => {
                tracing::info!(?stats, "window analysis complete");
                publish_stats(remote.as_ref(), &stats).await;
                stats_log.append(&Local::now(), &stats)?;
            }
            Err(e) => {
                // Analysis failures never stop the loop.
                tracing::warn!(error = %e, "window analysis failed");
            }
        }
    }
}

/// Publish every present metric group, in report order. At-most-once: a
/// failed publish is logged and the remaining groups still go out.
pub async fn publish_stats(remote: &dyn RemotePublisher, stats: &WindowStats) {
    let groups = [
        (topics::TEMP_MEAN, stats.temp_mean),
        (topics::TEMP_STD, stats.temp_std),
        (topics::HUM_MEAN, stats.hum_mean),
        (topics::HUM_STD, stats.hum_std),
        (topics::SOUND_MEAN, stats.sound_mean),
        (topics::SOUND_MAX, stats.sound_max),
        (topics::MOTION_TIME, stats.motion_time),
        (topics::DIST_TIME, stats.dist_time),
    ];

    for (topic, value) in groups {
        if let Some(value) = value {
            if let Err(e) = remote.publish(topic, value).await {
                tracing::warn!(topic, error = %e, "stats publish failed");
            }
        }
    }
}

/// Control worker: consume inbound control events until the channel closes.
pub async fn control_loop(
    mut events: mpsc::Receiver<ControlEvent>,
    window: Arc<WindowBuffer>,
    bridge: Arc<AnalyzerBridge>,
    actuator: Arc<ActuatorState>,
    remote: Arc<dyn RemotePublisher>,
) {
    while let Some(event) = events.recv().await {
        handle_control_event(event, &window, &bridge, &actuator, remote.as_ref()).await;
    }
    tracing::info!("control channel closed");
}

/// Apply one inbound control event.
///
/// Actuator writes are authoritative; commands run against the current
/// window (full or not) and toggle on a known action. Every state mutation
/// is immediately followed by a publish of the new value.
pub async fn handle_control_event(
    event: ControlEvent,
    window: &WindowBuffer,
    bridge: &AnalyzerBridge,
    actuator: &ActuatorState,
    remote: &dyn RemotePublisher,
) {
    match event {
        ControlEvent::Write(channel, value) => {
            let new_value = actuator.set(channel, value).await;
            tracing::info!(channel = %channel, value = new_value, "remote actuator write");
            publish_channel(remote, channel, new_value).await;
        }
        ControlEvent::Command(text) => {
            tracing::info!(command = %text, "forwarding command to analyzer");
            let snapshot = window.snapshot().await;
            match bridge.run_command(&snapshot, &text).await {
                Ok(action) => match action.channel() {
                    Some(channel) => {
                        let new_value = actuator.toggle(channel).await;
                        tracing::info!(channel = %channel, value = new_value, "action applied");
                        publish_channel(remote, channel, new_value).await;
                    }
                    None => {
                        tracing::warn!(?action, "analyzer returned unknown action; no state change");
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "command analysis failed");
                }
            }
        }
    }
}

async fn publish_channel(
    remote: &dyn RemotePublisher,
    channel: crate::actuator::Channel,
    value: u8,
) {
    if let Err(e) = remote.publish(channel.topic(), value as f64).await {
        tracing::warn!(channel = %channel, error = %e, "actuator publish failed");
    }
}
