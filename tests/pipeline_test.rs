//! Pipeline integration tests.
//!
//! End-to-end coverage of the three workers with test doubles for the
//! external analyzer and the remote control surface:
//!
//! - ingestion: lines in, exactly one aggregate record per interval out
//! - analysis: window-full precondition, publish fan-out, stats persistence
//! - control: remote writes and analyzer command round-trips
//!
//! Timing-sensitive tests run on the paused tokio clock, so they are
//! deterministic and take no wall-clock time.

use async_trait::async_trait;
use sensor_bridge::actuator::{ActuatorState, Channel};
use sensor_bridge::aggregate::{AggregateRecord, IntervalAggregator};
use sensor_bridge::analyzer::Analyzer;
use sensor_bridge::bridge::AnalyzerBridge;
use sensor_bridge::error::AppResult;
use sensor_bridge::pipeline;
use sensor_bridge::remote::{ControlEvent, RemotePublisher};
use sensor_bridge::storage::{HistoryLog, StatsLog};
use sensor_bridge::window::WindowBuffer;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

const INTERVAL: Duration = Duration::from_secs(2);

/// Records every publish in order.
#[derive(Default)]
struct RecordingPublisher {
    published: Mutex<Vec<(String, f64)>>,
}

impl RecordingPublisher {
    fn published(&self) -> Vec<(String, f64)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemotePublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, value: f64) -> AppResult<()> {
        self.published.lock().unwrap().push((topic.to_string(), value));
        Ok(())
    }
}

/// Replies with canned output and counts invocations.
struct StubAnalyzer {
    window_reply: String,
    command_reply: String,
    invocations: AtomicUsize,
}

impl StubAnalyzer {
    fn with_window_reply(reply: &str) -> Self {
        Self {
            window_reply: reply.to_string(),
            command_reply: String::new(),
            invocations: AtomicUsize::new(0),
        }
    }

    fn with_command_reply(reply: &str) -> Self {
        Self {
            window_reply: String::new(),
            command_reply: reply.to_string(),
            invocations: AtomicUsize::new(0),
        }
    }

    fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for StubAnalyzer {
    async fn analyze_window(&self, _snapshot_path: &Path) -> AppResult<String> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(self.window_reply.clone())
    }

    async fn analyze_command(&self, _snapshot_path: &Path, _command: &str) -> AppResult<String> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(self.command_reply.clone())
    }
}

fn record(sound_avg: f64) -> AggregateRecord {
    AggregateRecord {
        timestamp: chrono::Local::now(),
        sound_avg,
        motion: 0,
        temp: 21.5,
        hum: 40.0,
        dist: 100.0,
    }
}

fn make_bridge(analyzer: Arc<StubAnalyzer>, dir: &tempfile::TempDir) -> Arc<AnalyzerBridge> {
    Arc::new(AnalyzerBridge::new(
        analyzer,
        dir.path().join("window_snapshot.json"),
        INTERVAL,
    ))
}

// =============================================================================
// Ingestion
// =============================================================================

#[tokio::test(start_paused = true)]
async fn ingestion_emits_one_record_per_interval() {
    let dir = tempfile::tempdir().unwrap();
    let history_path = dir.path().join("history.csv");

    let (tx, rx) = mpsc::channel(8);
    let window = Arc::new(WindowBuffer::new(4));
    let history = HistoryLog::open(&history_path).unwrap();

    let worker = tokio::spawn(pipeline::ingest_loop(
        rx,
        IntervalAggregator::new(),
        Arc::clone(&window),
        history,
        INTERVAL,
    ));

    // Two readings in the first interval (scenario: plain + no-echo).
    tx.send(Ok("sound:10 motion:0 temp:21.5 hum:40 dist:100".to_string()))
        .await
        .unwrap();
    tx.send(Ok("sound:20 motion:1 temp:21.7 hum:41 dist:sin eco".to_string()))
        .await
        .unwrap();
    // Garbage is skipped silently.
    tx.send(Ok("###garbled###".to_string())).await.unwrap();

    tokio::time::sleep(INTERVAL + Duration::from_millis(100)).await;

    let snapshot = window.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    let first = &snapshot[0];
    assert_eq!(first.sound_avg, 15.0);
    assert_eq!(first.motion, 1);
    assert_eq!(first.temp, 21.7);
    assert_eq!(first.hum, 41.0);
    assert_eq!(first.dist, 100.0);

    // A silent interval still emits exactly one (carry-forward) record.
    tokio::time::sleep(INTERVAL).await;
    let snapshot = window.snapshot().await;
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[1].sound_avg, 20.0);
    assert_eq!(snapshot[1].temp, 21.7);

    // Both records are already durable in the history log.
    let contents = std::fs::read_to_string(&history_path).unwrap();
    assert_eq!(contents.lines().count(), 3); // header + 2 rows

    worker.abort();
}

// =============================================================================
// Periodic analysis
// =============================================================================

#[tokio::test(start_paused = true)]
async fn analysis_skips_until_window_is_full() {
    let dir = tempfile::tempdir().unwrap();
    let stats_path = dir.path().join("stats.csv");

    let analyzer = Arc::new(StubAnalyzer::with_window_reply(
        "temp: mean=22.1 std=0.4\nhum: mean=55.0 std=1.2\n",
    ));
    let bridge = make_bridge(Arc::clone(&analyzer), &dir);
    let window = Arc::new(WindowBuffer::new(3));
    let remote = Arc::new(RecordingPublisher::default());
    let stats_log = StatsLog::open(&stats_path).unwrap();

    let period = Duration::from_secs(6);
    let worker = tokio::spawn(pipeline::analysis_loop(
        Arc::clone(&window),
        bridge,
        stats_log,
        Arc::clone(&remote) as Arc<dyn RemotePublisher>,
        period,
    ));

    // Two full cycles with a partial window: no external invocation at all.
    window.append(record(1.0)).await;
    tokio::time::sleep(period * 2 + Duration::from_millis(100)).await;
    assert_eq!(analyzer.invocations(), 0);
    assert!(remote.published().is_empty());

    // Fill the window; the next scheduled cycle runs the analyzer.
    window.append(record(2.0)).await;
    window.append(record(3.0)).await;
    tokio::time::sleep(period + Duration::from_millis(100)).await;

    assert_eq!(analyzer.invocations(), 1);

    // Publishes fan out in report order: temp before hum.
    let published = remote.published();
    assert_eq!(
        published,
        vec![
            ("temp/mean".to_string(), 22.1),
            ("temp/std".to_string(), 0.4),
            ("hum/mean".to_string(), 55.0),
            ("hum/std".to_string(), 1.2),
        ]
    );
    assert_eq!(published[0].0, "temp/mean");
    assert_eq!(published[1].0, "temp/std");

    // One stats row was persisted, with absent groups as empty cells.
    let contents = std::fs::read_to_string(&stats_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("22.1,0.4,55,1.2"));

    worker.abort();
}

#[tokio::test(start_paused = true)]
async fn analysis_failure_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let stats_path = dir.path().join("stats.csv");

    // Unrecognizable output makes every cycle fail.
    let analyzer = Arc::new(StubAnalyzer::with_window_reply("kernel panic\n"));
    let bridge = make_bridge(Arc::clone(&analyzer), &dir);
    let window = Arc::new(WindowBuffer::new(1));
    window.append(record(1.0)).await;
    let remote = Arc::new(RecordingPublisher::default());
    let stats_log = StatsLog::open(&stats_path).unwrap();

    let period = Duration::from_secs(6);
    let worker = tokio::spawn(pipeline::analysis_loop(
        Arc::clone(&window),
        bridge,
        stats_log,
        Arc::clone(&remote) as Arc<dyn RemotePublisher>,
        period,
    ));

    tokio::time::sleep(period * 3 + Duration::from_millis(100)).await;

    // The loop kept cycling despite the failures.
    assert!(analyzer.invocations() >= 3);
    assert!(!worker.is_finished());

    // No stats row, no publish.
    assert!(remote.published().is_empty());
    let contents = std::fs::read_to_string(&stats_path).unwrap();
    assert_eq!(contents.lines().count(), 1); // header only

    worker.abort();
}

// =============================================================================
// Control path
// =============================================================================

#[tokio::test]
async fn command_action_toggles_and_publishes_once() {
    let dir = tempfile::tempdir().unwrap();
    let analyzer = Arc::new(StubAnalyzer::with_command_reply("TOGGLE_LED\n"));
    let bridge = make_bridge(Arc::clone(&analyzer), &dir);
    let window = WindowBuffer::new(4);
    // Commands have no fullness precondition: one record is enough.
    window.append(record(1.0)).await;
    let actuator = ActuatorState::new();
    let remote = RecordingPublisher::default();

    assert_eq!(actuator.get(Channel::Led).await, 0);

    pipeline::handle_control_event(
        ControlEvent::Command("enciende la luz".to_string()),
        &window,
        &bridge,
        &actuator,
        &remote,
    )
    .await;

    assert_eq!(actuator.get(Channel::Led).await, 1);
    assert_eq!(remote.published(), vec![("led".to_string(), 1.0)]);
    assert_eq!(analyzer.invocations(), 1);
}

#[tokio::test]
async fn unknown_action_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let analyzer = Arc::new(StubAnalyzer::with_command_reply("OPEN_WINDOW\n"));
    let bridge = make_bridge(analyzer, &dir);
    let window = WindowBuffer::new(4);
    let actuator = ActuatorState::new();
    let remote = RecordingPublisher::default();

    pipeline::handle_control_event(
        ControlEvent::Command("abre la ventana".to_string()),
        &window,
        &bridge,
        &actuator,
        &remote,
    )
    .await;

    assert_eq!(actuator.get(Channel::Led).await, 0);
    assert_eq!(actuator.get(Channel::Motor).await, 0);
    assert_eq!(actuator.get(Channel::Buzzer).await, 0);
    assert!(remote.published().is_empty());
}

#[tokio::test]
async fn remote_write_is_authoritative_and_published() {
    let dir = tempfile::tempdir().unwrap();
    let analyzer = Arc::new(StubAnalyzer::with_command_reply(""));
    let bridge = make_bridge(Arc::clone(&analyzer), &dir);
    let window = WindowBuffer::new(4);
    let actuator = ActuatorState::new();
    let remote = RecordingPublisher::default();

    pipeline::handle_control_event(
        ControlEvent::Write(Channel::Motor, 1),
        &window,
        &bridge,
        &actuator,
        &remote,
    )
    .await;
    pipeline::handle_control_event(
        ControlEvent::Write(Channel::Motor, 0),
        &window,
        &bridge,
        &actuator,
        &remote,
    )
    .await;

    assert_eq!(actuator.get(Channel::Motor).await, 0);
    assert_eq!(
        remote.published(),
        vec![("motor".to_string(), 1.0), ("motor".to_string(), 0.0)]
    );
    // A plain write never consults the analyzer.
    assert_eq!(analyzer.invocations(), 0);
}

#[tokio::test(start_paused = true)]
async fn control_surface_closure_leaves_ingestion_running() {
    let dir = tempfile::tempdir().unwrap();
    let analyzer = Arc::new(StubAnalyzer::with_command_reply(""));
    let bridge = make_bridge(analyzer, &dir);
    let window = Arc::new(WindowBuffer::new(4));
    let actuator = Arc::new(ActuatorState::new());
    let remote = Arc::new(RecordingPublisher::default());
    let history = HistoryLog::open(&dir.path().join("history.csv")).unwrap();

    let (lines_tx, lines_rx) = mpsc::channel(8);
    let ingest = tokio::spawn(pipeline::ingest_loop(
        lines_rx,
        IntervalAggregator::new(),
        Arc::clone(&window),
        history,
        INTERVAL,
    ));

    let (control_tx, control_rx) = mpsc::channel(4);
    let control = tokio::spawn(pipeline::control_loop(
        control_rx,
        Arc::clone(&window),
        bridge,
        actuator,
        Arc::clone(&remote) as Arc<dyn RemotePublisher>,
    ));

    // The control surface closing (e.g. stdin at EOF on a daemonized run)
    // ends only its own worker.
    drop(control_tx);
    control.await.unwrap();

    lines_tx
        .send(Ok("sound:10 motion:0 temp:21.5 hum:40 dist:100".to_string()))
        .await
        .unwrap();
    tokio::time::sleep(INTERVAL * 2 + Duration::from_millis(100)).await;

    // Ingestion keeps emitting records after the control surface is gone.
    assert!(!ingest.is_finished());
    let snapshot = window.snapshot().await;
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].sound_avg, 10.0);

    ingest.abort();
}

#[tokio::test]
async fn control_loop_drains_events_until_closed() {
    let dir = tempfile::tempdir().unwrap();
    let analyzer = Arc::new(StubAnalyzer::with_command_reply("TOGGLE_BUZZER"));
    let bridge = make_bridge(analyzer, &dir);
    let window = Arc::new(WindowBuffer::new(4));
    let actuator = Arc::new(ActuatorState::new());
    let remote = Arc::new(RecordingPublisher::default());

    let (tx, rx) = mpsc::channel(4);
    let worker = tokio::spawn(pipeline::control_loop(
        rx,
        Arc::clone(&window),
        bridge,
        Arc::clone(&actuator),
        Arc::clone(&remote) as Arc<dyn RemotePublisher>,
    ));

    tx.send(ControlEvent::Write(Channel::Led, 1)).await.unwrap();
    tx.send(ControlEvent::Command("alarma".to_string())).await.unwrap();
    drop(tx);

    // The loop exits once the channel closes.
    worker.await.unwrap();

    assert_eq!(actuator.get(Channel::Led).await, 1);
    assert_eq!(actuator.get(Channel::Buzzer).await, 1);
    assert_eq!(
        remote.published(),
        vec![("led".to_string(), 1.0), ("buzzer".to_string(), 1.0)]
    );
}
