//! CLI entry point for sensor-bridge.
//!
//! Wires the serial line source, the aggregation pipeline, the analyzer
//! bridge, and the remote control seam into three persistent workers, and
//! runs them for the process lifetime.
//!
//! # Usage
//!
//! Run the bridge:
//! ```bash
//! sensor-bridge run --config config/bridge.toml
//! ```
//!
//! Validate a configuration file and exit:
//! ```bash
//! sensor-bridge check-config --config config/bridge.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use sensor_bridge::actuator::ActuatorState;
use sensor_bridge::aggregate::IntervalAggregator;
use sensor_bridge::analyzer::ProcessAnalyzer;
use sensor_bridge::bridge::AnalyzerBridge;
use sensor_bridge::config::Settings;
use sensor_bridge::remote::{spawn_stdin_control, ControlEvent, RemotePublisher, TracingPublisher};
use sensor_bridge::serial::{spawn_line_reader, SerialLineSource};
use sensor_bridge::storage::{HistoryLog, StatsLog};
use sensor_bridge::window::WindowBuffer;
use sensor_bridge::{logging, pipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "sensor-bridge")]
#[command(about = "Telemetry ingestion and windowed-aggregation bridge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge until terminated.
    Run {
        /// Configuration file.
        #[arg(long, default_value = "config/bridge.toml")]
        config: PathBuf,
    },

    /// Load and validate a configuration file, then exit.
    CheckConfig {
        /// Configuration file.
        #[arg(long, default_value = "config/bridge.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => run(config).await,
        Commands::CheckConfig { config } => check_config(config),
    }
}

fn check_config(path: PathBuf) -> Result<()> {
    let settings = Settings::load_from(&path)?;
    settings.validate()?;
    println!("{} is valid", path.display());
    Ok(())
}

async fn run(config_path: PathBuf) -> Result<()> {
    let settings = Settings::load_from(&config_path)?;
    settings.validate()?;
    logging::init_from_settings(&settings)?;
    tracing::info!(config = %config_path.display(), "sensor-bridge starting");

    // Ingestion side.
    let source = SerialLineSource::open(
        &settings.serial.port,
        settings.serial.baud_rate,
        settings.serial.read_timeout,
    )?;
    let lines = spawn_line_reader(source);
    let history = HistoryLog::open(&settings.storage.history_path)?;
    let window = Arc::new(WindowBuffer::new(settings.aggregation.window_size));

    // Analysis side.
    let analyzer = Arc::new(ProcessAnalyzer::new(
        settings.analyzer.program.clone(),
        settings.analyzer.timeout,
    ));
    let bridge = Arc::new(AnalyzerBridge::new(
        analyzer,
        settings.storage.snapshot_path.clone(),
        settings.aggregation.interval,
    ));
    let stats_log = StatsLog::open(&settings.storage.stats_path)?;

    // Remote control surface.
    let remote: Arc<dyn RemotePublisher> = Arc::new(TracingPublisher);
    let actuator = Arc::new(ActuatorState::new());
    let (control_tx, control_rx) = mpsc::channel::<ControlEvent>(16);
    let _stdin_adapter = spawn_stdin_control(control_tx);

    let ingest = tokio::spawn(pipeline::ingest_loop(
        lines,
        IntervalAggregator::new(),
        Arc::clone(&window),
        history,
        settings.aggregation.interval,
    ));
    let analysis = tokio::spawn(pipeline::analysis_loop(
        Arc::clone(&window),
        Arc::clone(&bridge),
        stats_log,
        Arc::clone(&remote),
        settings.analysis_period(),
    ));
    // The control surface may close early (e.g. stdin at EOF on a
    // daemonized run); ingestion and analysis keep running regardless.
    let _control = tokio::spawn(pipeline::control_loop(
        control_rx,
        window,
        bridge,
        actuator,
        remote,
    ));

    // The persistent workers run for the process lifetime; only a storage
    // failure ends them, and that decides the exit.
    tokio::select! {
        res = ingest => {
            res??;
            anyhow::bail!("ingestion loop stopped unexpectedly");
        }
        res = analysis => {
            res??;
            anyhow::bail!("analysis loop stopped unexpectedly");
        }
    }
}
