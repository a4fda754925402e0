//! ECG Monitor - live single-lead ECG view with heart-rate estimation

mod app;
mod config;
mod controller;
mod device;
mod display;

use anyhow::{Context, Result};
use app::Monitor;
use clap::Parser;
use config::{MonitorConfig, Overrides, SourceKind};
use controller::spawn_key_reader;
use device::{list_ports, InputDevice};
use display::TerminalDisplay;
use ecg_core::EcgError;
use ecg_processing::Pipeline;
use ecg_simulation::HeartRhythm;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Time allowed for blocked readers (stdin) after the session ends
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(name = "ecg-monitor", version, about = "Live ECG monitor with heart-rate estimation")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sample source
    #[arg(short, long, value_enum)]
    source: Option<SourceKind>,

    /// Serial port to try first
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Named rhythm for the built-in simulator (see --list-rhythms)
    #[arg(long, value_parser = parse_rhythm)]
    rhythm: Option<HeartRhythm>,

    /// Fixed heart rate of the built-in simulator; overrides --rhythm
    #[arg(long)]
    simulated_bpm: Option<f32>,

    /// Start in numeric display mode
    #[arg(long)]
    numeric: bool,

    /// List detected serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// List the simulator's named rhythms and exit
    #[arg(long)]
    list_rhythms: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            source: self.source,
            port: self.port.clone(),
            baud_rate: self.baud,
            rhythm: self.rhythm,
            simulated_bpm: self.simulated_bpm,
            numeric: self.numeric,
        }
    }
}

fn parse_rhythm(name: &str) -> Result<HeartRhythm, String> {
    HeartRhythm::preset(name).ok_or_else(|| {
        let names: Vec<String> = HeartRhythm::presets()
            .iter()
            .map(|(name, _)| name.to_lowercase())
            .collect();
        format!("unknown rhythm '{}', expected one of: {}", name, names.join(", "))
    })
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // The status line owns stdout
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<MonitorConfig> {
    let mut config = match &cli.config {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    config.apply(cli.overrides());
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run(config: MonitorConfig) -> Result<()> {
    let mut device = InputDevice::from_config(&config)
        .and_then(InputDevice::open)
        .map_err(startup_error)?;

    let pipeline = Pipeline::new(config.processing.clone()).context("Failed to build pipeline")?;
    let (smoother, parameter) = pipeline.smoother_info();
    info!(
        smoother,
        parameter,
        sampling_rate_hz = config.processing.sampling_rate_hz,
        buffer_size = config.processing.buffer_size,
        "pipeline ready"
    );

    let (command_tx, command_rx) = mpsc::channel(16);
    if config.source != SourceKind::Stdin {
        spawn_key_reader(tokio::io::stdin(), command_tx);
        println!("Keys: f = toggle filter, d = toggle display, q = quit (press Enter after the key)");
    } else {
        drop(command_tx);
    }

    let display = TerminalDisplay::new(std::io::stdout(), &config.display);
    let mut monitor = Monitor::new(&config, pipeline, display);
    let summary = monitor.run(&mut device, command_rx).await;

    println!("{}", summary);
    Ok(())
}

/// Device problems end the session before any sample is read; anything
/// else at this point is a settings problem
fn startup_error(e: EcgError) -> anyhow::Error {
    if e.is_startup_fatal() {
        error!(error = %e, "no input device available");
        anyhow::Error::new(e).context("No usable input device")
    } else {
        anyhow::Error::new(e).context("Invalid device settings")
    }
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    if cli.list_ports {
        let ports = list_ports();
        if ports.is_empty() {
            println!("No serial ports found");
        }
        for port in ports {
            println!("{}\t{}", port.path.display(), port.description);
        }
        return Ok(());
    }

    if cli.list_rhythms {
        for (name, rhythm) in HeartRhythm::presets() {
            println!("{:<12}{}", name.to_lowercase(), rhythm.description());
        }
        return Ok(());
    }

    let config = load_config(&cli)?;

    if cli.print_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let result = runtime.block_on(run(config));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}
