//! CLI Entry Point for scope-daq
//!
//! Provides a command-line interface for:
//! - Running a simulated capture session: a mock oscilloscope bench feeds the capture
//!   thread while the main thread plays the render loop and prints the measurement table
//! - Printing the resolved configuration
//!
//! # Usage
//!
//! ```bash
//! scope-daq capture --captures 20 --scopes 2 --channels 4
//! scope-daq capture --single
//! scope-daq config --config config/scope.toml
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scope_daq::capture::CaptureCoordinator;
use scope_daq::config::ScopeConfig;
use scope_daq::session::{MockScope, MockSession, TriggerMode};
use scope_daq::stream::{RegistryAction, StreamDescriptor, StreamRegistry};
use scope_daq::sync::{ShutdownFlag, WaveformHandshake};
use scope_daq::tracing_setup;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "scope-daq")]
#[command(about = "Oscilloscope capture coordination with a simulated instrument bench", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the capture thread against simulated scopes and print measurements
    Capture {
        /// Configuration file (defaults to config/scope.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of captures to render before exiting
        #[arg(long, default_value = "10")]
        captures: u64,

        /// Number of simulated scopes
        #[arg(long, default_value = "1")]
        scopes: usize,

        /// Channels per scope
        #[arg(long, default_value = "2")]
        channels: usize,

        /// Simulated trigger period in milliseconds
        #[arg(long, default_value = "50")]
        trigger_ms: u64,

        /// Capture a single acquisition, then stop the trigger
        #[arg(long)]
        single: bool,
    },

    /// Print the resolved configuration as TOML
    Config {
        /// Configuration file (defaults to config/scope.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Capture {
            config,
            captures,
            scopes,
            channels,
            trigger_ms,
            single,
        } => {
            let config = load_config(config)?;
            tracing_setup::init_from_config(&config)?;
            let bench = (1..=scopes)
                .map(|i| {
                    MockScope::with_analog_channels(
                        format!("scope{i}"),
                        channels,
                        Duration::from_millis(trigger_ms),
                    )
                })
                .collect();
            run_capture(&config, bench, if single { 1 } else { captures }, single)
        }
        Commands::Config { config } => {
            let config = load_config(config)?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<ScopeConfig> {
    let config = match path {
        Some(path) => ScopeConfig::load_from(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ScopeConfig::load()?,
    };
    Ok(config)
}

fn run_capture(
    config: &ScopeConfig,
    bench: Vec<MockScope>,
    captures: u64,
    single: bool,
) -> Result<()> {
    info!(app = %config.application.name, "Starting simulated capture session");

    let session = Arc::new(MockSession::new(bench));
    if single {
        session.arm(TriggerMode::Single);
    }

    // Measurement table: one Vpp row per channel, newest scope first
    let mut registry = StreamRegistry::new();
    for channel in session.channels() {
        registry.apply(RegistryAction::Add(StreamDescriptor::new(channel, 1)?))?;
    }
    if let Some(last) = registry.iter().last().cloned() {
        registry.apply(RegistryAction::Move {
            stream: last,
            dest: 0,
        })?;
    }

    let handshake = Arc::new(WaveformHandshake::new());
    let shutdown = ShutdownFlag::new();
    let capture = CaptureCoordinator::new(
        Arc::clone(&session),
        Arc::clone(&handshake),
        shutdown.clone(),
        &config.capture,
    )
    .spawn()?;

    let mut rendered = 0;
    while rendered < captures {
        let Some(window) = handshake.wait_ready_timeout(config.capture.ready_timeout()) else {
            debug!(state = %capture.state(), "No waveform yet, redrawing");
            if session.trigger_mode() == TriggerMode::Stopped && rendered > 0 {
                break;
            }
            continue;
        };

        rendered += 1;
        println!("--- capture {rendered} ---");
        for row in registry.rows() {
            println!("{row}");
        }
        window.finish();
    }

    let stats = capture.shutdown()?;
    info!(
        rendered,
        downloads = stats.downloads,
        retries = stats.retries,
        "Capture session finished"
    );

    registry.clear();
    let leaked: Vec<_> = session
        .channels()
        .filter(|c| !c.is_unreferenced())
        .map(|c| c.name().to_string())
        .collect();
    if !leaked.is_empty() {
        warn!(?leaked, "Channels still referenced after teardown");
    }

    Ok(())
}
