//! # Cobalt Simulation Runner
//!
//! Runs the demo robot program against the simulated HAL: each run builds
//! the robot, ticks the command scheduler, prints a JSON summary on stdout
//! and resets every HAL handle before the next run.
//!
//! # Usage
//!
//! ```bash
//! # Defaults (2 runs x 150 ticks, paced at the scheduler period)
//! cobalt_sim
//!
//! # Config file, overriding the run shape
//! cobalt_sim --config config/robot.toml --runs 5 --ticks 500
//!
//! # Verbose JSON logs on stderr
//! cobalt_sim -v --json
//! ```

mod config;
mod error;
mod robot;
mod runner;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use cobalt_common::config::{ConfigLoader, LogLevel};
use cobalt_hal::{init_global, reset_all_handles};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::SimConfig;

/// Cobalt simulation runner - HAL handle registry and command scheduler demo
#[derive(Parser, Debug)]
#[command(name = "cobalt_sim")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Run the demo robot program against the simulated HAL")]
#[command(long_about = None)]
struct Args {
    /// Path to robot.toml. Built-in defaults are used when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of runs (overrides [sim] runs)
    #[arg(long)]
    runs: Option<u32>,

    /// Ticks per run (overrides [sim] ticks_per_run)
    #[arg(long)]
    ticks: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            setup_tracing(&args, LogLevel::default());
            error!("configuration error: {e}");
            std::process::exit(1);
        }
    };
    setup_tracing(&args, config.shared.log_level);

    if let Err(e) = run(config) {
        error!("simulation failed: {e}");
        std::process::exit(1);
    }
}

fn load_config(args: &Args) -> Result<SimConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(runs) = args.runs {
        config.sim.runs = runs;
    }
    if let Some(ticks) = args.ticks {
        config.sim.ticks_per_run = ticks;
    }
    config.validate()?;
    Ok(config)
}

fn run(config: SimConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        service = %config.shared.service_name,
        runs = config.sim.runs,
        ticks_per_run = config.sim.ticks_per_run,
        period_ms = config.scheduler.period_ms,
        "Cobalt sim v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let registry = init_global(&config.hal);
    for run in 0..config.sim.runs {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let summary = runner::run_once(run, &registry, &config, &running)?;
        println!("{}", serde_json::to_string(&summary)?);
        reset_all_handles();
    }

    info!(resets = registry.reset_count(), "Cobalt sim shutdown complete");
    Ok(())
}

/// Install the tracing subscriber on stderr. `RUST_LOG` wins when set;
/// otherwise `-v` forces debug over the configured level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let level = if args.verbose {
        LogLevel::Debug
    } else {
        level
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
