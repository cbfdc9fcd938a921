//! Revolve CLI - Checkpoint Schedule Planning and Verification
//!
//! Operational entry point for the revolve_core scheduling library.
//!
//! # Commands
//!
//! - `revolve plan --steps <n>` - Print the action sequence for a problem
//! - `revolve cost --steps <n>` - Tabulate recomputation cost per slot count
//! - `revolve verify` - Compare checkpointed and store-all gradients of a
//!   1-D acoustic survey
//! - `revolve check` - Show configuration and self-test the scheduler
//!
//! # Configuration
//!
//! Settings come from an optional TOML file (`--config`), then `REVOLVE_*`
//! environment variables, then command line flags.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod wave;

pub use error::{CliError, Result};

use config::{build_config, CliArgs};

/// Revolve optimal checkpointing CLI
#[derive(Parser)]
#[command(name = "revolve")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "REVOLVE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, global = true)]
    format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full action sequence
    Plan {
        /// Number of time steps
        #[arg(short = 'n', long)]
        steps: usize,

        /// Number of checkpoint slots
        #[arg(short, long)]
        slots: Option<usize>,

        /// Snapshot size in bytes, to derive slots from the memory budget
        #[arg(long)]
        state_bytes: Option<usize>,
    },

    /// Tabulate the optimal cost over a range of slot counts
    Cost {
        /// Number of time steps
        #[arg(short = 'n', long)]
        steps: usize,

        /// Smallest slot count
        #[arg(long, default_value = "1")]
        min_slots: usize,

        /// Largest slot count
        #[arg(long, default_value = "16")]
        max_slots: usize,
    },

    /// Verify checkpointed gradients against store-all on a wave model
    Verify {
        /// Number of grid points
        #[arg(long, default_value = "101")]
        nx: usize,

        /// Simulated time in milliseconds
        #[arg(short = 't', long, default_value = "1000")]
        duration: f64,

        /// Number of checkpoint slots
        #[arg(short, long)]
        slots: Option<usize>,
    },

    /// Check configuration and self-test the scheduler
    Check,
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config_file: cli.config.clone(),
        log_level: cli.log_level.clone(),
        format: cli.format.clone(),
        verbose: cli.verbose,
    };
    let config = build_config(&args).context("failed to load configuration")?;

    init_tracing(config.log_level.as_filter_str());
    debug!(log_level = %config.log_level, format = %config.format, "Configuration loaded");

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Plan {
            steps,
            slots,
            state_bytes,
        } => commands::plan::run(steps, slots, state_bytes, &config).context("plan failed")?,
        Commands::Cost {
            steps,
            min_slots,
            max_slots,
        } => commands::cost::run(steps, min_slots, max_slots, &config).context("cost failed")?,
        Commands::Verify {
            nx,
            duration,
            slots,
        } => commands::verify::run(nx, duration, slots, &config).context("verification failed")?,
        Commands::Check => commands::check::run(&config).context("check failed")?,
    }
    Ok(())
}
