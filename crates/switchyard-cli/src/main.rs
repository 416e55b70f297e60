//! Switchyard CLI - operator tooling for the event dispatch core.
//!
//! Inspects the resolved configuration and runs in-process simulations of
//! inline, distributed, and dual delivery against the in-memory transport.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use switchyard_config::{AdapterMode, Config};

mod commands;
pub mod config_bridge;
mod theme;

use commands::simulate::SimulateOptions;

/// Switchyard - dual-delivery event dispatch
#[derive(Parser)]
#[command(name = "switchyard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a configuration file (defaults to ./switchyard.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// View and validate configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Publish synthetic events and run the consumer group to completion
    Simulate {
        /// Number of events to publish
        #[arg(short, long, default_value = "100")]
        events: usize,

        /// Distinct accounts the events are spread over
        #[arg(short, long, default_value = "10")]
        accounts: u32,

        /// Override the delivery adapter (inline, distributed, dual)
        #[arg(long)]
        adapter: Option<AdapterMode>,

        /// Override the consume cutover flag
        #[arg(long)]
        consume: Option<bool>,

        /// Fail the handler for every n-th profile id
        #[arg(long)]
        fail_every: Option<usize>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration
    Show {
        /// Output format: toml (default) or json
        #[arg(short, long, default_value = "toml")]
        format: String,
        /// Only show one section
        #[arg(short, long)]
        section: Option<String>,
    },
    /// Validate the configuration and report errors
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config for logging setup. `config check` reports errors itself.
    let loaded = Config::load(cli.config.as_deref()).ok().map(|r| r.config);

    let log_config = if let Some(cfg) = &loaded {
        config_bridge::to_log_config(cfg, cli.verbose)
    } else {
        let level = if cli.verbose { "debug" } else { "info" };
        switchyard_telemetry::LogConfig::new(level)
    };
    let _log_guard = match switchyard_telemetry::setup_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        },
    };

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Show { format, section } => {
                commands::config::show_config(cli.config.as_deref(), &format, section.as_deref())?;
            },
            ConfigCommands::Check => {
                commands::config::check_config(cli.config.as_deref())?;
            },
        },
        Commands::Simulate {
            events,
            accounts,
            adapter,
            consume,
            fail_every,
        } => {
            let config = match loaded {
                Some(config) => config,
                None => Config::load(cli.config.as_deref())?.config,
            };
            let options = SimulateOptions {
                events,
                accounts,
                adapter,
                consume,
                fail_every,
            };
            commands::simulate::simulate(&config, &options).await?;
        },
    }

    Ok(())
}
