// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ferry - operator CLI for the ferry synchronization daemon

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod error;
mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{config, errors, stats, status, trigger};

use crate::client::{DaemonClient, DEFAULT_URL};
use crate::error::FerryError;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "ferry",
    version,
    about = "Ferry - repository mirroring and issue synchronization"
)]
struct Cli {
    /// Base URL of the ferryd HTTP API
    #[arg(long, global = true, env = "FERRY_URL", default_value = DEFAULT_URL)]
    url: String,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every task with its last result and counters
    Status,
    /// Run a task now
    Trigger(trigger::TriggerArgs),
    /// Show synchronization and notification counters
    Stats,
    /// List unresolved errors, or resolve one
    Errors(errors::ErrorsArgs),
    /// Check or normalize a configuration file (no daemon needed)
    Config(config::ConfigArgs),
}

fn main() -> ExitCode {
    setup_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<FerryError>() {
                Some(explained) => eprint!("{}", explained),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Config tools work on files and never contact the daemon
    if let Commands::Config(args) = cli.command {
        return config::handle(args);
    }

    let client = DaemonClient::new(&cli.url);
    tracing::debug!(url = client.base_url(), "using daemon");

    match cli.command {
        Commands::Status => status::handle(&client, cli.format),
        Commands::Trigger(args) => trigger::handle(&client, args),
        Commands::Stats => stats::handle(&client, cli.format),
        Commands::Errors(args) => errors::handle(&client, args, cli.format),
        Commands::Config(args) => config::handle(args),
    }
}

/// Diagnostics go to stderr, quiet unless `RUST_LOG` asks for more
fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
