// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ferry config` - Offline configuration tools

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use ferry_core::{load_config, render_config, save_config};

use crate::error::FerryError;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Validate a configuration file and list its tasks
    Check {
        /// Path to the configuration file
        path: PathBuf,
    },
    /// Print the configuration with defaults filled in
    Normalize {
        /// Path to the configuration file
        path: PathBuf,
        /// Rewrite the file in place instead of printing
        #[arg(long)]
        write: bool,
    },
}

pub fn handle(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Check { path } => {
            let config = load_config(&path).map_err(|e| {
                FerryError::new(format!("{} is invalid", path.display()))
                    .with_context(e.to_string())
                    .with_suggestion("Fix the file and run: ferry config check <path>")
            })?;
            let definitions = config
                .definitions()
                .with_context(|| format!("{} is invalid", path.display()))?;

            println!(
                "{}: ok ({} repositories, {} projects)",
                path.display(),
                config.repos.len(),
                config.projects.len()
            );
            for definition in &definitions {
                println!(
                    "  {:<20} {:<7} every {}",
                    definition.id.as_str(),
                    definition.kind.label(),
                    definition.interval_text
                );
            }
        }
        ConfigCommand::Normalize { path, write } => {
            let config = load_config(&path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            if write {
                save_config(&path, &config)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Wrote {}", path.display());
            } else {
                print!("{}", render_config(&config)?);
            }
        }
    }
    Ok(())
}
