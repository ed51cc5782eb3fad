// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ferry trigger` - Run a task now

use anyhow::Result;
use clap::Args;

use crate::client::{DaemonClient, TriggerOutcome};
use crate::error::FerryError;

#[derive(Args)]
pub struct TriggerArgs {
    /// Repository name or project identifier
    pub name: String,
}

pub fn handle(client: &DaemonClient, args: TriggerArgs) -> Result<()> {
    match client.trigger(&args.name).map_err(FerryError::from)? {
        TriggerOutcome::Triggered => println!("Triggered: {}", args.name),
        TriggerOutcome::AlreadyRunning => println!("Already running: {}", args.name),
    }
    Ok(())
}
