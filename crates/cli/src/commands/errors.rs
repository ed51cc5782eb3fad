// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ferry errors` - Unresolved synchronization errors

use std::fmt;

use anyhow::Result;
use clap::Args;

use crate::client::{DaemonClient, ErrorEntry};
use crate::error::FerryError;
use crate::output::{self, OutputFormat};

const HEADER: &str = "ID     TASK                 ITEM     AT                   MESSAGE";

#[derive(Args)]
pub struct ErrorsArgs {
    /// Mark the error with this id as resolved
    #[arg(long, value_name = "ID")]
    pub resolve: Option<u64>,
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let item = self
            .item_id
            .map(|id| format!("#{}", id))
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{:<6} {:<20} {:<8} {:<20} {}",
            self.id,
            output::truncate(&self.task, 20),
            item,
            output::time(Some(&self.at)),
            self.message.lines().next().unwrap_or_default()
        )
    }
}

pub fn handle(client: &DaemonClient, args: ErrorsArgs, format: OutputFormat) -> Result<()> {
    if let Some(id) = args.resolve {
        let entry = client.resolve_error(id).map_err(FerryError::from)?;
        match format {
            OutputFormat::Text => println!("Resolved error {} ({})", entry.id, entry.task),
            OutputFormat::Json => output::print(&entry, format),
        }
        return Ok(());
    }

    let entries = client.errors().map_err(FerryError::from)?;
    if entries.is_empty() {
        if let OutputFormat::Text = format {
            println!("No unresolved errors");
            return Ok(());
        }
    }
    output::print_list(&entries, Some(HEADER), format);
    Ok(())
}
