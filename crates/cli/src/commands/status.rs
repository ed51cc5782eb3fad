// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ferry status` - Task table

use std::fmt;

use anyhow::Result;

use crate::client::{DaemonClient, TaskStatus};
use crate::error::FerryError;
use crate::output::{self, OutputFormat};

const HEADER: &str = "NAME                 KIND    EVERY    STATE    LAST RUN             RUNS  FAIL  RESULT";

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.running { "running" } else { "idle" };
        let result = match &self.last_result {
            Some(r) => format!("{} {}", r.status_word(), output::truncate(&r.message, 60)),
            None => "-".to_string(),
        };
        write!(
            f,
            "{:<20} {:<7} {:<8} {:<8} {:<20} {:>4}  {:>4}  {}",
            output::truncate(&self.id, 20),
            self.kind,
            self.interval,
            state,
            output::time(self.last_run.as_ref()),
            self.run_count,
            self.failure_count,
            result
        )
    }
}

pub fn handle(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let tasks = client.status().map_err(FerryError::from)?;
    if tasks.is_empty() {
        if let OutputFormat::Text = format {
            println!("No tasks");
            return Ok(());
        }
    }
    output::print_list(&tasks, Some(HEADER), format);
    Ok(())
}
