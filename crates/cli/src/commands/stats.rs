// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ferry stats` - Synchronization counters

use std::fmt;

use anyhow::Result;

use crate::client::{DaemonClient, Stats};
use crate::error::FerryError;
use crate::output::{self, OutputFormat};

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Issues")?;
        writeln!(f, "  Synced (total): {}", self.sync.total_synced)?;
        writeln!(f, "  Synced today:   {}", self.sync.synced_today)?;
        writeln!(f, "  Pending claims: {}", self.sync.pending_claims)?;
        writeln!(f, "  Open errors:    {}", self.sync.unresolved_errors)?;
        writeln!(f, "Notifications")?;
        writeln!(
            f,
            "  Accepted: {}  Rejected: {}",
            self.inbound.accepted, self.inbound.rejected
        )?;
        write!(
            f,
            "  Completed: {}  Failed: {}  Timed out: {}",
            self.inbound.completed, self.inbound.failed, self.inbound.timed_out
        )
    }
}

pub fn handle(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let stats = client.stats().map_err(FerryError::from)?;
    output::print(&stats, format);
    Ok(())
}
