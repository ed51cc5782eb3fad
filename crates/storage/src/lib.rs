// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ferry-storage: durable records for the ferry daemon

mod error_log;
mod ledger;
mod run_log;
mod wal;

pub use error_log::{ErrorLog, ErrorOp, ErrorRecord};
pub use ledger::{Claim, Ledger, LedgerError, LedgerOp, LedgerRecord, LedgerStats, RecordStatus};
pub use run_log::RunLog;
pub use wal::{Wal, WalError};
