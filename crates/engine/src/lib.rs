// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ferry-engine: executors, scheduler, reloads and inbound triggers

mod error;
pub mod executor;
mod inbound;
mod reload;
mod scheduler;

pub use error::{InboundError, ReloadError, SchedulerError};
pub use executor::{Dispatcher, IssueExecutor, MirrorExecutor, SyncExecutor, SyncStats};
pub use inbound::{
    sign, verify_signature, InboundStats, InboundTrigger, ItemChanged, DEFAULT_DISPATCH_TIMEOUT,
    DEFAULT_MAX_IN_FLIGHT, SIGNATURE_HEADER,
};
pub use reload::{fingerprint, ReloadCoordinator, ReloadOutcome, POLL_INTERVAL};
pub use scheduler::{LoadReport, ManualTrigger, Scheduler, TaskStatus};
