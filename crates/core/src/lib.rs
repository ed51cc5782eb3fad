// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ferry-core: shared model for the ferry synchronization daemon
//!
//! This crate provides:
//! - Task identities and immutable task definitions
//! - The TOML configuration model with load, save and validation
//! - Run results, origin items and custom field values
//! - A wall-clock abstraction with a fake for tests

pub mod clock;
pub mod config;
pub mod item;
pub mod result;
pub mod task;
pub mod template;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    load_config, parse_config, render_config, save_config, Config, ConfigError, ConfigHolder,
    ExecutorSettings,
};
pub use item::{FieldValue, Item};
pub use result::{ItemOutcome, ItemTally, RunResult};
pub use task::{ItemId, SyncScope, TaskDefinition, TaskId, TaskKind};
