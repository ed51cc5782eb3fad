// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod config;
pub mod errors;
pub mod stats;
pub mod status;
pub mod trigger;
