// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use ferry_core::ConfigError;
use thiserror::Error;

/// Errors from scheduler administration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("scheduler is stopped")]
    Stopped,
}

/// Errors that reject an inbound notification before any work is queued
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InboundError {
    #[error("missing signature")]
    MissingSignature,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Errors from applying a configuration
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
