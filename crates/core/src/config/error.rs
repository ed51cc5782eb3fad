// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use thiserror::Error;

/// Configuration load, save and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("no repositories or projects declared")]
    NoIdentities,
    #[error("{owner}: missing required field `{field}`")]
    MissingField { owner: String, field: &'static str },
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
    #[error("duplicate identity '{0}'")]
    DuplicateIdentity(String),
    #[error("{id}: invalid interval '{value}': {reason}")]
    InvalidInterval {
        id: String,
        value: String,
        reason: String,
    },
    #[error("{id}: interval '{value}' is shorter than one second")]
    IntervalTooShort { id: String, value: String },
    #[error("http_port {0} is out of range 1..=65535")]
    PortOutOfRange(i64),
    #[error("projects are declared but [{0}] credentials are missing")]
    MissingCredentials(&'static str),
    #[error("{id}: `{field}` must be a non-zero custom field id")]
    InvalidFieldId { id: String, field: &'static str },
}
