// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reading and writing configuration files

use super::{Config, ConfigError};
use std::path::Path;

/// Parse and validate a configuration document
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Read, parse, fill defaults and validate
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Render a validated configuration as TOML with every default explicit
pub fn render_config(config: &Config) -> Result<String, ConfigError> {
    config.validate()?;
    Ok(toml::to_string_pretty(config)?)
}

/// Validate and write the configuration
///
/// The file is written to a sibling temp file and renamed into place so a
/// watcher never observes a half-written document.
pub fn save_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let content = render_config(config)?;
    let tmp = path.with_extension("toml.tmp");
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    std::fs::write(&tmp, content).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)?;
    tracing::info!(path = %path.display(), "configuration saved");
    Ok(())
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
