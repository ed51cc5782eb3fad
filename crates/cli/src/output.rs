// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Print output in the specified format
pub fn print<T: Serialize + std::fmt::Display>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", value),
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(value) {
                println!("{}", json);
            }
        }
    }
}

/// Print a list of items, with an optional header line in text mode
pub fn print_list<T: Serialize + std::fmt::Display>(
    items: &[T],
    header: Option<&str>,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Text => {
            if let Some(header) = header {
                println!("{}", header);
            }
            for item in items {
                println!("{}", item);
            }
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(items) {
                println!("{}", json);
            }
        }
    }
}

/// Timestamp column, `-` when absent
pub fn time(at: Option<&DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Cut `text` to at most `width` characters
pub fn truncate(text: &str, width: usize) -> String {
    match text.char_indices().nth(width) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
