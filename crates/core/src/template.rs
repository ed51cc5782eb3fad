// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Placeholder interpolation for titles and credential values

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static ENV_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+)(?::-([^}]*))?\}").expect("constant regex pattern is valid"));

/// Replace `{name}` placeholders with values from `vars`
///
/// Unknown placeholders are left as-is.
pub fn interpolate(template: &str, vars: &HashMap<&str, String>) -> String {
    VAR_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            vars.get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .to_string()
}

/// Expand `${VAR}` and `${VAR:-default}` from the process environment
///
/// Used for credentials so config files can reference secrets without
/// storing them. An unset variable without a default expands to nothing.
pub fn expand_env(value: &str) -> String {
    ENV_PATTERN
        .replace_all(value, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| {
                caps.get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            })
        })
        .to_string()
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
