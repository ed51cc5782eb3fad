// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rendering origin items into remote items

use ferry_core::template::interpolate;
use ferry_core::Item;
use std::collections::HashMap;

/// Label added to every mirrored item
pub const SOURCE_LABEL: &str = "from-redmine";

/// Title from a `{id}` / `{subject}` format
pub fn render_title(format: &str, item: &Item) -> String {
    let vars: HashMap<&str, String> = [
        ("id", item.id.to_string()),
        ("subject", item.subject.clone()),
    ]
    .into_iter()
    .collect();
    interpolate(format, &vars)
}

/// Body with origin metadata, the description and a back-link
pub fn render_body(item: &Item, tracker_url: &str) -> String {
    let description = if item.description.trim().is_empty() {
        "*No description*"
    } else {
        item.description.as_str()
    };
    format!(
        "**From Redmine Issue #{id}**\n\n\
         **Project**: {project}\n\
         **Tracker**: {tracker}\n\
         **Priority**: {priority}\n\
         **Author**: {author}\n\
         **Created**: {created}\n\n\
         ---\n\n\
         {description}\n\n\
         ---\n\
         *Synced from Redmine: {url}/issues/{id}*",
        id = item.id,
        project = item.project,
        tracker = item.tracker,
        priority = item.priority,
        author = item.author,
        created = item.created_on,
        description = description,
        url = tracker_url.trim_end_matches('/'),
    )
}

/// Labels derived from tracker and priority names
pub fn labels_for(item: &Item) -> Vec<String> {
    let mut labels = Vec::new();
    match item.tracker.as_str() {
        "Bug" => labels.push("bug"),
        "Feature" => labels.push("enhancement"),
        "Support" => labels.push("question"),
        _ => {}
    }
    match item.priority.as_str() {
        "Urgent" | "Immediate" => labels.push("priority:high"),
        "High" => labels.push("priority:medium"),
        _ => {}
    }
    labels.push(SOURCE_LABEL);
    labels.into_iter().map(str::to_string).collect()
}

/// `owner/repo` with both parts non-empty and no further separators
pub fn is_repo_slug(target: &str) -> bool {
    let valid_part = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    match target.split_once('/') {
        Some((owner, repo)) => valid_part(owner) && valid_part(repo),
        None => false,
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
