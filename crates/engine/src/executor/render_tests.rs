// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn item(tracker: &str, priority: &str) -> Item {
    Item {
        tracker: tracker.to_string(),
        priority: priority.to_string(),
        ..Item::new(42, "Login fails")
    }
}

#[test]
fn title_uses_id_and_subject() {
    assert_eq!(
        render_title("[Redmine #{id}] {subject}", &item("Bug", "Normal")),
        "[Redmine #42] Login fails"
    );
    assert_eq!(render_title("{subject}", &item("Bug", "Normal")), "Login fails");
}

#[parameterized(
    bug_urgent = { "Bug", "Urgent", &["bug", "priority:high", "from-redmine"] },
    feature_immediate = { "Feature", "Immediate", &["enhancement", "priority:high", "from-redmine"] },
    support_high = { "Support", "High", &["question", "priority:medium", "from-redmine"] },
    unknown_normal = { "Task", "Normal", &["from-redmine"] },
)]
fn labels_map_tracker_and_priority(tracker: &str, priority: &str, expected: &[&str]) {
    assert_eq!(labels_for(&item(tracker, priority)), expected);
}

#[test]
fn body_contains_metadata_and_back_link() {
    let mut item = item("Bug", "High");
    item.project = "Web".to_string();
    item.author = "Dana".to_string();
    item.created_on = "2026-03-01T09:00:00Z".to_string();
    item.description = "Steps to reproduce".to_string();

    let body = render_body(&item, "https://redmine.example.com/");

    assert!(body.starts_with("**From Redmine Issue #42**\n\n**Project**: Web\n"));
    assert!(body.contains("**Priority**: High\n"));
    assert!(body.contains("---\n\nSteps to reproduce\n\n---\n"));
    assert!(body.ends_with("*Synced from Redmine: https://redmine.example.com/issues/42*"));
}

#[test]
fn body_marks_missing_description() {
    let body = render_body(&item("Bug", "High"), "https://redmine.example.com");
    assert!(body.contains("*No description*"));
}

#[parameterized(
    plain = { "org/web", true },
    dotted = { "my-org/web.site_v2", true },
    no_slash = { "web", false },
    empty_owner = { "/web", false },
    empty_repo = { "org/", false },
    nested = { "org/web/extra", false },
    spaces = { "org/my web", false },
)]
fn repo_slug_format(target: &str, expected: bool) {
    assert_eq!(is_repo_slug(target), expected);
}
