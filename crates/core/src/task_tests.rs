// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    simple = { "repo-a" },
    dotted = { "backend.api" },
    underscore = { "my_project" },
    max_len = { "a234567890123456789012345678901234567890123456789012345678901234" },
)]
fn valid_identities(id: &str) {
    assert!(TaskId::new(id).validate().is_ok());
}

#[parameterized(
    empty = { "" },
    too_long = { "a2345678901234567890123456789012345678901234567890123456789012345" },
    whitespace = { "repo a" },
    slash = { "org/repo" },
    tab = { "repo\ta" },
)]
fn invalid_identities(id: &str) {
    assert!(TaskId::new(id).validate().is_err());
}

#[test]
fn task_id_display_and_conversions() {
    let id: TaskId = "repo-a".into();
    assert_eq!(id.to_string(), "repo-a");
    assert_eq!(id.as_str(), "repo-a");
    assert_eq!(TaskId::from("repo-a".to_string()), id);
}

#[test]
fn kind_labels() {
    let mirror = TaskDefinition::mirror("a", "git@host:a.git", "/tmp/a", Duration::from_secs(60));
    let issues = TaskDefinition::issues("b", "web", 1, 2, Duration::from_secs(60));
    assert_eq!(mirror.kind.label(), "mirror");
    assert_eq!(issues.kind.label(), "issues");
}

#[test]
fn constructors_render_interval_text() {
    let def = TaskDefinition::mirror("a", "u", "/p", Duration::from_secs(300));
    assert_eq!(def.interval_text, "5m");
}

#[test]
fn definition_serializes_flat_with_kind_tag() {
    let def = TaskDefinition::issues("web", "web", 12, 13, Duration::from_secs(600));
    let json = serde_json::to_value(&def).unwrap();

    assert_eq!(json["id"], "web");
    assert_eq!(json["kind"], "issues");
    assert_eq!(json["project"], "web");
    assert_eq!(json["target_field"], 12);
    assert_eq!(json["interval"], "10m");

    let back: TaskDefinition = serde_json::from_value(json).unwrap();
    assert_eq!(back, def);
}

#[test]
fn scope_display() {
    assert_eq!(SyncScope::Full.to_string(), "full");
    assert_eq!(SyncScope::Item(42).to_string(), "item:42");
}
