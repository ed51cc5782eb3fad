// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::super::{RemoteConfig, TrackerConfig};
use super::*;
use crate::task::TaskKind;
use yare::parameterized;

fn repo(name: &str, interval: &str) -> RepoConfig {
    RepoConfig {
        name: name.to_string(),
        url: format!("git@example.com:org/{}.git", name),
        local_path: format!("/srv/mirror/{}.git", name),
        interval: interval.to_string(),
    }
}

fn project(identifier: &str) -> ProjectConfig {
    ProjectConfig {
        identifier: identifier.to_string(),
        interval: "5m".to_string(),
        target_field: 12,
        reference_field: 13,
    }
}

fn with_repos(repos: Vec<RepoConfig>) -> Config {
    Config {
        repos,
        ..Config::default()
    }
}

fn with_credentials(projects: Vec<ProjectConfig>) -> Config {
    Config {
        tracker: Some(TrackerConfig {
            url: "https://redmine.example.com".to_string(),
            api_key: "key".to_string(),
        }),
        remote: Some(RemoteConfig {
            token: "token".to_string(),
            ..RemoteConfig::default()
        }),
        projects,
        ..Config::default()
    }
}

#[test]
fn definitions_keep_declaration_order() {
    let mut config = with_credentials(vec![project("web")]);
    config.repos = vec![repo("repo-b", "10m"), repo("repo-a", "5m")];

    let defs = config.definitions().unwrap();
    let ids: Vec<&str> = defs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["repo-b", "repo-a", "web"]);

    assert_eq!(defs[1].interval, Duration::from_secs(300));
    assert_eq!(defs[1].interval_text, "5m");
    assert!(matches!(defs[2].kind, TaskKind::Issues { target_field: 12, .. }));
}

#[test]
fn zero_identities_rejected() {
    let err = Config::default().validate().unwrap_err();
    assert!(matches!(err, ConfigError::NoIdentities));
}

#[test]
fn unparseable_interval_names_identity() {
    let err = with_repos(vec![repo("repo-a", "every tuesday")])
        .validate()
        .unwrap_err();
    match &err {
        ConfigError::InvalidInterval { id, value, .. } => {
            assert_eq!(id, "repo-a");
            assert_eq!(value, "every tuesday");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("repo-a"));
}

#[parameterized(
    zero = { "0s" },
    sub_second = { "500ms" },
)]
fn interval_below_one_second_rejected(interval: &str) {
    let err = with_repos(vec![repo("repo-a", interval)])
        .validate()
        .unwrap_err();
    assert!(matches!(err, ConfigError::IntervalTooShort { ref id, .. } if id == "repo-a"));
}

#[test]
fn one_second_interval_accepted() {
    let defs = with_repos(vec![repo("repo-a", "1s")]).definitions().unwrap();
    assert_eq!(defs[0].interval, Duration::from_secs(1));
}

#[test]
fn duplicate_identity_across_kinds_rejected() {
    let mut config = with_credentials(vec![project("shared")]);
    config.repos = vec![repo("shared", "5m")];

    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateIdentity(ref id) if id == "shared"));
}

#[parameterized(
    missing_url = { "url" },
    missing_local_path = { "local_path" },
    missing_interval = { "interval" },
)]
fn missing_repo_field_rejected(field: &str) {
    let mut r = repo("repo-a", "5m");
    match field {
        "url" => r.url.clear(),
        "local_path" => r.local_path.clear(),
        _ => r.interval.clear(),
    }
    let err = with_repos(vec![r]).validate().unwrap_err();
    match err {
        ConfigError::MissingField { owner, field: f } => {
            assert_eq!(owner, "repo-a");
            assert_eq!(f, field);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unnamed_repo_reported_by_position() {
    let err = with_repos(vec![repo("repo-a", "5m"), repo("", "5m")])
        .validate()
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingField { ref owner, field: "name" } if owner == "repo[1]"));
}

#[test]
fn invalid_identity_rejected() {
    let err = with_repos(vec![repo("org/repo", "5m")]).validate().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidIdentity(_)));
}

#[parameterized(
    zero = { 0 },
    too_large = { 70000 },
    negative = { -1 },
)]
fn port_out_of_range_rejected(port: i64) {
    let mut config = with_repos(vec![repo("repo-a", "5m")]);
    config.http_port = port;
    assert!(matches!(config.validate(), Err(ConfigError::PortOutOfRange(p)) if p == port));
}

#[test]
fn projects_require_tracker_credentials() {
    let mut config = with_credentials(vec![project("web")]);
    config.tracker = None;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingCredentials("tracker"))
    ));
}

#[test]
fn projects_require_remote_token() {
    let mut config = with_credentials(vec![project("web")]);
    config.remote = Some(RemoteConfig::default());
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingField { ref owner, field: "token" }) if owner == "remote"
    ));
}

#[test]
fn zero_field_id_rejected() {
    let mut p = project("web");
    p.reference_field = 0;
    let err = with_credentials(vec![p]).validate().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidFieldId { ref id, field: "reference_field" } if id == "web"
    ));
}
