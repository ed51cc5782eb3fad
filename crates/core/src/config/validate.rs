// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation and conversion into task definitions

use super::{Config, ConfigError, ProjectConfig, RepoConfig};
use crate::task::{TaskDefinition, TaskId};
use std::collections::HashSet;
use std::time::Duration;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

impl Config {
    /// Check the configuration without producing definitions
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.definitions().map(|_| ())
    }

    /// Validate and produce task definitions in declaration order
    ///
    /// Repositories and projects share one identity namespace.
    pub fn definitions(&self) -> Result<Vec<TaskDefinition>, ConfigError> {
        if !(1..=65535).contains(&self.http_port) {
            return Err(ConfigError::PortOutOfRange(self.http_port));
        }
        if self.repos.is_empty() && self.projects.is_empty() {
            return Err(ConfigError::NoIdentities);
        }
        if !self.projects.is_empty() {
            self.check_credentials()?;
        }

        let mut seen = HashSet::new();
        let mut definitions = Vec::with_capacity(self.repos.len() + self.projects.len());

        for (index, repo) in self.repos.iter().enumerate() {
            let definition = repo_definition(index, repo)?;
            if !seen.insert(definition.id.clone()) {
                return Err(ConfigError::DuplicateIdentity(definition.id.0));
            }
            definitions.push(definition);
        }
        for (index, project) in self.projects.iter().enumerate() {
            let definition = project_definition(index, project)?;
            if !seen.insert(definition.id.clone()) {
                return Err(ConfigError::DuplicateIdentity(definition.id.0));
            }
            definitions.push(definition);
        }

        Ok(definitions)
    }

    fn check_credentials(&self) -> Result<(), ConfigError> {
        let tracker = self
            .tracker
            .as_ref()
            .ok_or(ConfigError::MissingCredentials("tracker"))?;
        if tracker.url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                owner: "tracker".to_string(),
                field: "url",
            });
        }
        let remote = self
            .remote
            .as_ref()
            .ok_or(ConfigError::MissingCredentials("remote"))?;
        if remote.token.trim().is_empty() {
            return Err(ConfigError::MissingField {
                owner: "remote".to_string(),
                field: "token",
            });
        }
        Ok(())
    }
}

fn repo_definition(index: usize, repo: &RepoConfig) -> Result<TaskDefinition, ConfigError> {
    let owner = if repo.name.is_empty() {
        format!("repo[{}]", index)
    } else {
        repo.name.clone()
    };
    require(&owner, "name", &repo.name)?;
    require(&owner, "url", &repo.url)?;
    require(&owner, "local_path", &repo.local_path)?;
    require(&owner, "interval", &repo.interval)?;

    let id = identity(&repo.name)?;
    let interval = parse_interval(&owner, &repo.interval)?;
    let mut definition = TaskDefinition::mirror(id, repo.url.clone(), &repo.local_path, interval);
    definition.interval_text = repo.interval.clone();
    Ok(definition)
}

fn project_definition(index: usize, project: &ProjectConfig) -> Result<TaskDefinition, ConfigError> {
    let owner = if project.identifier.is_empty() {
        format!("project[{}]", index)
    } else {
        project.identifier.clone()
    };
    require(&owner, "identifier", &project.identifier)?;
    require(&owner, "interval", &project.interval)?;

    let id = identity(&project.identifier)?;
    let interval = parse_interval(&owner, &project.interval)?;
    if project.target_field == 0 {
        return Err(ConfigError::InvalidFieldId {
            id: owner,
            field: "target_field",
        });
    }
    if project.reference_field == 0 {
        return Err(ConfigError::InvalidFieldId {
            id: owner,
            field: "reference_field",
        });
    }

    let mut definition = TaskDefinition::issues(
        id,
        project.identifier.clone(),
        project.target_field,
        project.reference_field,
        interval,
    );
    definition.interval_text = project.interval.clone();
    Ok(definition)
}

fn require(owner: &str, field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField {
            owner: owner.to_string(),
            field,
        });
    }
    Ok(())
}

fn identity(raw: &str) -> Result<TaskId, ConfigError> {
    let id = TaskId::new(raw);
    id.validate().map_err(ConfigError::InvalidIdentity)?;
    Ok(id)
}

fn parse_interval(id: &str, text: &str) -> Result<Duration, ConfigError> {
    let interval =
        humantime::parse_duration(text.trim()).map_err(|e| ConfigError::InvalidInterval {
            id: id.to_string(),
            value: text.to_string(),
            reason: e.to_string(),
        })?;
    if interval < MIN_INTERVAL {
        return Err(ConfigError::IntervalTooShort {
            id: id.to_string(),
            value: text.to_string(),
        });
    }
    Ok(interval)
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
