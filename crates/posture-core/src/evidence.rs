//! Evidence gathered about a repository before evaluation.
//!
//! An [`EvidenceSnapshot`] is fully populated before any check or probe reads
//! it and is shared read-only behind an `Arc` afterwards. Each collector owns
//! one named section, so sections never overlap.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Identity of the repository under assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoInfo {
    /// Forge host, e.g. `github.com`.
    pub host: String,
    /// Full URI, e.g. `github.com/owner/repo`.
    pub uri: String,
    #[serde(default)]
    pub commit_sha: String,
    #[serde(default)]
    pub default_branch: String,
}

impl RepoInfo {
    pub fn new(host: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            uri: uri.into(),
            commit_sha: String::new(),
            default_branch: String::new(),
        }
    }

    pub fn with_commit(mut self, sha: impl Into<String>) -> Self {
        self.commit_sha = sha.into();
        self
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    /// The URI without its host prefix, e.g. `owner/repo`.
    pub fn name(&self) -> &str {
        self.uri
            .strip_prefix(&self.host)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&self.uri)
    }

    /// Metadata exposed to remediation templates as `${{ metadata.KEY }}`.
    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("repository.host".to_string(), self.host.clone()),
            ("repository.name".to_string(), self.name().to_string()),
            ("repository.uri".to_string(), self.uri.clone()),
            ("repository.sha1".to_string(), self.commit_sha.clone()),
            (
                "repository.defaultBranch".to_string(),
                self.default_branch.clone(),
            ),
        ])
    }
}

/// Immutable evidence shared by every worker of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSnapshot {
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub sections: BTreeMap<String, serde_json::Value>,
}

impl EvidenceSnapshot {
    /// Empty snapshot seeded with the repository metadata.
    pub fn for_repo(repo: &RepoInfo) -> Self {
        Self {
            metadata: repo.to_metadata(),
            sections: BTreeMap::new(),
        }
    }

    /// Add or replace a section.
    pub fn with_section(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.sections.insert(name.into(), value);
        self
    }

    pub fn section(&self, name: &str) -> Option<&serde_json::Value> {
        self.sections.get(name)
    }

    /// Decode a section into `T`. A missing section is `Ok(None)`.
    pub fn section_as<T: DeserializeOwned>(&self, name: &str) -> serde_json::Result<Option<T>> {
        self.sections
            .get(name)
            .map(T::deserialize)
            .transpose()
    }
}
