//! Declarative scoring policy.
//!
//! A [`Policy`] is a list of named [`Statement`]s, each pairing a boolean
//! [`Clause`] over probe ids with risk, expected-outcome confidence and the
//! human text reported for either verdict.
//!
//! Policies are parsed once per run, from the embedded default or an override
//! document, and are immutable afterwards.
//!
//! ```yaml
//! version: 1
//! statements:
//!   - name: Fuzzing
//!     require:
//!       or:
//!         - probe: fuzzedWithOSSFuzz
//!         - probe: fuzzedWithGoNative
//!     negativeText: Configure one of the recognized fuzzers.
//!     positiveText: The project is fuzzed.
//!     risk: Medium
//!     confidence: [Positive]
//!     labels: ["check:Fuzzing"]
//! ```

pub mod clause;
pub mod error;

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::finding::Outcome;

pub use clause::Clause;
pub use error::{PolicyError, PolicyResult};

/// The built-in policy document.
pub const DEFAULT_POLICY: &str = include_str!("default_policy.yml");

/// Label prefix binding a statement to a single legacy check.
pub const CHECK_LABEL_PREFIX: &str = "check:";

/// Risk carried by a statement when it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Risk {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Risk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// A named policy rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    pub name: String,
    pub require: Clause,
    #[serde(default)]
    pub negative_text: String,
    #[serde(default)]
    pub positive_text: String,
    #[serde(default)]
    pub risk: Risk,
    /// Outcomes this statement is expected to report with high confidence.
    #[serde(default)]
    pub confidence: Vec<Outcome>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Statement {
    /// Whether this statement is labelled `check:<check_name>`.
    pub fn legacy_check(&self, check_name: &str) -> bool {
        has_check_label(&self.labels, check_name)
    }
}

pub(crate) fn has_check_label(labels: &[String], check_name: &str) -> bool {
    labels.iter().any(|label| {
        label
            .strip_prefix(CHECK_LABEL_PREFIX)
            .is_some_and(|name| name == check_name)
    })
}

#[derive(Deserialize)]
struct PolicyDocument {
    version: i64,
    #[serde(default)]
    statements: Vec<Statement>,
}

/// A validated, immutable policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    statements: Vec<Statement>,
    digest: String,
}

impl Policy {
    /// The only supported document version.
    pub const VERSION: i64 = 1;

    /// Parse and validate a policy document.
    ///
    /// Fails on malformed YAML, a version other than 1, a clause node with
    /// zero or several variants, an empty confidence list or a duplicated
    /// statement name.
    pub fn from_yaml(content: &str) -> PolicyResult<Self> {
        let doc: PolicyDocument = serde_yaml::from_str(content)?;
        if doc.version != Self::VERSION {
            return Err(PolicyError::UnsupportedVersion(doc.version));
        }

        let mut seen = HashSet::new();
        for statement in &doc.statements {
            if statement.confidence.is_empty() {
                return Err(PolicyError::EmptyConfidence {
                    statement: statement.name.clone(),
                });
            }
            if !seen.insert(statement.name.as_str()) {
                return Err(PolicyError::DuplicateStatement {
                    name: statement.name.clone(),
                });
            }
        }

        Ok(Self {
            statements: doc.statements,
            digest: hex::encode(Sha256::digest(content.as_bytes())),
        })
    }

    /// Load an override document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> PolicyResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PolicyError::Io {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        Self::from_yaml(&content)
    }

    /// The embedded default policy.
    pub fn embedded() -> PolicyResult<Self> {
        Self::from_yaml(DEFAULT_POLICY)
    }

    /// Use `path` when given, the embedded default otherwise.
    pub fn load(path: Option<&Path>) -> PolicyResult<Self> {
        match path {
            Some(p) => Self::from_path(p),
            None => Self::embedded(),
        }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Lowercase hex SHA-256 of the source document.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Every probe id the policy references.
    pub fn required_probes(&self) -> BTreeSet<&str> {
        self.statements
            .iter()
            .flat_map(|s| s.require.probes())
            .collect()
    }

    /// Check names named by `check:<name>` labels.
    pub fn required_checks(&self) -> BTreeSet<&str> {
        self.statements
            .iter()
            .flat_map(|s| s.labels.iter())
            .filter_map(|l| l.strip_prefix(CHECK_LABEL_PREFIX))
            .collect()
    }
}
