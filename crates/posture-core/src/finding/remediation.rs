//! Remediation advice attached to failing findings.

use serde::{Deserialize, Serialize};

/// How much work a remediation takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum RemediationEffort {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RemediationEffort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, ""),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Human and machine remediation for a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remediation {
    /// Patch for machines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    /// Text for humans.
    pub text: String,
    /// Markdown for humans.
    pub markdown: String,
    pub effort: RemediationEffort,
}

impl Remediation {
    /// Replace every occurrence of `placeholder` in both text and markdown.
    pub(crate) fn substitute(&mut self, placeholder: &str, value: &str) {
        self.text = self.text.replace(placeholder, value);
        self.markdown = self.markdown.replace(placeholder, value);
    }
}
