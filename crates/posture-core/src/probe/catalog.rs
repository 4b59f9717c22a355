//! Static probe definitions.
//!
//! Every probe ships a YAML definition describing what it looks for and how
//! to remediate a Negative result:
//!
//! ```yaml
//! id: toolDependabotInstalled
//! short: Check that Dependabot is enabled.
//! motivation: ...
//! implementation: ...
//! remediation:
//!   effort: Low
//!   text:
//!     - Enable Dependabot for ${{ metadata.repository.uri }}.
//!   markdown:
//!     - Enable Dependabot.
//! ```
//!
//! A [`ProbeCatalog`] is built once from a table of `(id, yaml)` pairs and
//! passed by reference to every probe.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::finding::{Finding, Location, Outcome, Remediation, RemediationEffort};
use crate::probe::error::{ProbeError, ProbeResult};

/// Parsed definition of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeDefinition {
    pub id: String,
    pub short: String,
    pub motivation: String,
    pub implementation: String,
    pub remediation: Remediation,
}

#[derive(Deserialize)]
struct RawDefinition {
    id: String,
    #[serde(default)]
    short: String,
    #[serde(default)]
    motivation: String,
    #[serde(default)]
    implementation: String,
    remediation: RawRemediation,
}

#[derive(Deserialize)]
struct RawRemediation {
    #[serde(default)]
    text: Vec<String>,
    #[serde(default)]
    markdown: Vec<String>,
    #[serde(default)]
    effort: String,
}

impl ProbeDefinition {
    /// Parse and validate the definition for `expected_id`.
    pub fn from_yaml(expected_id: &str, content: &str) -> ProbeResult<Self> {
        let invalid = |detail: String| ProbeError::InvalidDefinition {
            probe: expected_id.to_string(),
            detail,
        };

        let raw: RawDefinition =
            serde_yaml::from_str(content).map_err(|e| invalid(e.to_string()))?;

        if raw.id != expected_id {
            return Err(invalid(format!("read id '{}'", raw.id)));
        }

        let effort = match raw.remediation.effort.as_str() {
            "Low" => RemediationEffort::Low,
            "Medium" => RemediationEffort::Medium,
            "High" => RemediationEffort::High,
            other => return Err(invalid(format!("remediation effort '{other}'"))),
        };

        Ok(Self {
            id: raw.id,
            short: raw.short,
            motivation: raw.motivation,
            implementation: raw.implementation,
            remediation: Remediation {
                patch: None,
                text: raw.remediation.text.join("\n"),
                markdown: raw.remediation.markdown.join("\n"),
                effort,
            },
        })
    }
}

/// Registry of probe definitions keyed by probe id.
#[derive(Debug, Clone, Default)]
pub struct ProbeCatalog {
    definitions: BTreeMap<String, ProbeDefinition>,
}

impl ProbeCatalog {
    /// Build a catalog from `(id, yaml)` pairs. Fails on the first invalid
    /// definition.
    pub fn from_table(table: &[(&str, &str)]) -> ProbeResult<Self> {
        let definitions = table
            .iter()
            .map(|(id, yaml)| Ok((id.to_string(), ProbeDefinition::from_yaml(id, yaml)?)))
            .collect::<ProbeResult<BTreeMap<_, _>>>()?;
        Ok(Self { definitions })
    }

    pub fn definition(&self, probe: &str) -> ProbeResult<&ProbeDefinition> {
        self.definitions
            .get(probe)
            .ok_or_else(|| ProbeError::UnknownProbe(probe.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// A fresh Negative finding carrying the probe's default remediation.
    pub fn finding(&self, probe: &str) -> ProbeResult<Finding> {
        let def = self.definition(probe)?;
        Ok(Finding::new(probe, Some(def.remediation.clone())))
    }

    /// A finding with the given outcome, message and optional location.
    pub fn with_outcome(
        &self,
        probe: &str,
        outcome: Outcome,
        message: impl Into<String>,
        location: Option<Location>,
    ) -> ProbeResult<Finding> {
        let mut finding = self.finding(probe)?.with_message(message).with_outcome(outcome);
        if let Some(location) = location {
            finding = finding.with_location(location);
        }
        Ok(finding)
    }

    pub fn positive(
        &self,
        probe: &str,
        message: impl Into<String>,
        location: Option<Location>,
    ) -> ProbeResult<Finding> {
        self.with_outcome(probe, Outcome::Positive, message, location)
    }

    pub fn negative(
        &self,
        probe: &str,
        message: impl Into<String>,
        location: Option<Location>,
    ) -> ProbeResult<Finding> {
        self.with_outcome(probe, Outcome::Negative, message, location)
    }

    pub fn not_available(
        &self,
        probe: &str,
        message: impl Into<String>,
        location: Option<Location>,
    ) -> ProbeResult<Finding> {
        self.with_outcome(probe, Outcome::NotAvailable, message, location)
    }
}
