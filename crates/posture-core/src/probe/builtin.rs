//! Probes shipped with the engine.
//!
//! They read two evidence sections:
//!
//! * `dependencyUpdateTools`: `{"tools": [{"name": "Dependabot", "files": [{"path": ".github/dependabot.yml"}]}]}`
//! * `branchProtection`: `{"branches": [{"name": "main", "protected": true, "allowForcePushes": false, "allowDeletions": false}]}`
//!
//! An absent section means the collector found nothing to report.

use serde::Deserialize;

use crate::evidence::EvidenceSnapshot;
use crate::finding::{FileType, Finding, Location, Outcome};
use crate::probe::{Probe, ProbeCatalog, ProbeError, ProbeRegistry, ProbeResult};

pub const TOOLS_SECTION: &str = "dependencyUpdateTools";
pub const BRANCHES_SECTION: &str = "branchProtection";

/// Definitions for every built-in probe.
pub const DEFINITIONS: &[(&str, &str)] = &[
    ("toolDependabotInstalled", include_str!("defs/toolDependabotInstalled.yml")),
    ("toolRenovateInstalled", include_str!("defs/toolRenovateInstalled.yml")),
    ("toolPyUpInstalled", include_str!("defs/toolPyUpInstalled.yml")),
    ("toolSonarTypeLiftInstalled", include_str!("defs/toolSonarTypeLiftInstalled.yml")),
    ("branchProtectionEnabled", include_str!("defs/branchProtectionEnabled.yml")),
    (
        "branchProtectionForcePushDisabled",
        include_str!("defs/branchProtectionForcePushDisabled.yml"),
    ),
    (
        "branchProtectionDeletionDisabled",
        include_str!("defs/branchProtectionDeletionDisabled.yml"),
    ),
];

/// Catalog of the built-in probe definitions.
pub fn catalog() -> ProbeResult<ProbeCatalog> {
    ProbeCatalog::from_table(DEFINITIONS)
}

/// Registry of the built-in probes.
pub fn registry() -> ProbeResult<ProbeRegistry> {
    ProbeRegistry::new()
        .with(ToolInstalled::new("toolDependabotInstalled", "Dependabot"))?
        .with(ToolInstalled::new("toolRenovateInstalled", "RenovateBot"))?
        .with(ToolInstalled::new("toolPyUpInstalled", "PyUp"))?
        .with(ToolInstalled::new("toolSonarTypeLiftInstalled", "Sonatype Lift"))?
        .with(BranchRule::new(
            "branchProtectionEnabled",
            "protected",
            |b| b.protected,
        ))?
        .with(BranchRule::new(
            "branchProtectionForcePushDisabled",
            "blocks force pushes",
            |b| b.allow_force_pushes.map(|allowed| !allowed),
        ))?
        .with(BranchRule::new(
            "branchProtectionDeletionDisabled",
            "blocks deletion",
            |b| b.allow_deletions.map(|allowed| !allowed),
        ))
}

#[derive(Debug, Default, Deserialize)]
struct ToolsEvidence {
    #[serde(default)]
    tools: Vec<Tool>,
}

#[derive(Debug, Deserialize)]
struct Tool {
    name: String,
    #[serde(default)]
    files: Vec<ToolFile>,
}

#[derive(Debug, Deserialize)]
struct ToolFile {
    path: String,
    #[serde(default)]
    line: Option<u32>,
}

/// Positive for each configuration file of a matching tool, one Negative
/// finding when the tool is absent.
pub struct ToolInstalled {
    id: &'static str,
    tool: &'static str,
}

impl ToolInstalled {
    pub fn new(id: &'static str, tool: &'static str) -> Self {
        Self { id, tool }
    }
}

impl Probe for ToolInstalled {
    fn id(&self) -> &str {
        self.id
    }

    fn run(&self, evidence: &EvidenceSnapshot, catalog: &ProbeCatalog) -> ProbeResult<Vec<Finding>> {
        let raw: ToolsEvidence = evidence
            .section_as(TOOLS_SECTION)
            .map_err(|e| ProbeError::failed(self.id, e))?
            .unwrap_or_default();

        let mut findings = Vec::new();
        for tool in raw.tools.iter().filter(|t| t.name == self.tool) {
            let message = format!("tool '{}' is used", tool.name);
            if tool.files.is_empty() {
                findings.push(catalog.positive(self.id, message, None)?);
                continue;
            }
            for file in &tool.files {
                let mut location = Location::new(FileType::Source, &file.path);
                if let Some(line) = file.line {
                    location = location.with_lines(line, line);
                }
                findings.push(catalog.positive(self.id, message.clone(), Some(location))?);
            }
        }

        if findings.is_empty() {
            findings.push(catalog.negative(
                self.id,
                format!("tool '{}' is not used", self.tool),
                None,
            )?);
        }
        Ok(findings)
    }
}

#[derive(Debug, Default, Deserialize)]
struct BranchesEvidence {
    #[serde(default)]
    branches: Vec<Branch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub protected: Option<bool>,
    #[serde(default)]
    pub allow_force_pushes: Option<bool>,
    #[serde(default)]
    pub allow_deletions: Option<bool>,
}

/// One finding per branch: Positive when the rule holds, Negative when it
/// does not, NotAvailable when the setting could not be read.
pub struct BranchRule {
    id: &'static str,
    rule: &'static str,
    holds: fn(&Branch) -> Option<bool>,
}

impl BranchRule {
    pub fn new(id: &'static str, rule: &'static str, holds: fn(&Branch) -> Option<bool>) -> Self {
        Self { id, rule, holds }
    }
}

impl Probe for BranchRule {
    fn id(&self) -> &str {
        self.id
    }

    fn run(&self, evidence: &EvidenceSnapshot, catalog: &ProbeCatalog) -> ProbeResult<Vec<Finding>> {
        let raw: BranchesEvidence = evidence
            .section_as(BRANCHES_SECTION)
            .map_err(|e| ProbeError::failed(self.id, e))?
            .unwrap_or_default();

        if raw.branches.is_empty() {
            return Ok(vec![catalog.positive(
                self.id,
                "no branch on this repository",
                None,
            )?]);
        }

        raw.branches
            .iter()
            .map(|branch| {
                let (outcome, message) = match (self.holds)(branch) {
                    Some(true) => (Outcome::Positive, format!("branch '{}' {}", branch.name, self.rule)),
                    Some(false) => (
                        Outcome::Negative,
                        format!("branch '{}' does not satisfy: {}", branch.name, self.rule),
                    ),
                    None => (
                        Outcome::NotAvailable,
                        format!("could not read protection settings of branch '{}'", branch.name),
                    ),
                };
                catalog.with_outcome(self.id, outcome, message, None)
            })
            .collect()
    }
}
