//! Findings: the typed evidence emitted by probes.
//!
//! A [`Finding`] pairs a probe id with an ordered [`Outcome`], a message, an
//! optional [`Location`] and, for failing findings only, a [`Remediation`].
//!
//! Findings are immutable values. The `with_*` methods consume the finding
//! and return the updated value, so a finding can never be observed half
//! built.

pub mod remediation;

use serde::{Deserialize, Serialize};

pub use remediation::{Remediation, RemediationEffort};

/// Placeholder in remediation text replaced by [`Finding::with_location`].
pub const LOCATION_PATH_PLACEHOLDER: &str = "${{ finding.location.path }}";

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The ordered verdict of a finding.
///
/// Discriminants leave gaps so new outcomes can be inserted without shifting
/// existing ones. Everything strictly below [`Outcome::Positive`] is failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Outcome {
    /// The probe found a problem.
    Negative = 0,
    /// The probe could not get an answer, typically an unanswered API call.
    NotAvailable = 4,
    /// The probe failed to run; the result is undetermined.
    Error = 8,
    /// The probe found nothing wrong.
    Positive = 12,
    /// The probe does not apply to this repository.
    NotSupported = 16,
}

impl Outcome {
    /// All outcomes in ascending order.
    pub const ALL: [Outcome; 5] = [
        Outcome::Negative,
        Outcome::NotAvailable,
        Outcome::Error,
        Outcome::Positive,
        Outcome::NotSupported,
    ];

    /// Whether this outcome counts as a failure (`< Positive`).
    pub fn is_failing(self) -> bool {
        self < Outcome::Positive
    }

    /// The worse of two outcomes (AND semantics).
    pub fn worse(self, other: Outcome) -> Outcome {
        self.min(other)
    }

    /// The better of two outcomes (OR semantics).
    pub fn better(self, other: Outcome) -> Outcome {
        self.max(other)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Negative => write!(f, "Negative"),
            Self::NotAvailable => write!(f, "NotAvailable"),
            Self::Error => write!(f, "Error"),
            Self::Positive => write!(f, "Positive"),
            Self::NotSupported => write!(f, "NotSupported"),
        }
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// Kind of file a finding points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    #[default]
    None,
    Source,
    Binary,
    Text,
    Url,
}

/// Where in the repository a finding was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type", default)]
    pub file_type: FileType,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl Location {
    /// A location with only a file type and path.
    pub fn new(file_type: FileType, path: impl Into<String>) -> Self {
        Self {
            file_type,
            path: path.into(),
            line_start: None,
            line_end: None,
            snippet: None,
        }
    }

    /// Attach a line range.
    pub fn with_lines(mut self, start: u32, end: u32) -> Self {
        self.line_start = Some(start);
        self.line_end = Some(end);
        self
    }

    /// Attach a code snippet.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Finding
// ---------------------------------------------------------------------------

/// The smallest unit of evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Identifier of the probe that produced this finding.
    pub probe: String,
    pub outcome: Outcome,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Remediation advice. Only ever present on [`Outcome::Negative`] findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<Remediation>,
}

impl Finding {
    /// A fresh Negative finding carrying the probe's default remediation.
    pub fn new(probe: impl Into<String>, remediation: Option<Remediation>) -> Self {
        Self {
            probe: probe.into(),
            outcome: Outcome::Negative,
            message: String::new(),
            location: None,
            remediation,
        }
    }

    /// Bare finding without remediation, mostly for tests and synthetic
    /// error findings.
    pub fn bare(probe: impl Into<String>, outcome: Outcome) -> Self {
        Self::new(probe, None).with_outcome(outcome)
    }

    /// Replace the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the outcome.
    ///
    /// Remediation only applies to failing evidence: any outcome other than
    /// [`Outcome::Negative`] drops the remediation payload, and setting
    /// Negative again later does not bring it back.
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        if outcome != Outcome::Negative {
            self.remediation = None;
        }
        self
    }

    /// Set the location and resolve `${{ finding.location.path }}` in the
    /// remediation text.
    pub fn with_location(mut self, location: Location) -> Self {
        if let Some(remediation) = self.remediation.as_mut() {
            remediation.substitute(LOCATION_PATH_PLACEHOLDER, &location.path);
        }
        self.location = Some(location);
        self
    }

    /// Resolve `${{ metadata.KEY }}` placeholders in the remediation text.
    /// Keys without a value are left verbatim.
    pub fn with_remediation_metadata<'a, I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        if let Some(remediation) = self.remediation.as_mut() {
            for (key, value) in values {
                remediation.substitute(&format!("${{{{ metadata.{key} }}}}"), value);
            }
        }
        self
    }

    /// Attach a machine-applicable patch. No-op when there is no remediation.
    pub fn with_patch(mut self, patch: impl Into<String>) -> Self {
        if let Some(remediation) = self.remediation.as_mut() {
            remediation.patch = Some(patch.into());
        }
        self
    }

    /// Whether the finding's outcome is failing.
    pub fn is_failing(&self) -> bool {
        self.outcome.is_failing()
    }
}
