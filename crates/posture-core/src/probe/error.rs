//! Probe and probe-definition errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("unknown probe: {0}")]
    UnknownProbe(String),

    #[error("probe {0} is already registered")]
    DuplicateProbe(String),

    #[error("invalid definition for probe {probe}: {detail}")]
    InvalidDefinition { probe: String, detail: String },

    #[error("probe {probe} failed: {detail}")]
    Failed { probe: String, detail: String },
}

impl ProbeError {
    pub fn failed(probe: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Failed {
            probe: probe.into(),
            detail: detail.to_string(),
        }
    }
}

/// Result type for probe operations.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;
