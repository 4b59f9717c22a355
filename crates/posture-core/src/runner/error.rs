//! Check runtime errors.
//!
//! These never cross the join barrier: the runner turns each one into an
//! inconclusive result for the check that raised it.

use thiserror::Error;

use crate::evaluation::EvalError;
use crate::probe::ProbeError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("check {check}: {detail}")]
    Runtime { check: String, detail: String },

    #[error("check {check} panicked: {detail}")]
    Panicked { check: String, detail: String },

    #[error("check {check} was cancelled before it finished")]
    Cancelled { check: String },

    #[error("check {check} worker was lost: {detail}")]
    Lost { check: String, detail: String },

    #[error("check {check}: {source}")]
    Evaluation {
        check: String,
        #[source]
        source: EvalError,
    },

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("check {0} is already registered")]
    DuplicateCheck(String),

    #[error("low confidence: {0}")]
    LowConfidence(String),

    #[error("retryable: {0}")]
    Retry(String),
}

impl CheckError {
    pub fn runtime(check: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Runtime {
            check: check.into(),
            detail: detail.to_string(),
        }
    }
}
