//! Check results.
//!
//! A check reports either a [`ScoredResult`] or a [`LegacyResult`]. The shape
//! is fixed when the result is built; each shape keeps its own aggregation law
//! ([`worst_of`] and [`legacy_and`]).

pub mod error;
pub mod legacy;
pub mod score;

use serde::{Deserialize, Serialize};

use crate::runner::CheckError;

pub use error::{ResultError, ResultResult};
pub use legacy::{legacy_and, LegacyResult};
pub use score::{worst_of, Score, ScoredResult};

/// The externally visible outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CheckResult {
    Scored(ScoredResult),
    Legacy(LegacyResult),
}

impl CheckResult {
    pub fn name(&self) -> &str {
        match self {
            Self::Scored(r) => &r.name,
            Self::Legacy(r) => &r.name,
        }
    }

    /// The runtime error that kept this check from reaching a verdict.
    pub fn error(&self) -> Option<&CheckError> {
        match self {
            Self::Scored(r) => r.error.as_ref(),
            Self::Legacy(r) => r.error.as_ref(),
        }
    }

    pub fn passed(&self) -> bool {
        match self {
            Self::Scored(r) => r.passed(),
            Self::Legacy(r) => r.pass,
        }
    }

    pub fn as_scored(&self) -> Option<&ScoredResult> {
        match self {
            Self::Scored(r) => Some(r),
            Self::Legacy(_) => None,
        }
    }

    pub fn as_legacy(&self) -> Option<&LegacyResult> {
        match self {
            Self::Legacy(r) => Some(r),
            Self::Scored(_) => None,
        }
    }
}

impl From<ScoredResult> for CheckResult {
    fn from(result: ScoredResult) -> Self {
        Self::Scored(result)
    }
}

impl From<LegacyResult> for CheckResult {
    fn from(result: LegacyResult) -> Self {
        Self::Legacy(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_is_tagged_in_json() {
        let scored: CheckResult = ScoredResult::max_score("Fuzzing", "fuzzed").into();
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["shape"], "scored");
        assert_eq!(json["score"], 10);

        let legacy: CheckResult = LegacyResult::pass("Fuzzing").into();
        let json = serde_json::to_value(&legacy).unwrap();
        assert_eq!(json["shape"], "legacy");
        assert_eq!(json["pass"], true);
    }

    #[test]
    fn test_accessors_cover_both_shapes() {
        let err = CheckError::Cancelled {
            check: "a".to_string(),
        };
        let scored: CheckResult = ScoredResult::runtime_error("a", err.clone()).into();
        assert_eq!(scored.name(), "a");
        assert_eq!(scored.error(), Some(&err));
        assert!(!scored.passed());
        assert!(scored.as_legacy().is_none());

        let legacy: CheckResult = LegacyResult::pass("b").into();
        assert_eq!(legacy.name(), "b");
        assert!(legacy.error().is_none());
        assert!(legacy.passed());
        assert!(legacy.as_scored().is_none());
    }
}
