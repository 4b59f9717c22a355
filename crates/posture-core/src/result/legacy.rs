//! Boolean pass/fail results with a confidence level.
//!
//! This is the older result shape. Its aggregation law differs from the
//! scored one and is kept separate: a failing result is always worse than a
//! passing one; among passing results lower confidence is worse; among
//! failing results higher confidence is worse.

use serde::{Deserialize, Serialize};

use crate::result::error::{ResultError, ResultResult};
use crate::runner::CheckError;

pub const MAX_CONFIDENCE: u8 = 10;
pub const HALF_CONFIDENCE: u8 = 5;
pub const MIN_CONFIDENCE: u8 = 0;

/// A pass/fail check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyResult {
    pub name: String,
    pub pass: bool,
    /// `0..=10`.
    pub confidence: u8,
    #[serde(default)]
    pub details: Vec<String>,
    #[serde(skip)]
    pub error: Option<CheckError>,
    #[serde(skip)]
    pub should_retry: bool,
}

impl LegacyResult {
    fn new(name: impl Into<String>, pass: bool, confidence: u8) -> Self {
        Self {
            name: name.into(),
            pass,
            confidence: confidence.min(MAX_CONFIDENCE),
            details: Vec::new(),
            error: None,
            should_retry: false,
        }
    }

    pub fn pass(name: impl Into<String>) -> Self {
        Self::new(name, true, MAX_CONFIDENCE)
    }

    pub fn fail(name: impl Into<String>) -> Self {
        Self::new(name, false, MAX_CONFIDENCE)
    }

    /// Failing result with zero confidence, carrying why no verdict was reached.
    pub fn inconclusive(name: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut result = Self::new(name, false, MIN_CONFIDENCE);
        result.error = Some(CheckError::LowConfidence(reason.into()));
        result
    }

    /// Failing result the caller may retry.
    pub fn retry(name: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut result = Self::new(name, false, MIN_CONFIDENCE);
        result.error = Some(CheckError::Retry(reason.into()));
        result.should_retry = true;
        result
    }

    /// Pass iff `numerator / denominator >= threshold`.
    ///
    /// Confidence grows with the ratio on a pass and shrinks with it on a
    /// fail. A zero denominator yields an inconclusive result.
    pub fn proportional(
        name: impl Into<String>,
        numerator: u32,
        denominator: u32,
        threshold: f32,
    ) -> Self {
        if denominator == 0 {
            return Self::inconclusive(name, "denominator is 0");
        }
        if numerator == 0 {
            return Self::fail(name);
        }

        let actual = numerator as f32 / denominator as f32;
        let scaled = (actual * f32::from(MAX_CONFIDENCE)).min(f32::from(MAX_CONFIDENCE)) as u8;
        if actual >= threshold {
            Self::new(name, true, scaled)
        } else {
            Self::new(name, false, MAX_CONFIDENCE - scaled)
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn with_error(mut self, error: CheckError) -> Self {
        self.error = Some(error);
        self
    }

    /// Whether `self` ranks strictly worse than `other`.
    pub fn is_worse_than(&self, other: &LegacyResult) -> bool {
        match (self.pass, other.pass) {
            (false, true) => true,
            (true, false) => false,
            (true, true) => self.confidence < other.confidence,
            (false, false) => self.confidence > other.confidence,
        }
    }
}

/// The worst result under the pass/confidence law. Ties keep the earliest.
pub fn legacy_and<I>(results: I) -> ResultResult<LegacyResult>
where
    I: IntoIterator<Item = LegacyResult>,
{
    results
        .into_iter()
        .reduce(|worst, r| if r.is_worse_than(&worst) { r } else { worst })
        .ok_or(ResultError::EmptyAggregate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_conf(pass: bool, confidence: u8) -> LegacyResult {
        LegacyResult::new("c", pass, confidence)
    }

    #[test]
    fn test_fail_outranks_pass_regardless_of_confidence() {
        assert!(with_conf(false, 0).is_worse_than(&with_conf(true, 0)));
        assert!(with_conf(false, 1).is_worse_than(&with_conf(true, 10)));
        assert!(!with_conf(true, 0).is_worse_than(&with_conf(false, 10)));
    }

    #[test]
    fn test_confidence_ordering_is_mirrored() {
        // Less sure of a pass is worse.
        assert!(with_conf(true, 3).is_worse_than(&with_conf(true, 9)));
        // More sure of a failure is worse.
        assert!(with_conf(false, 9).is_worse_than(&with_conf(false, 3)));
        assert!(!with_conf(false, 5).is_worse_than(&with_conf(false, 5)));
    }

    #[test]
    fn test_legacy_and_picks_worst() {
        let results = vec![
            LegacyResult::pass("a"),
            with_conf(false, 4),
            with_conf(false, 8),
            with_conf(true, 2),
        ];
        let worst = legacy_and(results).unwrap();
        assert!(!worst.pass);
        assert_eq!(worst.confidence, 8);
    }

    #[test]
    fn test_legacy_and_empty_is_precondition_error() {
        assert_eq!(
            legacy_and(Vec::<LegacyResult>::new()),
            Err(ResultError::EmptyAggregate)
        );
    }

    #[test]
    fn test_proportional_zero_denominator_is_inconclusive() {
        let r = LegacyResult::proportional("c", 3, 0, 0.5);
        assert!(!r.pass);
        assert_eq!(r.confidence, MIN_CONFIDENCE);
        assert!(matches!(r.error, Some(CheckError::LowConfidence(_))));
    }

    #[test]
    fn test_proportional_confidence_scales_with_distance() {
        let r = LegacyResult::proportional("c", 5, 10, 0.5);
        assert!(r.pass);
        assert_eq!(r.confidence, 5);

        let r = LegacyResult::proportional("c", 2, 10, 0.8);
        assert!(!r.pass);
        assert_eq!(r.confidence, 8);

        let r = LegacyResult::proportional("c", 0, 10, 0.8);
        assert!(!r.pass);
        assert_eq!(r.confidence, MAX_CONFIDENCE);
    }

    #[test]
    fn test_retry_is_flagged() {
        let r = LegacyResult::retry("c", "rate limited");
        assert!(r.should_retry);
        assert!(!r.pass);
        assert_eq!(r.error, Some(CheckError::Retry("rate limited".to_string())));
    }
}
