//! Numeric check scores.
//!
//! A [`ScoredResult`] carries a [`Score`] in `0..=10`, or `-1` when the check
//! could not reach a verdict. A result passes when its score is at least
//! [`Score::PASS_THRESHOLD`].

use serde::{Deserialize, Serialize};

use crate::result::error::{ResultError, ResultResult};
use crate::runner::CheckError;

/// Bounded check score. `-1` is the inconclusive sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Score(i8);

impl Score {
    pub const INCONCLUSIVE: Score = Score(-1);
    pub const MIN: Score = Score(0);
    pub const HALF: Score = Score(5);
    pub const MAX: Score = Score(10);
    /// Lowest passing score.
    pub const PASS_THRESHOLD: Score = Score(8);

    /// A score in `-1..=10`.
    pub fn new(value: i64) -> ResultResult<Self> {
        if (-1..=10).contains(&value) {
            Ok(Self(value as i8))
        } else {
            Err(ResultError::ScoreOutOfRange(value))
        }
    }

    /// Clamp any integer into `0..=10`.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, 10) as i8)
    }

    pub fn value(self) -> i8 {
        self.0
    }

    pub fn is_inconclusive(self) -> bool {
        self == Self::INCONCLUSIVE
    }

    pub fn is_passing(self) -> bool {
        self >= Self::PASS_THRESHOLD
    }
}

impl TryFrom<i64> for Score {
    type Error = ResultError;

    fn try_from(value: i64) -> ResultResult<Self> {
        Self::new(value)
    }
}

impl From<Score> for i64 {
    fn from(score: Score) -> Self {
        i64::from(score.0)
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_inconclusive() {
            write!(f, "?")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A scored check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub name: String,
    pub score: Score,
    pub reason: String,
    #[serde(default)]
    pub details: Vec<String>,
    /// Runtime error that prevented the check from producing a score.
    #[serde(skip)]
    pub error: Option<CheckError>,
}

impl ScoredResult {
    /// The check ran and earned `score`.
    pub fn with_score(name: impl Into<String>, reason: impl Into<String>, score: Score) -> Self {
        Self {
            name: name.into(),
            score,
            reason: reason.into(),
            details: Vec::new(),
            error: None,
        }
    }

    /// The check ran and earned the maximum score.
    pub fn max_score(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::with_score(name, reason, Score::MAX)
    }

    /// The check ran and earned the minimum score.
    pub fn min_score(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::with_score(name, reason, Score::MIN)
    }

    /// Score proportional to the number of passing tests:
    /// `round(10 * passed / total)` clamped to `0..=10`.
    ///
    /// A zero total carries no evidence and yields an inconclusive result.
    pub fn proportional(
        name: impl Into<String>,
        reason: impl AsRef<str>,
        passed: u32,
        total: u32,
    ) -> Self {
        if total == 0 {
            return Self::inconclusive(name, format!("{} -- no tests to score", reason.as_ref()));
        }
        let ratio = f64::from(passed) / f64::from(total);
        let score = Score::clamped((10.0 * ratio).round() as i64);
        Self::with_score(
            name,
            format!("{} -- score normalized to {}", reason.as_ref(), score),
            score,
        )
    }

    /// The check ran but found too little evidence to score.
    pub fn inconclusive(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::with_score(name, reason, Score::INCONCLUSIVE)
    }

    /// The check could not run.
    pub fn runtime_error(name: impl Into<String>, error: CheckError) -> Self {
        Self {
            name: name.into(),
            score: Score::INCONCLUSIVE,
            reason: error.to_string(),
            details: Vec::new(),
            error: Some(error),
        }
    }

    /// Attach detail lines.
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn passed(&self) -> bool {
        self.score.is_passing()
    }
}

/// The result with the lowest score. Ties keep the earliest result.
///
/// An empty input is a precondition violation and returns
/// [`ResultError::EmptyAggregate`].
pub fn worst_of<I>(results: I) -> ResultResult<ScoredResult>
where
    I: IntoIterator<Item = ScoredResult>,
{
    results
        .into_iter()
        .reduce(|worst, r| if r.score < worst.score { r } else { worst })
        .ok_or(ResultError::EmptyAggregate)
}
