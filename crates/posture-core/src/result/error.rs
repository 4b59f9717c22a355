//! Errors raised by result constructors and aggregators.

use thiserror::Error;

/// Precondition failures of the score/result combinators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResultError {
    #[error("cannot aggregate an empty set of results")]
    EmptyAggregate,

    #[error("score {0} outside [-1, 10]")]
    ScoreOutOfRange(i64),
}

/// Result alias for combinator operations.
pub type ResultResult<T> = std::result::Result<T, ResultError>;
