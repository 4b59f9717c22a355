//! Evaluation-internal errors.
//!
//! These signal an inconsistency between a validated policy and the scoring
//! code that consumes its evaluation, i.e. a bug rather than bad input.

/// Errors raised while turning an evaluation into a check score.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("check {check}: expected {expected} statement(s), got {actual}")]
    UnexpectedStatementCount {
        check: String,
        expected: usize,
        actual: usize,
    },

    #[error("check {check}: no policy statement is labelled check:{check}")]
    NoStatementsForCheck { check: String },
}
