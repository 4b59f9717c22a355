//! Checks scored from policy statements.
//!
//! A check named `N` owns the statements labelled `check:N`. The general
//! evaluator is run over just those statements and the verdicts are folded
//! into a [`ScoredResult`].

use async_trait::async_trait;
use tracing::debug;

use crate::evaluation::{EvalError, EvaluatedStatement, Evaluation};
use crate::finding::Outcome;
use crate::policy::Policy;
use crate::result::{CheckResult, Score, ScoredResult};
use crate::runner::{Check, CheckError, CheckRegistry, CheckRequest};

/// Run the request's probes and evaluate the statements owned by `check_name`.
///
/// Probes the statements reference but the registry lacks count as
/// NotAvailable, so the check is inconclusive rather than passing.
pub fn evaluate_check(request: &CheckRequest, check_name: &str) -> Result<Evaluation, CheckError> {
    let required = request
        .policy
        .statements()
        .iter()
        .filter(|s| s.legacy_check(check_name))
        .flat_map(|s| s.require.probes());
    let findings = request
        .probes
        .run_covering(&request.evidence, &request.catalog, required);
    let evaluation = request.policy.evaluate_for_check(&findings, check_name);
    if evaluation.is_empty() {
        return Err(CheckError::Evaluation {
            check: check_name.to_string(),
            source: EvalError::NoStatementsForCheck {
                check: check_name.to_string(),
            },
        });
    }
    debug!(check = %check_name, statements = evaluation.len(), "check evaluated");
    Ok(evaluation)
}

/// Ten points minus one per Negative statement, floored at zero.
///
/// An Error statement makes the whole check a runtime error. Statements
/// that are NotAvailable or NotSupported carry no penalty; if every
/// statement is one of those the result is inconclusive.
pub fn penalty_score(name: &str, evaluation: &Evaluation) -> ScoredResult {
    if let Some(errored) = evaluation.iter().find(|s| s.outcome == Outcome::Error) {
        return ScoredResult::runtime_error(name, CheckError::runtime(name, statement_error(errored)));
    }

    let decided: Vec<_> = evaluation
        .iter()
        .filter(|s| matches!(s.outcome, Outcome::Positive | Outcome::Negative))
        .collect();
    if decided.is_empty() {
        return ScoredResult::inconclusive(name, "no statement could be decided");
    }

    let negatives: Vec<&str> = decided
        .iter()
        .filter(|s| s.outcome == Outcome::Negative)
        .map(|s| s.text.as_str())
        .collect();
    if negatives.is_empty() {
        return ScoredResult::max_score(name, "no issues found");
    }

    let score = Score::clamped(i64::from(Score::MAX.value()) - negatives.len() as i64);
    ScoredResult::with_score(
        name,
        format!("{} issue(s) found", negatives.len()),
        score,
    )
    .with_details(negatives.into_iter().map(str::to_string).collect())
}

/// Score a check that owns exactly one statement.
///
/// Negative gives the minimum score; Positive gives the maximum score with
/// the contributing probe ids in the reason.
pub fn single_statement_score(name: &str, evaluation: &Evaluation) -> ScoredResult {
    let statement = match evaluation.statements() {
        [only] => only,
        other => {
            return ScoredResult::runtime_error(
                name,
                CheckError::Evaluation {
                    check: name.to_string(),
                    source: EvalError::UnexpectedStatementCount {
                        check: name.to_string(),
                        expected: 1,
                        actual: other.len(),
                    },
                },
            )
        }
    };

    match statement.outcome {
        Outcome::Negative => ScoredResult::min_score(name, statement.text.clone()),
        Outcome::Positive => {
            let mut probes: Vec<&str> = statement.findings.iter().map(|f| f.probe.as_str()).collect();
            probes.dedup();
            let reason = if probes.is_empty() {
                statement.text.clone()
            } else {
                format!("{}: {}", statement.text, probes.join(", "))
            };
            ScoredResult::max_score(name, reason)
        }
        Outcome::Error => {
            ScoredResult::runtime_error(name, CheckError::runtime(name, statement_error(statement)))
        }
        Outcome::NotAvailable | Outcome::NotSupported => {
            ScoredResult::inconclusive(name, format!("{}: {}", statement.name, statement.outcome))
        }
    }
}

fn statement_error(statement: &EvaluatedStatement) -> String {
    let messages: Vec<&str> = statement
        .findings
        .iter()
        .filter(|f| f.outcome == Outcome::Error)
        .map(|f| f.message.as_str())
        .collect();
    if messages.is_empty() {
        format!("statement {} errored", statement.name)
    } else {
        format!("statement {} errored: {}", statement.name, messages.join("; "))
    }
}

/// How a [`PolicyCheck`] folds its statements into a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scoring {
    Penalty,
    SingleStatement,
}

/// A check backed entirely by policy statements.
#[derive(Debug, Clone)]
pub struct PolicyCheck {
    name: String,
    scoring: Scoring,
}

impl PolicyCheck {
    pub fn new(name: impl Into<String>, scoring: Scoring) -> Self {
        Self {
            name: name.into(),
            scoring,
        }
    }
}

#[async_trait]
impl Check for PolicyCheck {
    async fn run(&self, request: &CheckRequest) -> Result<CheckResult, CheckError> {
        let evaluation = evaluate_check(request, &self.name)?;
        let result = match self.scoring {
            Scoring::Penalty => penalty_score(&self.name, &evaluation),
            Scoring::SingleStatement => single_statement_score(&self.name, &evaluation),
        };
        Ok(result.into())
    }
}

/// One [`PolicyCheck`] per `check:<name>` label in `policy`. Checks owning a
/// single statement use [`Scoring::SingleStatement`], the rest
/// [`Scoring::Penalty`].
pub fn policy_checks(policy: &Policy) -> Result<CheckRegistry, CheckError> {
    let mut registry = CheckRegistry::new();
    for name in policy.required_checks() {
        let owned = policy
            .statements()
            .iter()
            .filter(|s| s.legacy_check(name))
            .count();
        let scoring = if owned == 1 {
            Scoring::SingleStatement
        } else {
            Scoring::Penalty
        };
        registry.register(name, PolicyCheck::new(name, scoring))?;
    }
    Ok(registry)
}
