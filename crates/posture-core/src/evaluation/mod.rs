//! Policy evaluation.
//!
//! [`Policy::evaluate`] is a pure function of the policy and the findings: it
//! walks every statement's [`Clause`] tree, folds finding outcomes with the
//! worst-wins (AND) / best-wins (OR) laws, and reports for each statement the
//! outcome, the matching text, a confidence level and the subset of findings
//! that explains the verdict.

pub mod error;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::finding::{Finding, Outcome};
use crate::metrics::METRICS;
use crate::policy::{has_check_label, Clause, Policy, Risk, Statement};

pub use error::EvalError;

/// Which connective produced a statement's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Logic {
    And,
    Or,
    Not,
}

/// How sure the evaluator is about a reported outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    None,
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Confidence for `outcome` given the statement's expected outcomes.
    ///
    /// Error, NotAvailable and NotSupported are always reported with high
    /// confidence. Positive and Negative are high only when the statement
    /// declared that exact outcome as expected.
    pub fn for_outcome(outcome: Outcome, expected: &[Outcome]) -> Self {
        match outcome {
            Outcome::Error | Outcome::NotAvailable | Outcome::NotSupported => Self::High,
            Outcome::Positive | Outcome::Negative => {
                if expected.contains(&outcome) {
                    Self::High
                } else {
                    Self::Low
                }
            }
        }
    }
}

/// One statement's verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatedStatement {
    pub name: String,
    pub outcome: Outcome,
    pub risk: Risk,
    pub text: String,
    pub labels: Vec<String>,
    pub logic: Logic,
    pub confidence: Confidence,
    /// Failing findings when the outcome is failing, passing ones otherwise.
    pub findings: Vec<Finding>,
}

impl EvaluatedStatement {
    /// Whether this statement is labelled `check:<check_name>`.
    pub fn legacy_check(&self, check_name: &str) -> bool {
        has_check_label(&self.labels, check_name)
    }

    pub fn is_failing(&self) -> bool {
        self.outcome.is_failing()
    }
}

/// Ordered statement verdicts for one policy run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Evaluation {
    statements: Vec<EvaluatedStatement>,
}

impl Evaluation {
    pub fn statements(&self) -> &[EvaluatedStatement] {
        &self.statements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EvaluatedStatement> {
        self.statements.iter()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Statements whose outcome is failing.
    pub fn failing(&self) -> impl Iterator<Item = &EvaluatedStatement> {
        self.statements.iter().filter(|s| s.is_failing())
    }

    pub fn into_statements(self) -> Vec<EvaluatedStatement> {
        self.statements
    }
}

impl<'a> IntoIterator for &'a Evaluation {
    type Item = &'a EvaluatedStatement;
    type IntoIter = std::slice::Iter<'a, EvaluatedStatement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

/// Result of evaluating one clause node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseVerdict {
    pub outcome: Outcome,
    pub logic: Logic,
    pub findings: Vec<Finding>,
}

impl Policy {
    /// Evaluate every statement against `findings`.
    pub fn evaluate(&self, findings: &[Finding]) -> Evaluation {
        self.evaluate_filtered(findings, None)
    }

    /// Evaluate only the statements labelled `check:<check_name>`.
    ///
    /// Lets the general evaluator back-fill the narrower per-check scoring
    /// path.
    pub fn evaluate_for_check(&self, findings: &[Finding], check_name: &str) -> Evaluation {
        self.evaluate_filtered(findings, Some(check_name))
    }

    fn evaluate_filtered(&self, findings: &[Finding], check_name: Option<&str>) -> Evaluation {
        let statements: Vec<EvaluatedStatement> = self
            .statements()
            .iter()
            .filter(|s| check_name.map_or(true, |name| s.legacy_check(name)))
            .map(|s| evaluate_statement(s, findings))
            .collect();

        METRICS.add_statements_evaluated(statements.len() as u64);
        Evaluation { statements }
    }
}

/// Evaluate a single statement.
pub fn evaluate_statement(statement: &Statement, findings: &[Finding]) -> EvaluatedStatement {
    let verdict = evaluate_clause(&statement.require, findings);
    let text = if verdict.outcome.is_failing() {
        statement.negative_text.clone()
    } else {
        statement.positive_text.clone()
    };

    EvaluatedStatement {
        name: statement.name.clone(),
        outcome: verdict.outcome,
        risk: statement.risk,
        text,
        labels: statement.labels.clone(),
        logic: verdict.logic,
        confidence: Confidence::for_outcome(verdict.outcome, &statement.confidence),
        findings: verdict.findings,
    }
}

/// Evaluate a clause tree against `findings`.
pub fn evaluate_clause(clause: &Clause, findings: &[Finding]) -> ClauseVerdict {
    match clause {
        Clause::Probe(id) => evaluate_probe(id, findings),
        Clause::And(children) => fold_children(children, findings, Logic::And, Outcome::worse),
        Clause::Or(children) => fold_children(children, findings, Logic::Or, Outcome::better),
        Clause::Not(child) => {
            let inner = evaluate_clause(child, findings);
            let outcome = match inner.outcome {
                Outcome::Positive => Outcome::Negative,
                Outcome::Negative => Outcome::Positive,
                other => other,
            };
            // The negated child's evidence is what explains the flipped verdict.
            ClauseVerdict {
                outcome,
                logic: Logic::Not,
                findings: inner.findings,
            }
        }
    }
}

fn evaluate_probe(probe_id: &str, findings: &[Finding]) -> ClauseVerdict {
    let mut outcome: Option<Outcome> = None;
    let mut passing = Vec::new();
    let mut failing = Vec::new();

    for f in findings.iter().filter(|f| f.probe == probe_id) {
        outcome = Some(outcome.map_or(f.outcome, |o| o.worse(f.outcome)));
        if f.is_failing() {
            failing.push(f.clone());
        } else {
            passing.push(f.clone());
        }
    }

    // A probe that reported nothing found nothing wrong.
    let outcome = outcome.unwrap_or(Outcome::Positive);
    let matched = passing.len() + failing.len();
    if matched > 1 {
        debug!(probe = %probe_id, findings = matched, outcome = %outcome, "merged duplicate probe findings");
    }

    ClauseVerdict {
        outcome,
        logic: Logic::And,
        findings: if outcome.is_failing() { failing } else { passing },
    }
}

fn fold_children(
    children: &[Clause],
    findings: &[Finding],
    logic: Logic,
    combine: fn(Outcome, Outcome) -> Outcome,
) -> ClauseVerdict {
    let mut outcome: Option<Outcome> = None;
    let mut passing = Vec::new();
    let mut failing = Vec::new();

    for child in children {
        let verdict = evaluate_clause(child, findings);
        outcome = Some(outcome.map_or(verdict.outcome, |o| combine(o, verdict.outcome)));
        if verdict.outcome.is_failing() {
            failing.extend(verdict.findings);
        } else {
            passing.extend(verdict.findings);
        }
    }

    // Parsing rejects empty lists; an empty tree built in code is vacuously true.
    let outcome = outcome.unwrap_or(Outcome::Positive);
    ClauseVerdict {
        outcome,
        logic,
        findings: if outcome.is_failing() { failing } else { passing },
    }
}
