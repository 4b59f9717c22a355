//! Posture Core Library
//!
//! Policy evaluation engine for repository security posture: the finding
//! model, the clause interpreter, score/result combinators and the
//! concurrent check runner that drives them.

pub mod assessment;
pub mod check_eval;
pub mod evaluation;
pub mod evidence;
pub mod finding;
pub mod metrics;
pub mod obs;
pub mod policy;
pub mod probe;
pub mod result;
pub mod runner;
pub mod telemetry;

pub use assessment::{run_assessment, AssessmentReport};
pub use check_eval::{
    evaluate_check, penalty_score, policy_checks, single_statement_score, PolicyCheck, Scoring,
};
pub use evaluation::{
    evaluate_clause, evaluate_statement, ClauseVerdict, Confidence, EvalError, EvaluatedStatement,
    Evaluation, Logic,
};
pub use evidence::{EvidenceSnapshot, RepoInfo};
pub use finding::{FileType, Finding, Location, Outcome, Remediation, RemediationEffort};
pub use policy::{Clause, Policy, PolicyError, Risk, Statement};
pub use probe::{
    run_probes, Probe, ProbeCatalog, ProbeDefinition, ProbeError, ProbeRegistry,
};
pub use result::{
    legacy_and, worst_of, CheckResult, LegacyResult, ResultError, Score, ScoredResult,
};
pub use runner::{
    run_checks, CancellationToken, Check, CheckError, CheckRegistry, CheckRequest, CheckRun,
    FnCheck, RunnerConfig,
};

pub use metrics::{MetricsSnapshot, METRICS};
pub use obs::{
    emit_assessment_finished, emit_assessment_started, emit_check_cancelled, emit_check_fault,
    emit_check_finished, emit_policy_evaluated, run_span, RunSpan,
};
pub use telemetry::init_tracing;

/// Posture version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
