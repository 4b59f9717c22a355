//! Structured observability hooks for the assessment lifecycle.
//!
//! Events are emitted at `info!` level except faults, which use `warn!`.
//! Filter with `RUST_LOG`; pass `--json` to the CLI for JSON lines.

use tracing::{info, warn};

/// RAII guard that enters a run-scoped span for synchronous code.
///
/// Async code should attach [`run_span`] with `Instrument` instead, since an
/// entered span must not be held across an `.await`.
///
/// ```ignore
/// let _span = RunSpan::enter("4f1c...");
/// // every event below carries run_id = "4f1c..."
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(run_id: &str) -> Self {
        Self {
            _span: run_span(run_id).entered(),
        }
    }
}

/// The `posture.run` span tagged with `run_id`.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("posture.run", run_id = %run_id)
}

/// Emit event: assessment started for a repository.
pub fn emit_assessment_started(run_id: &str, repo: &str, checks: usize) {
    info!(event = "assessment.started", run_id = %run_id, repo = %repo, checks = checks);
}

/// Emit event: assessment finished.
pub fn emit_assessment_finished(run_id: &str, checks: usize, failed: usize, cancelled: bool) {
    info!(
        event = "assessment.finished",
        run_id = %run_id,
        checks = checks,
        failed = failed,
        cancelled = cancelled,
    );
}

/// Emit event: one check reported a result.
pub fn emit_check_finished(run_id: &str, check: &str, passed: bool, errored: bool) {
    info!(
        event = "check.finished",
        run_id = %run_id,
        check = %check,
        passed = passed,
        errored = errored,
    );
}

/// Emit event: a check was cut short by cancellation.
pub fn emit_check_cancelled(run_id: &str, check: &str) {
    info!(event = "check.cancelled", run_id = %run_id, check = %check);
}

/// Emit event: a check panicked or its task failed (warning level).
pub fn emit_check_fault(run_id: &str, check: &str, error: &dyn std::fmt::Display) {
    warn!(event = "check.fault", run_id = %run_id, check = %check, error = %error);
}

/// Emit event: the policy was evaluated.
pub fn emit_policy_evaluated(run_id: &str, statements: usize, failing: usize) {
    info!(
        event = "policy.evaluated",
        run_id = %run_id,
        statements = statements,
        failing = failing,
    );
}
