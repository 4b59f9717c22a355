//! End-to-end assessment of one repository.
//!
//! Checks fan out first. Once every check has reported, the probes run and
//! the full policy is evaluated exactly once over the now-immutable
//! evidence.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::evaluation::Evaluation;
use crate::evidence::RepoInfo;
use crate::finding::Finding;
use crate::metrics::METRICS;
use crate::obs;
use crate::result::CheckResult;
use crate::runner::{run_checks, CheckRegistry, CheckRequest, RunnerConfig};

/// Everything produced by one assessment run.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentReport {
    pub run_id: Uuid,
    pub repo: RepoInfo,
    pub generated_at: DateTime<Utc>,
    /// SHA-256 of the policy document used.
    pub policy_digest: String,
    /// One result per registered check, sorted by name.
    pub checks: Vec<CheckResult>,
    pub findings: Vec<Finding>,
    pub evaluation: Evaluation,
    /// Whether the run was cancelled. Completed checks are still reported.
    pub cancelled: bool,
}

impl AssessmentReport {
    /// Checks that did not pass, including inconclusive ones.
    pub fn failing_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed())
    }
}

/// Run every check in `registry`, then evaluate the policy once.
pub async fn run_assessment(
    registry: &CheckRegistry,
    request: Arc<CheckRequest>,
    config: &RunnerConfig,
) -> AssessmentReport {
    let run_id = request.run_id.to_string();
    let span = obs::run_span(&run_id);

    async move {
        obs::emit_assessment_started(&run_id, &request.repo.uri, registry.len());

        let run = run_checks(registry, Arc::clone(&request), config).await;

        // Join barrier passed: nothing writes to the evidence any more.
        let findings = request.probes.run_covering(
            &request.evidence,
            &request.catalog,
            request.policy.required_probes(),
        );
        let evaluation = request.policy.evaluate(&findings);
        obs::emit_policy_evaluated(&run_id, evaluation.len(), evaluation.failing().count());

        let errored = run.errored().count();
        obs::emit_assessment_finished(&run_id, run.results.len(), errored, run.cancelled);
        METRICS.flush();

        AssessmentReport {
            run_id: request.run_id,
            repo: request.repo.clone(),
            generated_at: Utc::now(),
            policy_digest: request.policy.digest().to_string(),
            checks: run.results,
            findings,
            evaluation,
            cancelled: run.cancelled,
        }
    }
    .instrument(span)
    .await
}
