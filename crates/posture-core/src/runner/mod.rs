//! Concurrent check runner.
//!
//! Every registered [`Check`] runs as its own task over one shared, read-only
//! [`CheckRequest`]. The runner waits for all of them (a join barrier) and
//! returns exactly one [`CheckResult`] per registered check: runtime errors,
//! panics, lost tasks and cancellation all become inconclusive results for
//! the check concerned and never affect its siblings.

pub mod cancel;
pub mod error;

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::evidence::{EvidenceSnapshot, RepoInfo};
use crate::metrics::METRICS;
use crate::obs;
use crate::policy::Policy;
use crate::probe::{ProbeCatalog, ProbeRegistry};
use crate::result::{CheckResult, ScoredResult};

pub use cancel::CancellationToken;
pub use error::CheckError;

/// Everything a check may read. Shared by all workers of a run.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub run_id: Uuid,
    pub repo: RepoInfo,
    pub evidence: Arc<EvidenceSnapshot>,
    pub policy: Arc<Policy>,
    pub probes: Arc<ProbeRegistry>,
    pub catalog: Arc<ProbeCatalog>,
    pub cancel: CancellationToken,
}

impl CheckRequest {
    /// A request with a fresh run id and cancellation token.
    pub fn new(
        repo: RepoInfo,
        evidence: EvidenceSnapshot,
        policy: Policy,
        probes: ProbeRegistry,
        catalog: ProbeCatalog,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            repo,
            evidence: Arc::new(evidence),
            policy: Arc::new(policy),
            probes: Arc::new(probes),
            catalog: Arc::new(catalog),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// One named assessment routine.
///
/// Implement this to plug in real checks or test stubs.
#[async_trait]
pub trait Check: Send + Sync {
    async fn run(&self, request: &CheckRequest) -> Result<CheckResult, CheckError>;
}

/// Adapts an async closure into a [`Check`].
pub struct FnCheck<F> {
    f: F,
}

impl<F> FnCheck<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Check for FnCheck<F>
where
    F: Fn(CheckRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CheckResult, CheckError>> + Send,
{
    async fn run(&self, request: &CheckRequest) -> Result<CheckResult, CheckError> {
        (self.f)(request.clone()).await
    }
}

/// Checks to run, keyed by unique name.
#[derive(Clone, Default)]
pub struct CheckRegistry {
    checks: BTreeMap<String, Arc<dyn Check>>,
}

impl std::fmt::Debug for CheckRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.checks.keys()).finish()
    }
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        check: impl Check + 'static,
    ) -> Result<(), CheckError> {
        let name = name.into();
        if self.checks.contains_key(&name) {
            return Err(CheckError::DuplicateCheck(name));
        }
        self.checks.insert(name, Arc::new(check));
        Ok(())
    }

    pub fn with(
        mut self,
        name: impl Into<String>,
        check: impl Check + 'static,
    ) -> Result<Self, CheckError> {
        self.register(name, check)?;
        Ok(self)
    }

    /// Register an async closure as a check.
    pub fn with_fn<F, Fut>(self, name: impl Into<String>, f: F) -> Result<Self, CheckError>
    where
        F: Fn(CheckRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CheckResult, CheckError>> + Send + 'static,
    {
        self.with(name, FnCheck::new(f))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.checks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

/// Runner settings.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum number of checks running at once.
    pub max_concurrent: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { max_concurrent: 8 }
    }
}

/// Results of one runner invocation, sorted by check name.
#[derive(Debug, Clone)]
pub struct CheckRun {
    pub results: Vec<CheckResult>,
    /// Whether cancellation was requested before the barrier was reached.
    pub cancelled: bool,
}

impl CheckRun {
    /// Results that carry a runtime error.
    pub fn errored(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| r.error().is_some())
    }
}

/// Run every registered check concurrently and wait for all of them.
///
/// Always yields one result per registered check. On cancellation, checks
/// that already finished keep their results; the rest report
/// [`CheckError::Cancelled`].
#[instrument(skip_all, fields(run_id = %request.run_id, checks = registry.len()))]
pub async fn run_checks(
    registry: &CheckRegistry,
    request: Arc<CheckRequest>,
    config: &RunnerConfig,
) -> CheckRun {
    let sem = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
    let mut join_set = JoinSet::new();
    let mut task_names: HashMap<task::Id, String> = HashMap::new();

    for (name, check) in &registry.checks {
        let check = Arc::clone(check);
        let request = Arc::clone(&request);
        let sem = Arc::clone(&sem);
        let task_name = name.clone();
        let handle = join_set.spawn(async move {
            let result = run_one(&task_name, check.as_ref(), &request, &sem).await;
            (task_name, result)
        });
        task_names.insert(handle.id(), name.clone());
    }

    let (mut results, mut lost) = join_all(join_set, &task_names).await;

    // Synthesize results for checks whose task vanished, so K checks always
    // produce K results.
    let run_id = request.run_id.to_string();
    for name in registry.names() {
        if !results.contains_key(name) {
            let err = CheckError::Lost {
                check: name.to_string(),
                detail: lost
                    .remove(name)
                    .unwrap_or_else(|| "no result".to_string()),
            };
            obs::emit_check_fault(&run_id, name, &err);
            METRICS.inc_checks_run();
            METRICS.inc_checks_failed();
            results.insert(name.to_string(), ScoredResult::runtime_error(name, err).into());
        }
    }

    CheckRun {
        results: results.into_values().collect(),
        cancelled: request.cancel.is_cancelled(),
    }
}

/// Drain `join_set`. Tasks that failed to join are reported by check name
/// with the join error text.
async fn join_all(
    mut join_set: JoinSet<(String, CheckResult)>,
    task_names: &HashMap<task::Id, String>,
) -> (BTreeMap<String, CheckResult>, HashMap<String, String>) {
    let mut results = BTreeMap::new();
    let mut lost = HashMap::new();
    while let Some(joined) = join_set.join_next_with_id().await {
        match joined {
            Ok((_, (name, result))) => {
                results.insert(name, result);
            }
            Err(e) => {
                let name = task_names.get(&e.id()).cloned().unwrap_or_default();
                warn!(check = %name, error = %e, "check task failed to join");
                lost.insert(name, e.to_string());
            }
        }
    }
    (results, lost)
}

async fn run_one(
    name: &str,
    check: &dyn Check,
    request: &CheckRequest,
    sem: &Semaphore,
) -> CheckResult {
    let run_id = request.run_id.to_string();
    let work = AssertUnwindSafe(async {
        let _permit = sem.acquire().await;
        check.run(request).await
    })
    .catch_unwind();

    let outcome = tokio::select! {
        biased;
        _ = request.cancel.cancelled() => None,
        res = work => Some(res),
    };

    let result = match outcome {
        Some(Ok(Ok(result))) => result,
        Some(Ok(Err(e))) => {
            warn!(check = %name, error = %e, "check failed");
            ScoredResult::runtime_error(name, e).into()
        }
        Some(Err(panic)) => {
            let err = CheckError::Panicked {
                check: name.to_string(),
                detail: panic_message(panic.as_ref()),
            };
            obs::emit_check_fault(&run_id, name, &err);
            ScoredResult::runtime_error(name, err).into()
        }
        None => {
            obs::emit_check_cancelled(&run_id, name);
            ScoredResult::runtime_error(
                name,
                CheckError::Cancelled {
                    check: name.to_string(),
                },
            )
            .into()
        }
    };

    METRICS.inc_checks_run();
    if result.error().is_some() {
        METRICS.inc_checks_failed();
    }
    obs::emit_check_finished(&run_id, name, result.passed(), result.error().is_some());
    result
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
