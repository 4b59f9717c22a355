//! Process-wide run counters.
//!
//! The runner and evaluator bump these as they go; `run_assessment` calls
//! [`Metrics::flush`] once the report is assembled.

use std::sync::atomic::{AtomicU64, Ordering};

pub static METRICS: Metrics = Metrics::new();

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub checks_run: u64,
    pub checks_failed: u64,
    pub statements_evaluated: u64,
}

pub struct Metrics {
    checks_run: AtomicU64,
    checks_failed: AtomicU64,
    statements_evaluated: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            checks_run: AtomicU64::new(0),
            checks_failed: AtomicU64::new(0),
            statements_evaluated: AtomicU64::new(0),
        }
    }

    /// One check reached the join barrier, whatever its result.
    pub fn inc_checks_run(&self) {
        self.checks_run.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "checks_run", "counter incremented");
    }

    /// One check ended in a runtime error, panic or cancellation.
    pub fn inc_checks_failed(&self) {
        self.checks_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "checks_failed", "counter incremented");
    }

    pub fn add_statements_evaluated(&self, n: u64) {
        self.statements_evaluated.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "statements_evaluated", n, "counter incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            checks_run: self.checks_run(),
            checks_failed: self.checks_failed(),
            statements_evaluated: self.statements_evaluated(),
        }
    }

    /// Log the counters as one `info!` event and return what was logged.
    pub fn flush(&self) -> MetricsSnapshot {
        let snap = self.snapshot();
        tracing::info!(
            metric = "flush",
            checks_run = snap.checks_run,
            checks_failed = snap.checks_failed,
            statements_evaluated = snap.statements_evaluated,
        );
        snap
    }

    pub fn checks_run(&self) -> u64 {
        self.checks_run.load(Ordering::Relaxed)
    }

    pub fn checks_failed(&self) -> u64 {
        self.checks_failed.load(Ordering::Relaxed)
    }

    pub fn statements_evaluated(&self) -> u64 {
        self.statements_evaluated.load(Ordering::Relaxed)
    }

    /// Zero every counter. Tests share the global instance.
    pub fn reset(&self) {
        self.checks_run.store(0, Ordering::Relaxed);
        self.checks_failed.store(0, Ordering::Relaxed);
        self.statements_evaluated.store(0, Ordering::Relaxed);
    }
}
