//! Probes turn evidence into findings.
//!
//! A [`Probe`] reads the immutable [`EvidenceSnapshot`] and emits findings
//! under its own id. Probes are registered explicitly in a [`ProbeRegistry`]
//! built at startup; nothing registers itself.

pub mod builtin;
pub mod catalog;
pub mod error;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::evidence::EvidenceSnapshot;
use crate::finding::{Finding, Outcome};

pub use catalog::{ProbeCatalog, ProbeDefinition};
pub use error::{ProbeError, ProbeResult};

/// An atomic inspection over the evidence snapshot.
pub trait Probe: Send + Sync {
    fn id(&self) -> &str;

    fn run(&self, evidence: &EvidenceSnapshot, catalog: &ProbeCatalog) -> ProbeResult<Vec<Finding>>;
}

/// Ordered set of probes, unique by id.
#[derive(Clone, Default)]
pub struct ProbeRegistry {
    probes: Vec<Arc<dyn Probe>>,
}

impl std::fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, probe: impl Probe + 'static) -> ProbeResult<()> {
        if self.get(probe.id()).is_some() {
            return Err(ProbeError::DuplicateProbe(probe.id().to_string()));
        }
        self.probes.push(Arc::new(probe));
        Ok(())
    }

    pub fn with(mut self, probe: impl Probe + 'static) -> ProbeResult<Self> {
        self.register(probe)?;
        Ok(self)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Probe>> {
        self.probes.iter().find(|p| p.id() == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.probes.iter().map(|p| p.id())
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Run every probe in registration order. See [`run_probes`].
    pub fn run(&self, evidence: &EvidenceSnapshot, catalog: &ProbeCatalog) -> Vec<Finding> {
        run_probes(self, evidence, catalog)
    }

    /// Like [`ProbeRegistry::run`], plus one [`Outcome::NotAvailable`]
    /// finding for every id in `required` that no registered probe covers.
    ///
    /// Without it a policy clause over a missing probe would see no
    /// findings and read as Positive.
    pub fn run_covering<'a>(
        &self,
        evidence: &EvidenceSnapshot,
        catalog: &ProbeCatalog,
        required: impl IntoIterator<Item = &'a str>,
    ) -> Vec<Finding> {
        let mut findings = self.run(evidence, catalog);
        let mut missing: Vec<&str> = required
            .into_iter()
            .filter(|id| self.get(id).is_none())
            .collect();
        missing.sort_unstable();
        missing.dedup();
        for id in missing {
            debug!(probe = %id, "required probe is not registered");
            findings.push(
                Finding::bare(id, Outcome::NotAvailable)
                    .with_message(format!("probe {id} is not registered")),
            );
        }
        findings
    }
}

/// Run every registered probe over `evidence` and concatenate the findings.
///
/// A probe that fails contributes one [`Outcome::Error`] finding carrying the
/// error text, so the evaluator can report it. Remediation templates are
/// resolved against the snapshot metadata.
pub fn run_probes(
    registry: &ProbeRegistry,
    evidence: &EvidenceSnapshot,
    catalog: &ProbeCatalog,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    for probe in &registry.probes {
        match probe.run(evidence, catalog) {
            Ok(found) => {
                debug!(probe = %probe.id(), findings = found.len(), "probe finished");
                findings.extend(
                    found
                        .into_iter()
                        .map(|f| f.with_remediation_metadata(&evidence.metadata)),
                );
            }
            Err(e) => {
                warn!(probe = %probe.id(), error = %e, "probe failed");
                findings.push(Finding::bare(probe.id(), Outcome::Error).with_message(e.to_string()));
            }
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Outcome);

    impl Probe for Fixed {
        fn id(&self) -> &str {
            self.0
        }

        fn run(&self, _: &EvidenceSnapshot, catalog: &ProbeCatalog) -> ProbeResult<Vec<Finding>> {
            Ok(vec![catalog.with_outcome(self.0, self.1, "fixed", None)?])
        }
    }

    struct Broken;

    impl Probe for Broken {
        fn id(&self) -> &str {
            "broken"
        }

        fn run(&self, _: &EvidenceSnapshot, _: &ProbeCatalog) -> ProbeResult<Vec<Finding>> {
            Err(ProbeError::failed("broken", "section missing"))
        }
    }

    const DEF: &str = "id: fixed\nremediation:\n  effort: Low\n  text: ['Fix ${{ metadata.repository.uri }}']\n";

    fn catalog() -> ProbeCatalog {
        ProbeCatalog::from_table(&[("fixed", DEF)]).unwrap()
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut reg = ProbeRegistry::new();
        reg.register(Fixed("fixed", Outcome::Positive)).unwrap();
        assert_eq!(
            reg.register(Fixed("fixed", Outcome::Negative)),
            Err(ProbeError::DuplicateProbe("fixed".to_string()))
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_failing_probe_becomes_error_finding() {
        let reg = ProbeRegistry::new()
            .with(Fixed("fixed", Outcome::Positive))
            .unwrap()
            .with(Broken)
            .unwrap();
        let findings = reg.run(&EvidenceSnapshot::default(), &catalog());
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].outcome, Outcome::Positive);
        assert_eq!(findings[1].probe, "broken");
        assert_eq!(findings[1].outcome, Outcome::Error);
        assert!(findings[1].message.contains("section missing"));
    }

    #[test]
    fn test_unregistered_required_ids_are_not_available() {
        let reg = ProbeRegistry::new()
            .with(Fixed("fixed", Outcome::Positive))
            .unwrap();
        let findings = reg.run_covering(
            &EvidenceSnapshot::default(),
            &catalog(),
            ["fixed", "ghost", "ghost"],
        );
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].outcome, Outcome::Positive);
        assert_eq!(findings[1].probe, "ghost");
        assert_eq!(findings[1].outcome, Outcome::NotAvailable);
        assert!(findings[1].remediation.is_none());
    }

    #[test]
    fn test_remediation_metadata_is_applied() {
        let reg = ProbeRegistry::new()
            .with(Fixed("fixed", Outcome::Negative))
            .unwrap();
        let mut evidence = EvidenceSnapshot::default();
        evidence
            .metadata
            .insert("repository.uri".to_string(), "github.com/acme/widget".to_string());
        let findings = run_probes(&reg, &evidence, &catalog());
        let rem = findings[0].remediation.as_ref().unwrap();
        assert_eq!(rem.text, "Fix github.com/acme/widget");
    }
}
