//! Policy documents evaluated end to end through the public API.

use posture_core::{
    evaluate_clause, worst_of, Clause, Confidence, Finding, Logic, Outcome, Policy, PolicyError,
    ResultError, Score, ScoredResult,
};

const POLICY: &str = r#"
version: 1
statements:
  - name: EitherTool
    require:
      or:
        - probe: A
        - probe: B
    negativeText: Install a tool.
    positiveText: A tool is installed.
    risk: High
    confidence: [Positive]
    labels: ["check:Tools"]

  - name: BothControls
    require:
      and:
        - probe: A
        - probe: B
    negativeText: Enable both controls.
    positiveText: Both controls are enabled.
    risk: Medium
    confidence: [Negative]
    labels: ["check:Controls"]

  - name: NoStaleApprovals
    require:
      not:
        probe: StaleApprovalsAllowed
    negativeText: Dismiss stale approvals.
    positiveText: Stale approvals are dismissed.
    risk: Low
    confidence: [Negative, Positive]
"#;

fn finding(probe: &str, outcome: Outcome) -> Finding {
    Finding::bare(probe, outcome).with_message(format!("{probe} is {outcome}"))
}

#[test]
fn test_or_statement_round_trip() {
    let policy = Policy::from_yaml(POLICY).unwrap();
    let evaluation = policy.evaluate(&[finding("A", Outcome::Positive)]);

    let s = &evaluation.statements()[0];
    assert_eq!(s.name, "EitherTool");
    assert_eq!(s.outcome, Outcome::Positive);
    assert_eq!(s.text, "A tool is installed.");
    assert_eq!(s.logic, Logic::Or);
    assert_eq!(s.findings, vec![finding("A", Outcome::Positive)]);
}

#[test]
fn test_and_statement_round_trip() {
    let policy = Policy::from_yaml(POLICY).unwrap();
    let evaluation = policy.evaluate(&[
        finding("A", Outcome::Negative),
        finding("B", Outcome::Positive),
    ]);

    let s = &evaluation.statements()[1];
    assert_eq!(s.outcome, Outcome::Negative);
    assert_eq!(s.text, "Enable both controls.");
    assert_eq!(s.findings, vec![finding("A", Outcome::Negative)]);
    assert_eq!(s.confidence, Confidence::High);
}

#[test]
fn test_not_statement_flips_verdict() {
    let policy = Policy::from_yaml(POLICY).unwrap();

    let allowed = policy.evaluate(&[finding("StaleApprovalsAllowed", Outcome::Positive)]);
    assert_eq!(allowed.statements()[2].outcome, Outcome::Negative);
    assert_eq!(allowed.statements()[2].text, "Dismiss stale approvals.");

    let dismissed = policy.evaluate(&[finding("StaleApprovalsAllowed", Outcome::Negative)]);
    assert_eq!(dismissed.statements()[2].outcome, Outcome::Positive);

    let unknown = policy.evaluate(&[finding("StaleApprovalsAllowed", Outcome::NotAvailable)]);
    assert_eq!(unknown.statements()[2].outcome, Outcome::NotAvailable);
}

#[test]
fn test_not_supported_leaf_passes_through_not() {
    let findings = [finding("A", Outcome::NotSupported)];

    let leaf = evaluate_clause(&Clause::probe("A"), &findings);
    assert_eq!(leaf.outcome, Outcome::NotSupported);

    let negated = evaluate_clause(&Clause::not(Clause::probe("A")), &findings);
    assert_eq!(negated.outcome, Outcome::NotSupported);
    assert_eq!(negated.logic, Logic::Not);
    assert_eq!(negated.findings, vec![finding("A", Outcome::NotSupported)]);
}

#[test]
fn test_not_supported_leaf_under_and_with_positive_sibling() {
    let policy = Policy::from_yaml(POLICY).unwrap();
    let evaluation = policy.evaluate(&[
        finding("A", Outcome::NotSupported),
        finding("B", Outcome::Positive),
    ]);

    let s = &evaluation.statements()[1];
    assert_eq!(s.name, "BothControls");
    assert_eq!(s.outcome, Outcome::Positive);
    assert_eq!(s.text, "Both controls are enabled.");
    assert_eq!(
        s.findings,
        vec![
            finding("A", Outcome::NotSupported),
            finding("B", Outcome::Positive)
        ]
    );
}

#[test]
fn test_error_leaf_under_and_or_not() {
    let findings = [finding("A", Outcome::Error), finding("B", Outcome::Positive)];

    let both = evaluate_clause(
        &Clause::and(vec![Clause::probe("A"), Clause::probe("B")]),
        &findings,
    );
    assert_eq!(both.outcome, Outcome::Error);
    assert_eq!(both.findings, vec![finding("A", Outcome::Error)]);

    let either = evaluate_clause(
        &Clause::or(vec![Clause::probe("A"), Clause::probe("B")]),
        &findings,
    );
    assert_eq!(either.outcome, Outcome::Positive);
    assert_eq!(either.findings, vec![finding("B", Outcome::Positive)]);

    let negated = evaluate_clause(&Clause::not(Clause::probe("A")), &findings);
    assert_eq!(negated.outcome, Outcome::Error);
    assert_eq!(negated.findings, vec![finding("A", Outcome::Error)]);
}

#[test]
fn test_evaluation_is_deterministic_across_runs() {
    let policy = Policy::from_yaml(POLICY).unwrap();
    let findings = vec![
        finding("A", Outcome::Negative),
        finding("B", Outcome::Error),
        finding("A", Outcome::Positive),
        finding("StaleApprovalsAllowed", Outcome::NotSupported),
    ];
    let first = serde_json::to_string(&policy.evaluate(&findings)).unwrap();
    for _ in 0..5 {
        assert_eq!(serde_json::to_string(&policy.evaluate(&findings)).unwrap(), first);
    }
}

#[test]
fn test_duplicate_findings_merge_order_independent() {
    let policy = Policy::from_yaml(POLICY).unwrap();
    let forward = policy.evaluate(&[
        finding("A", Outcome::Positive),
        finding("A", Outcome::Negative),
    ]);
    let backward = policy.evaluate(&[
        finding("A", Outcome::Negative),
        finding("A", Outcome::Positive),
    ]);
    assert_eq!(forward.statements()[1].outcome, Outcome::Negative);
    assert_eq!(
        forward.statements()[1].outcome,
        backward.statements()[1].outcome
    );
}

#[test]
fn test_check_label_filter() {
    let policy = Policy::from_yaml(POLICY).unwrap();
    let tools = policy.evaluate_for_check(&[], "Tools");
    assert_eq!(tools.len(), 1);
    assert_eq!(tools.statements()[0].name, "EitherTool");
}

#[test]
fn test_findings_document_from_json() {
    let policy = Policy::from_yaml(POLICY).unwrap();
    let findings: Vec<Finding> = serde_json::from_str(
        r#"[
            {"probe": "A", "outcome": "Negative", "message": "no tool A"},
            {"probe": "B", "outcome": "Positive"}
        ]"#,
    )
    .unwrap();
    let evaluation = policy.evaluate(&findings);
    assert_eq!(evaluation.statements()[0].outcome, Outcome::Positive);
    assert_eq!(evaluation.statements()[1].outcome, Outcome::Negative);
    // No finding for the negated probe: the leaf is Positive, so NOT fails.
    assert_eq!(evaluation.statements()[2].outcome, Outcome::Negative);
    assert_eq!(evaluation.failing().count(), 2);
}

#[test]
fn test_clause_shape_error_points_at_line() {
    let doc = "version: 1\nstatements:\n  - name: S\n    require:\n      probe: A\n      or:\n        - probe: B\n    confidence: [Positive]\n";
    let err = Policy::from_yaml(doc).unwrap_err();
    assert!(matches!(err, PolicyError::ClauseShape { .. }));
    let line = err.line().unwrap();
    assert!((4..=7).contains(&line), "line {line}");
    assert!(err.to_string().starts_with(&format!("line {line}:")));
}

#[test]
fn test_override_file_replaces_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("override.yml");
    std::fs::write(&path, POLICY).unwrap();

    let policy = Policy::load(Some(&path)).unwrap();
    assert_eq!(policy.statements().len(), 3);
    assert_ne!(policy.digest(), Policy::embedded().unwrap().digest());
}

#[test]
fn test_worst_of_scored_results() {
    let results = vec![
        ScoredResult::max_score("a", "ok"),
        ScoredResult::with_score("b", "meh", Score::new(7).unwrap()),
        ScoredResult::inconclusive("c", "unknown"),
    ];
    assert_eq!(worst_of(results).unwrap().name, "c");
    assert_eq!(
        worst_of(Vec::<ScoredResult>::new()).unwrap_err(),
        ResultError::EmptyAggregate
    );
}
