//! Posture CLI
//!
//! The `posture` command evaluates a security posture policy.
//!
//! ## Commands
//!
//! - `validate`: Parse a policy and print its statement count and digest
//! - `eval`: Evaluate a policy over a findings file
//! - `assess`: Run the built-in probes and every policy check over an evidence file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use posture_core::probe::builtin;
use posture_core::{
    policy_checks, run_assessment, CheckRequest, EvidenceSnapshot, Finding, Policy, RepoInfo,
    RunnerConfig,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "posture")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Repository security posture policy evaluation", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Policy document to use instead of the embedded default
    #[arg(long, global = true, env = "POSTURE_POLICY")]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse the policy and report its statement count and digest
    Validate,

    /// Evaluate the policy over a JSON array of findings
    Eval {
        /// Findings file (JSON array)
        #[arg(short, long)]
        findings: PathBuf,

        /// Only evaluate statements labelled `check:<CHECK>`
        #[arg(short, long)]
        check: Option<String>,
    },

    /// Run every policy check against collected evidence
    Assess {
        /// Evidence file: a JSON object mapping section names to values
        #[arg(short, long)]
        evidence: PathBuf,

        /// Repository URI, e.g. github.com/acme/widget
        #[arg(long)]
        repo: String,

        /// Repository host
        #[arg(long, default_value = "github.com")]
        host: String,

        /// Commit the evidence was collected at
        #[arg(long)]
        commit: Option<String>,

        /// Default branch name
        #[arg(long)]
        default_branch: Option<String>,

        /// Maximum number of checks running at once
        #[arg(long, env = "POSTURE_MAX_CONCURRENT", default_value_t = 8)]
        max_concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    posture_core::init_tracing(cli.json, level);

    let policy = load_policy(cli.policy.as_deref())?;

    let output = match cli.command {
        Commands::Validate => cmd_validate(&policy)?,
        Commands::Eval { findings, check } => cmd_eval(&policy, &findings, check.as_deref())?,
        Commands::Assess {
            evidence,
            repo,
            host,
            commit,
            default_branch,
            max_concurrent,
        } => {
            let mut info = RepoInfo::new(host, repo);
            if let Some(sha) = commit {
                info = info.with_commit(sha);
            }
            if let Some(branch) = default_branch {
                info = info.with_default_branch(branch);
            }
            cmd_assess(policy, info, &evidence, max_concurrent).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_policy(path: Option<&Path>) -> Result<Policy> {
    let policy = Policy::load(path).with_context(|| match path {
        Some(p) => format!("Failed to load policy {:?}", p),
        None => "Failed to load embedded policy".to_string(),
    })?;
    info!(
        statements = policy.statements().len(),
        digest = %policy.digest(),
        "policy loaded"
    );
    Ok(policy)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateOutput {
    statements: usize,
    checks: Vec<String>,
    probes: Vec<String>,
    digest: String,
}

fn cmd_validate(policy: &Policy) -> Result<Value> {
    let out = ValidateOutput {
        statements: policy.statements().len(),
        checks: policy.required_checks().into_iter().map(str::to_string).collect(),
        probes: policy.required_probes().into_iter().map(str::to_string).collect(),
        digest: policy.digest().to_string(),
    };
    Ok(serde_json::to_value(out)?)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EvalOutput {
    policy_digest: String,
    failing: usize,
    evaluation: posture_core::Evaluation,
}

fn cmd_eval(policy: &Policy, findings_path: &Path, check: Option<&str>) -> Result<Value> {
    let raw = std::fs::read_to_string(findings_path)
        .with_context(|| format!("Failed to read findings {:?}", findings_path))?;
    let findings: Vec<Finding> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse findings {:?}", findings_path))?;

    let evaluation = match check {
        Some(name) => policy.evaluate_for_check(&findings, name),
        None => policy.evaluate(&findings),
    };
    let out = EvalOutput {
        policy_digest: policy.digest().to_string(),
        failing: evaluation.failing().count(),
        evaluation,
    };
    Ok(serde_json::to_value(out)?)
}

async fn cmd_assess(
    policy: Policy,
    repo: RepoInfo,
    evidence_path: &Path,
    max_concurrent: usize,
) -> Result<Value> {
    let raw = std::fs::read_to_string(evidence_path)
        .with_context(|| format!("Failed to read evidence {:?}", evidence_path))?;
    let sections: BTreeMap<String, Value> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse evidence {:?}", evidence_path))?;

    let evidence = sections
        .into_iter()
        .fold(EvidenceSnapshot::for_repo(&repo), |snapshot, (name, value)| {
            snapshot.with_section(name, value)
        });

    let registry = policy_checks(&policy).context("Failed to build policy checks")?;
    let request = Arc::new(CheckRequest::new(
        repo,
        evidence,
        policy,
        builtin::registry().context("Failed to register built-in probes")?,
        builtin::catalog().context("Failed to load probe definitions")?,
    ));
    let config = RunnerConfig { max_concurrent };

    let report = run_assessment(&registry, request, &config).await;
    info!(
        run_id = %report.run_id,
        checks = report.checks.len(),
        failing = report.failing_checks().count(),
        "assessment complete"
    );
    Ok(serde_json::to_value(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "posture",
            "eval",
            "--findings",
            "f.json",
            "--check",
            "Fuzzing",
            "--policy",
            "p.yml",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.policy, Some(PathBuf::from("p.yml")));
        match cli.command {
            Commands::Eval { findings, check } => {
                assert_eq!(findings, PathBuf::from("f.json"));
                assert_eq!(check.as_deref(), Some("Fuzzing"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_assess_requires_repo() {
        assert!(Cli::try_parse_from(["posture", "assess", "--evidence", "e.json"]).is_err());
    }

    #[test]
    fn test_validate_embedded_policy() {
        let policy = load_policy(None).unwrap();
        let out = cmd_validate(&policy).unwrap();
        assert_eq!(out["statements"], policy.statements().len());
        assert_eq!(out["digest"].as_str().unwrap().len(), 64);
        assert!(out["checks"]
            .as_array()
            .unwrap()
            .contains(&json!("Branch-Protection")));
    }

    #[test]
    fn test_load_policy_reports_bad_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.yml");
        std::fs::write(&path, "version: 2\nstatements: []\n").unwrap();
        let err = load_policy(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to load policy"));
    }

    #[test]
    fn test_eval_findings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("findings.json");
        std::fs::write(
            &path,
            json!([
                {"probe": "toolDependabotInstalled", "outcome": "Positive", "message": "found"}
            ])
            .to_string(),
        )
        .unwrap();

        let policy = Policy::embedded().unwrap();
        let out = cmd_eval(&policy, &path, Some("Dependency-Update-Tool")).unwrap();
        assert_eq!(out["failing"], 0);
        assert_eq!(out["evaluation"].as_array().unwrap().len(), 1);
        assert_eq!(out["policyDigest"], policy.digest());
    }

    #[test]
    fn test_eval_rejects_malformed_findings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("findings.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = cmd_eval(&Policy::embedded().unwrap(), &path, None).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse findings"));
    }

    #[tokio::test]
    async fn test_assess_reports_every_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evidence.json");
        std::fs::write(
            &path,
            json!({
                "dependencyUpdateTools": {"tools": [{"name": "RenovateBot"}]},
                "branchProtection": {"branches": [{"name": "main", "protected": true}]}
            })
            .to_string(),
        )
        .unwrap();

        let policy = Policy::embedded().unwrap();
        let expected = policy.required_checks().len();
        let repo = RepoInfo::new("github.com", "github.com/acme/widget");
        let out = cmd_assess(policy, repo, &path, 2).await.unwrap();

        assert_eq!(out["checks"].as_array().unwrap().len(), expected);
        assert_eq!(out["cancelled"], false);
        assert_eq!(out["repo"]["uri"], "github.com/acme/widget");
    }
}
