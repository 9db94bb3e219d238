//! Plan-only evaluation boundary
//!
//! The runner never executes Terraform directly. It goes through [`PlanEvaluator`],
//! which has two implementations:
//! - [`TerraformEvaluator`] shells out to `terraform init` / `terraform test -json`
//! - [`DryRunEvaluator`] lists the runs a file would execute, without executing them
//!
//! Every file reaching an evaluator has already passed the plan-only guard in
//! `runner.rs`, so an evaluator never sees a run that could apply.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use thiserror::Error;

/// Errors that occur while discovering or evaluating test files
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to discover test files: {0}")]
    Discovery(String),

    #[error("{}", .0.join("\n"))]
    Parse(Vec<String>),

    #[error("{path}: run \"{run}\" does not set `command = plan`; refusing to evaluate a run that would apply")]
    MutatingRun { path: PathBuf, run: String },

    #[error("terraform init failed in {dir}: {message}")]
    Initialize { dir: PathBuf, message: String },

    #[error("terraform test could not be run: {0}")]
    Execution(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A discovered `.tftest.hcl` file that passed the plan-only guard.
#[derive(Debug, Clone)]
pub struct TestFileInfo {
    pub path: PathBuf,
    /// Path relative to the module directory, as `terraform test -filter` expects it.
    pub relative: PathBuf,
    /// Run block names in file order.
    pub runs: Vec<String>,
}

/// Outcome of one `run` block.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Passed,
    /// Failed assertions, one explanation each.
    Failed(Vec<String>),
    /// Terraform could not plan the run (invalid inputs, provider errors).
    Errored(String),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub run: String,
    pub outcome: RunOutcome,
}

/// Non-mutating evaluation of generated test files.
pub trait PlanEvaluator {
    /// Prepare the module directory for evaluation. Repeated calls for the same
    /// directory do nothing.
    fn initialize(&mut self, module_dir: &Path) -> Result<(), RunnerError>;

    /// Evaluate every run of one file, in file order.
    fn evaluate(&mut self, module_dir: &Path, file: &TestFileInfo) -> Result<Vec<RunResult>, RunnerError>;
}

// ============================================================================
// Terraform
// ============================================================================

/// Runs `terraform test` in plan mode.
pub struct TerraformEvaluator {
    bin: String,
    test_dir: PathBuf,
    initialized: HashSet<PathBuf>,
}

impl TerraformEvaluator {
    /// `test_dir` is relative to the module directory.
    pub fn new(bin: impl Into<String>, test_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            test_dir: test_dir.into(),
            initialized: HashSet::new(),
        }
    }
}

impl PlanEvaluator for TerraformEvaluator {
    fn initialize(&mut self, module_dir: &Path) -> Result<(), RunnerError> {
        if self.initialized.contains(module_dir) {
            return Ok(());
        }
        tracing::info!(dir = %module_dir.display(), "terraform init");
        let output = Command::new(&self.bin)
            .args(["init", "-backend=false", "-input=false", "-no-color"])
            .current_dir(module_dir)
            .output()
            .map_err(|e| RunnerError::Execution(format!("failed to run {}: {}", self.bin, e)))?;
        if !output.status.success() {
            return Err(RunnerError::Initialize {
                dir: module_dir.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        self.initialized.insert(module_dir.to_path_buf());
        Ok(())
    }

    fn evaluate(&mut self, module_dir: &Path, file: &TestFileInfo) -> Result<Vec<RunResult>, RunnerError> {
        let filter = file.relative.to_string_lossy().replace('\\', "/");
        tracing::debug!(file = %filter, "terraform test");
        let output = Command::new(&self.bin)
            .arg("test")
            .arg(format!("-test-directory={}", self.test_dir.display()))
            .arg(format!("-filter={}", filter))
            .args(["-json", "-no-color"])
            .current_dir(module_dir)
            .output()
            .map_err(|e| RunnerError::Execution(format!("failed to run {}: {}", self.bin, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let results = parse_test_events(&stdout, &file.runs);
        if results.is_empty() && !output.status.success() {
            return Err(RunnerError::Execution(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        Ok(results)
    }
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(rename = "@testrun", default)]
    test_run_name: Option<String>,
    #[serde(default)]
    test_run: Option<TestRunEvent>,
    #[serde(default)]
    diagnostic: Option<DiagnosticEvent>,
}

#[derive(Debug, Deserialize)]
struct TestRunEvent {
    run: String,
    #[serde(default)]
    progress: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiagnosticEvent {
    severity: String,
    summary: String,
    #[serde(default)]
    detail: Option<String>,
}

/// Turn the `terraform test -json` event stream into per-run results, in `order`.
///
/// Lines that are not JSON events are ignored. Runs without a completion event
/// are reported as skipped.
pub fn parse_test_events(stream: &str, order: &[String]) -> Vec<RunResult> {
    let mut status: BTreeMap<String, String> = BTreeMap::new();
    let mut messages: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for line in stream.lines().filter(|l| l.trim_start().starts_with('{')) {
        let Ok(event) = serde_json::from_str::<Event>(line) else {
            continue;
        };
        match (event.kind.as_str(), event.test_run, event.diagnostic) {
            ("test_run", Some(run), _) => {
                if run.progress.as_deref() == Some("complete") {
                    if let Some(s) = run.status {
                        status.insert(run.run, s);
                    }
                }
            }
            ("diagnostic", _, Some(diag)) if diag.severity == "error" => {
                if let Some(run) = event.test_run_name {
                    let text = diag.detail.filter(|d| !d.is_empty()).unwrap_or(diag.summary);
                    messages.entry(run).or_default().push(text);
                }
            }
            _ => {}
        }
    }

    if status.is_empty() {
        return Vec::new();
    }
    order
        .iter()
        .map(|run| {
            let msgs = messages.remove(run).unwrap_or_default();
            let outcome = match status.get(run).map(String::as_str) {
                Some("pass") => RunOutcome::Passed,
                Some("fail") => RunOutcome::Failed(msgs),
                Some("error") => RunOutcome::Errored(msgs.join("\n")),
                Some(other) => RunOutcome::Skipped(other.to_string()),
                None => RunOutcome::Skipped("not run".to_string()),
            };
            RunResult {
                run: run.clone(),
                outcome,
            }
        })
        .collect()
}

// ============================================================================
// Dry run
// ============================================================================

/// Reports every run as skipped without touching Terraform.
#[derive(Debug, Default)]
pub struct DryRunEvaluator;

impl PlanEvaluator for DryRunEvaluator {
    fn initialize(&mut self, _module_dir: &Path) -> Result<(), RunnerError> {
        Ok(())
    }

    fn evaluate(&mut self, _module_dir: &Path, file: &TestFileInfo) -> Result<Vec<RunResult>, RunnerError> {
        Ok(file
            .runs
            .iter()
            .map(|run| RunResult {
                run: run.clone(),
                outcome: RunOutcome::Skipped("dry run".to_string()),
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STREAM: &str = r#"{"@level":"info","@message":"Terraform 1.9.0","type":"version"}
{"@level":"info","@message":"Found 1 file and 3 run blocks","type":"test_abstract"}
{"@level":"info","@message":"  \"defaults\"... pass","@testfile":"tests/main.tftest.hcl","@testrun":"defaults","test_run":{"path":"tests/main.tftest.hcl","run":"defaults","progress":"complete","status":"pass"},"type":"test_run"}
{"@level":"error","@message":"Error: Test assertion failed","@testfile":"tests/main.tftest.hcl","@testrun":"environment_is_prod","diagnostic":{"severity":"error","summary":"Test assertion failed","detail":"output.backup_enabled should equal true when environment = \"prod\""},"type":"diagnostic"}
{"@level":"info","@message":"  \"environment_is_prod\"... fail","@testfile":"tests/main.tftest.hcl","@testrun":"environment_is_prod","test_run":{"path":"tests/main.tftest.hcl","run":"environment_is_prod","progress":"complete","status":"fail"},"type":"test_run"}
not json at all
"#;

    fn runs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_event_stream() {
        let results = parse_test_events(STREAM, &runs(&["defaults", "environment_is_prod", "edge"]));
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].outcome, RunOutcome::Passed);
        assert_eq!(
            results[1].outcome,
            RunOutcome::Failed(vec![
                "output.backup_enabled should equal true when environment = \"prod\"".to_string()
            ])
        );
        assert_eq!(results[2].outcome, RunOutcome::Skipped("not run".to_string()));
    }

    #[test]
    fn test_empty_stream_has_no_results() {
        assert!(parse_test_events("", &runs(&["defaults"])).is_empty());
    }

    #[test]
    fn test_dry_run_skips_everything() {
        let file = TestFileInfo {
            path: PathBuf::from("/m/tests/main.tftest.hcl"),
            relative: PathBuf::from("tests/main.tftest.hcl"),
            runs: runs(&["a", "b"]),
        };
        let mut evaluator = DryRunEvaluator;
        evaluator.initialize(Path::new("/m")).unwrap();
        let results = evaluator.evaluate(Path::new("/m"), &file).unwrap();
        assert!(results.iter().all(|r| matches!(r.outcome, RunOutcome::Skipped(_))));
    }
}
