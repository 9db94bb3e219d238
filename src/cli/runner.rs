//! Plan-only test runner
//!
//! Discovers `*.tftest.hcl` files, refuses any file with a run that would apply,
//! and hands the rest to a [`PlanEvaluator`].
//!
//! ## TestReporter Trait
//!
//! Reporting is separated from execution through [`TestReporter`], so other output
//! formats can be added by implementing the trait.
//!
//! ## Notes
//! - `-k` selects runs by name. Terraform evaluates whole files, so a file is evaluated
//!   when at least one of its runs matches, and only matching runs are reported.
//! - Failures are never retried; evaluation is deterministic.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::ast::{Block, Expr};
use crate::diagnostics::format_error;
use crate::emit::TEST_FILE_SUFFIX;
use crate::parser;

use super::runner_interfaces::{
    DryRunEvaluator, PlanEvaluator, RunOutcome, RunResult, RunnerError, TerraformEvaluator, TestFileInfo,
};
use super::{CliError, CliResult, ExitCode};

// ============================================================================
// Test Reporter Trait
// ============================================================================

/// Trait for reporting test execution results.
pub trait TestReporter {
    /// Called when discovery begins
    fn on_discovery_start(&mut self, _dir: &Path) {}

    /// Called once all files have passed the plan-only guard
    fn on_collection_complete(&mut self, files: &[TestFileInfo], runs: usize);

    /// Called before a file is evaluated
    fn on_file_start(&mut self, _file: &TestFileInfo) {}

    /// Called when one run completes
    fn on_run_complete(&mut self, file: &TestFileInfo, result: &RunResult);

    /// Called when a whole file could not be evaluated
    fn on_file_error(&mut self, file: &TestFileInfo, error: &RunnerError);

    /// Called when every file has been evaluated
    fn on_summary(&mut self, summary: &TestSummary);
}

/// Summary of a test session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
    /// Runs excluded by `-k`.
    pub deselected: usize,
    pub duration: Duration,
}

impl TestSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }

    fn record(&mut self, outcome: &RunOutcome) {
        self.total += 1;
        match outcome {
            RunOutcome::Passed => self.passed += 1,
            RunOutcome::Failed(_) => self.failed += 1,
            RunOutcome::Errored(_) => self.errored += 1,
            RunOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}

/// Console reporter: one line per run in verbose mode, one character otherwise.
#[derive(Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl TestReporter for ConsoleReporter {
    fn on_collection_complete(&mut self, files: &[TestFileInfo], runs: usize) {
        println!("\x1b[1m=================== test session starts ===================\x1b[0m");
        println!("collected {} run(s) in {} file(s)", runs, files.len());
        println!();
    }

    fn on_file_start(&mut self, file: &TestFileInfo) {
        if !self.verbose {
            print!("{} ", file.relative.display());
        }
    }

    fn on_run_complete(&mut self, file: &TestFileInfo, result: &RunResult) {
        let (short, long) = match &result.outcome {
            RunOutcome::Passed => ("\x1b[32m.\x1b[0m", "\x1b[32mPASSED\x1b[0m".to_string()),
            RunOutcome::Failed(_) => ("\x1b[31mF\x1b[0m", "\x1b[31mFAILED\x1b[0m".to_string()),
            RunOutcome::Errored(_) => ("\x1b[31mE\x1b[0m", "\x1b[31mERROR\x1b[0m".to_string()),
            RunOutcome::Skipped(reason) => ("\x1b[33ms\x1b[0m", format!("\x1b[33mSKIPPED\x1b[0m ({})", reason)),
        };
        if self.verbose {
            println!("{}::{} {}", file.relative.display(), result.run, long);
        } else {
            print!("{}", short);
        }

        match &result.outcome {
            RunOutcome::Failed(messages) => {
                println!();
                println!("\x1b[1;31m___________ {} ___________\x1b[0m", result.run);
                for message in messages {
                    println!("    {}", message);
                }
            }
            RunOutcome::Errored(message) => {
                println!();
                println!("\x1b[1;31m___________ {} (error) ___________\x1b[0m", result.run);
                for line in message.lines() {
                    println!("    {}", line);
                }
            }
            _ => {}
        }
    }

    fn on_file_error(&mut self, file: &TestFileInfo, error: &RunnerError) {
        println!();
        println!("\x1b[31mERROR\x1b[0m {}: {}", file.relative.display(), error);
    }

    fn on_summary(&mut self, summary: &TestSummary) {
        if !self.verbose {
            println!();
        }
        println!();

        let mut parts = Vec::new();
        if summary.passed > 0 {
            parts.push(format!("{} passed", summary.passed));
        }
        if summary.failed > 0 {
            parts.push(format!("{} failed", summary.failed));
        }
        if summary.errored > 0 {
            parts.push(format!("{} errored", summary.errored));
        }
        if summary.skipped > 0 {
            parts.push(format!("{} skipped", summary.skipped));
        }
        if summary.deselected > 0 {
            parts.push(format!("{} deselected", summary.deselected));
        }
        if parts.is_empty() {
            parts.push("no runs".to_string());
        }
        let color = if summary.is_success() { "\x1b[1;32m" } else { "\x1b[1;31m" };
        println!(
            "{}=================== {} in {:.2}s ===================\x1b[0m",
            color,
            parts.join(", "),
            summary.duration.as_secs_f64()
        );
    }
}

// ============================================================================
// Options and entry point
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub verbose: bool,
    /// Stop after the first file with a failing or erroring run.
    pub stop_on_fail: bool,
    /// Substring a run name must contain.
    pub filter: Option<String>,
    pub dry_run: bool,
}

/// Run the generated tests of a module with `terraform test`.
pub fn run_tests(module_dir: &Path, test_dir: &Path, terraform_bin: &str, options: &RunOptions) -> CliResult<ExitCode> {
    let mut reporter = ConsoleReporter::new(options.verbose);
    let summary = if options.dry_run {
        run_with(&mut DryRunEvaluator, &mut reporter, module_dir, test_dir, options)
    } else {
        let mut evaluator = TerraformEvaluator::new(terraform_bin, test_dir);
        run_with(&mut evaluator, &mut reporter, module_dir, test_dir, options)
    }
    .map_err(|e| CliError::failure(e.to_string()))?;

    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        // Summary already printed
        Err(CliError::new("", ExitCode::FAILURE))
    }
}

/// Discover, guard and evaluate test files.
///
/// ## Errors
/// Fails before evaluating anything when discovery fails, a file does not parse,
/// or any run in any file would apply.
#[tracing::instrument(skip_all, fields(dir = %module_dir.display()))]
pub fn run_with(
    evaluator: &mut dyn PlanEvaluator,
    reporter: &mut dyn TestReporter,
    module_dir: &Path,
    test_dir: &Path,
    options: &RunOptions,
) -> Result<TestSummary, RunnerError> {
    let start = Instant::now();
    reporter.on_discovery_start(module_dir);

    let paths = discover_test_files(&module_dir.join(test_dir))?;
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(guard_plan_only(module_dir, &path)?);
    }

    let mut summary = TestSummary::default();
    let selected = |run: &str| options.filter.as_deref().is_none_or(|k| run.contains(k));
    let run_count = files.iter().flat_map(|f| &f.runs).filter(|r| selected(r)).count();
    summary.deselected = files.iter().map(|f| f.runs.len()).sum::<usize>() - run_count;
    reporter.on_collection_complete(&files, run_count);

    if run_count > 0 {
        evaluator.initialize(module_dir)?;
    }

    for file in files.iter().filter(|f| f.runs.iter().any(|r| selected(r))) {
        reporter.on_file_start(file);
        let mut file_failed = false;
        match evaluator.evaluate(module_dir, file) {
            Ok(results) => {
                for result in results.iter().filter(|r| selected(&r.run)) {
                    summary.record(&result.outcome);
                    file_failed |= matches!(result.outcome, RunOutcome::Failed(_) | RunOutcome::Errored(_));
                    reporter.on_run_complete(file, result);
                }
            }
            Err(error) => {
                tracing::warn!(file = %file.relative.display(), %error, "file could not be evaluated");
                let runs = file.runs.iter().filter(|r| selected(r)).count();
                summary.total += runs;
                summary.errored += runs;
                file_failed = true;
                reporter.on_file_error(file, &error);
            }
        }
        if options.stop_on_fail && file_failed {
            tracing::info!(file = %file.relative.display(), "stopping after first failing file");
            break;
        }
    }

    summary.duration = start.elapsed();
    reporter.on_summary(&summary);
    Ok(summary)
}

// ============================================================================
// Discovery and the plan-only guard
// ============================================================================

/// `*.tftest.hcl` files directly inside `dir`, sorted.
pub fn discover_test_files(dir: &Path) -> Result<Vec<PathBuf>, RunnerError> {
    let entries = fs::read_dir(dir).map_err(|e| RunnerError::Discovery(format!("{}: {}", dir.display(), e)))?;
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(TEST_FILE_SUFFIX))
        })
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(RunnerError::Discovery(format!(
            "no *{} files in {}",
            TEST_FILE_SUFFIX,
            dir.display()
        )));
    }
    Ok(files)
}

/// Parse a test file and make sure every `run` block sets `command = plan`.
///
/// Terraform defaults a run without `command` to apply, so a missing attribute is
/// rejected as well.
pub fn guard_plan_only(module_dir: &Path, path: &Path) -> Result<TestFileInfo, RunnerError> {
    let source = fs::read_to_string(path)?;
    let display = path.display().to_string();
    let body = parser::parse_source(&source)
        .map_err(|errs| RunnerError::Parse(errs.iter().map(|e| format_error(&display, &source, e)).collect()))?;

    let mut runs = Vec::new();
    for block in body.blocks_of("run") {
        let name = block.node.labels.first().cloned().unwrap_or_default();
        if !is_plan(block.node) {
            return Err(RunnerError::MutatingRun {
                path: path.to_path_buf(),
                run: name,
            });
        }
        runs.push(name);
    }

    let relative = path.strip_prefix(module_dir).unwrap_or(path).to_path_buf();
    tracing::debug!(file = %relative.display(), runs = runs.len(), "plan-only guard passed");
    Ok(TestFileInfo {
        path: path.to_path_buf(),
        relative,
        runs,
    })
}

fn is_plan(block: &Block) -> bool {
    block
        .body
        .attribute("command")
        .is_some_and(|attr| matches!(&attr.value.node, Expr::Variable(v) if v == "plan"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PLAN_FILE: &str = "run \"defaults\" {\n  command = plan\n}\n\nrun \"environment_is_prod\" {\n  command = plan\n\n  variables {\n    environment = \"prod\"\n  }\n}\n";

    /// Evaluator that fails every run whose name contains "prod".
    #[derive(Default)]
    struct FakeEvaluator {
        initialized: usize,
        evaluated: Vec<String>,
    }

    impl PlanEvaluator for FakeEvaluator {
        fn initialize(&mut self, _module_dir: &Path) -> Result<(), RunnerError> {
            self.initialized += 1;
            Ok(())
        }

        fn evaluate(&mut self, _module_dir: &Path, file: &TestFileInfo) -> Result<Vec<RunResult>, RunnerError> {
            self.evaluated.push(file.relative.display().to_string());
            Ok(file
                .runs
                .iter()
                .map(|run| RunResult {
                    run: run.clone(),
                    outcome: if run.contains("prod") {
                        RunOutcome::Failed(vec![format!("{} failed", run)])
                    } else {
                        RunOutcome::Passed
                    },
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct Recorder {
        runs: Vec<String>,
    }

    impl TestReporter for Recorder {
        fn on_collection_complete(&mut self, _files: &[TestFileInfo], _runs: usize) {}
        fn on_run_complete(&mut self, _file: &TestFileInfo, result: &RunResult) {
            self.runs.push(result.run.clone());
        }
        fn on_file_error(&mut self, _file: &TestFileInfo, _error: &RunnerError) {}
        fn on_summary(&mut self, _summary: &TestSummary) {}
    }

    fn module_with(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("tests")).unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join("tests").join(name), contents).unwrap();
        }
        dir
    }

    #[test]
    fn test_plan_runs_are_evaluated() {
        let dir = module_with(&[("main.tftest.hcl", PLAN_FILE)]);
        let mut evaluator = FakeEvaluator::default();
        let mut reporter = Recorder::default();
        let summary = run_with(
            &mut evaluator,
            &mut reporter,
            dir.path(),
            Path::new("tests"),
            &RunOptions::default(),
        )
        .unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_success());
        assert_eq!(evaluator.initialized, 1);
        assert_eq!(evaluator.evaluated, vec!["tests/main.tftest.hcl"]);
    }

    #[test]
    fn test_run_without_plan_is_refused_before_anything_runs() {
        let dir = module_with(&[
            ("a.tftest.hcl", PLAN_FILE),
            ("b.tftest.hcl", "run \"sneaky\" {\n  variables {\n    x = 1\n  }\n}\n"),
        ]);
        let mut evaluator = FakeEvaluator::default();
        let err = run_with(
            &mut evaluator,
            &mut Recorder::default(),
            dir.path(),
            Path::new("tests"),
            &RunOptions::default(),
        )
        .unwrap_err();
        match err {
            RunnerError::MutatingRun { run, .. } => assert_eq!(run, "sneaky"),
            other => panic!("expected MutatingRun, got {:?}", other),
        }
        assert_eq!(evaluator.initialized, 0);
        assert!(evaluator.evaluated.is_empty());
    }

    #[test]
    fn test_explicit_apply_is_refused() {
        let dir = module_with(&[("a.tftest.hcl", "run \"x\" {\n  command = apply\n}\n")]);
        let err = guard_plan_only(dir.path(), &dir.path().join("tests/a.tftest.hcl")).unwrap_err();
        assert!(err.to_string().contains("refusing"));
    }

    #[test]
    fn test_filter_selects_runs() {
        let dir = module_with(&[
            ("a.tftest.hcl", PLAN_FILE),
            ("b.tftest.hcl", "run \"access_list_ips_populated\" {\n  command = plan\n}\n"),
        ]);
        let mut evaluator = FakeEvaluator::default();
        let mut reporter = Recorder::default();
        let options = RunOptions {
            filter: Some("access".to_string()),
            ..RunOptions::default()
        };
        let summary = run_with(&mut evaluator, &mut reporter, dir.path(), Path::new("tests"), &options).unwrap();
        assert_eq!(evaluator.evaluated, vec!["tests/b.tftest.hcl"]);
        assert_eq!(reporter.runs, vec!["access_list_ips_populated"]);
        assert_eq!(summary.deselected, 2);
        assert!(summary.is_success());
    }

    #[test]
    fn test_stop_on_first_failing_file() {
        let dir = module_with(&[("a.tftest.hcl", PLAN_FILE), ("b.tftest.hcl", PLAN_FILE)]);
        let mut evaluator = FakeEvaluator::default();
        let options = RunOptions {
            stop_on_fail: true,
            ..RunOptions::default()
        };
        run_with(&mut evaluator, &mut Recorder::default(), dir.path(), Path::new("tests"), &options).unwrap();
        assert_eq!(evaluator.evaluated.len(), 1);
    }

    #[test]
    fn test_missing_test_dir_is_a_discovery_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_test_files(&dir.path().join("tests")).unwrap_err();
        assert!(matches!(err, RunnerError::Discovery(_)));
    }
}
