//! Emission of `.tftest.hcl` files.
//!
//! One file per feature area. A file holds a header comment, a file-level
//! `variables` block with the baseline values of required inputs, and one `run`
//! block per scenario:
//!
//! ```hcl
//! run "environment_is_prod" {
//!   command = plan
//!
//!   variables {
//!     environment = "prod"
//!   }
//!
//!   assert {
//!     condition     = output.backup_enabled == true
//!     error_message = "output.backup_enabled should equal true when environment = \"prod\""
//!   }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::ast::quote_string;
use crate::config::Config;
use crate::coverage::CoverageGap;
use crate::eval::{Value, hcl_key};
use crate::scenario::{Scenario, ScenarioSet};
use crate::synth::Synthesis;
use crate::version::TFSCENARIO_VERSION;

mod writer;

pub use writer::{HclWriter, line_diff};

pub const TEST_FILE_SUFFIX: &str = ".tftest.hcl";

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("cannot write {path}: {message}")]
    Io { path: PathBuf, message: String },
}

/// A rendered test file, not yet on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct TestFile {
    pub area: String,
    pub file_name: String,
    pub contents: String,
    pub runs: usize,
}

/// State of a rendered file compared with the output directory.
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    UpToDate,
    Missing,
    /// On-disk contents differ; carries the line diff.
    Stale(String),
}

/// Everything the emitter needs from the earlier stages.
pub struct EmitInput<'a> {
    pub module: &'a str,
    pub set: &'a ScenarioSet,
    pub synthesis: &'a Synthesis,
    /// Gaps from every stage, in report order.
    pub gaps: &'a [CoverageGap],
    pub config: &'a Config,
}

/// Render one test file per area; `main` first, then areas in order of first use.
#[tracing::instrument(skip_all, fields(module = input.module))]
pub fn render(input: &EmitInput<'_>) -> Vec<TestFile> {
    let mut areas: Vec<&str> = vec!["main"];
    for scenario in &input.set.scenarios {
        if !areas.contains(&scenario.area.as_str()) {
            areas.push(&scenario.area);
        }
    }

    areas
        .into_iter()
        .filter_map(|area| {
            let scenarios: Vec<&Scenario> = input.set.scenarios.iter().filter(|s| s.area == area).collect();
            if scenarios.is_empty() {
                return None;
            }
            let contents = render_file(input, &scenarios);
            tracing::debug!(area, runs = scenarios.len(), "rendered test file");
            Some(TestFile {
                area: area.to_string(),
                file_name: format!("{}{}", area, TEST_FILE_SUFFIX),
                contents,
                runs: scenarios.len(),
            })
        })
        .collect()
}

fn render_file(input: &EmitInput<'_>, scenarios: &[&Scenario]) -> String {
    let mut w = HclWriter::new();

    w.comment(&format!(
        "Generated by tfscenario {} for module \"{}\".\nEvery run uses `command = plan`; nothing is provisioned.",
        TFSCENARIO_VERSION, input.module
    ));
    let gaps: Vec<&CoverageGap> = input
        .gaps
        .iter()
        .filter(|g| match &g.scenario {
            None => true,
            Some(name) => scenarios.iter().any(|s| &s.name == name),
        })
        .collect();
    if !gaps.is_empty() {
        w.comment("\nCoverage gaps (not asserted):");
        for gap in gaps {
            let ack = if input.config.gaps.is_acknowledged(&gap.subject) {
                " (acknowledged)"
            } else {
                ""
            };
            w.comment(&format!("  {}{}", gap, ack));
        }
    }

    if !input.set.baseline.is_empty() {
        w.blank_lines(1);
        w.open("variables");
        w.attributes(&variable_lines(&input.set.baseline));
        w.close();
    }

    for scenario in scenarios {
        w.blank_lines(1);
        render_run(&mut w, scenario, input.synthesis);
    }
    w.finish()
}

fn render_run(w: &mut HclWriter, scenario: &Scenario, synthesis: &Synthesis) {
    w.open(&format!("run {}", quote_string(&scenario.name)));
    for note in &scenario.notes {
        w.comment(note);
    }
    w.attribute("command", &scenario.mode().to_string());

    if !scenario.overrides.is_empty() {
        w.blank_lines(1);
        w.open("variables");
        w.attributes(&variable_lines(&scenario.overrides));
        w.close();
    }

    let assertions = synthesis.assertions_for(&scenario.name);
    if assertions.is_empty() {
        w.blank_lines(1);
        w.comment("No output can be asserted on under plan for this scenario.");
    }
    for assertion in assertions {
        w.blank_lines(1);
        w.open("assert");
        w.attributes(&[
            ("condition".to_string(), assertion.condition.clone()),
            ("error_message".to_string(), quote_string(&assertion.error_message)),
        ]);
        w.close();
    }
    w.close();
}

fn variable_lines<'a>(values: impl IntoIterator<Item = (&'a String, &'a Value)>) -> Vec<(String, String)> {
    values
        .into_iter()
        .map(|(name, value)| (hcl_key(name), value.to_hcl()))
        .collect()
}

// ============================================================================
// Files on disk
// ============================================================================

/// Write rendered files into `dir`, creating it when needed.
///
/// ## Errors
/// Returns [`EmitError::Io`] for the first directory or file that cannot be written.
pub fn write_files(files: &[TestFile], dir: &Path) -> Result<Vec<PathBuf>, EmitError> {
    fs::create_dir_all(dir).map_err(|e| EmitError::Io {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file.file_name);
        fs::write(&path, &file.contents).map_err(|e| EmitError::Io {
            path: path.clone(),
            message: e.to_string(),
        })?;
        tracing::info!(path = %path.display(), runs = file.runs, "wrote test file");
        written.push(path);
    }
    Ok(written)
}

/// Compare rendered files with what is in `dir`.
pub fn check_files(files: &[TestFile], dir: &Path) -> Vec<(PathBuf, FileStatus)> {
    files
        .iter()
        .map(|file| {
            let path = dir.join(&file.file_name);
            let status = match fs::read_to_string(&path) {
                Err(_) => FileStatus::Missing,
                Ok(current) => match line_diff(&current, &file.contents) {
                    None => FileStatus::UpToDate,
                    Some(diff) => FileStatus::Stale(diff),
                },
            };
            (path, status)
        })
        .collect()
}
