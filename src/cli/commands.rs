//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::coverage::{self, CoverageGap};
use crate::emit::{self, FileStatus};
use crate::frontend::module::{MAX_SOURCE_FILE_SIZE, ModuleSource, load_module};
use crate::frontend::{diagnostics, lexer, parser};
use crate::interface::{self, ModuleInterface};
use crate::pipeline;
use crate::scenario::{self, BranchCoverage, Scenario, ScenarioSet};

use super::runner::{self, RunOptions};
use super::{CliError, CliResult, ExitCode};

// ============================================================================
// Shared setup
// ============================================================================

fn load_config(dir: &Path, explicit: Option<&Path>) -> CliResult<Config> {
    let config = Config::load(dir, explicit).map_err(|e| CliError::failure(e.to_string()))?;
    if let Some(source) = &config.source {
        tracing::debug!(config = %source.display(), "loaded configuration");
    }
    Ok(config)
}

fn load(dir: &Path) -> CliResult<ModuleSource> {
    load_module(dir).map_err(|e| CliError::failure(e.to_string()))
}

fn load_interface(dir: &Path) -> CliResult<ModuleInterface> {
    let source = load(dir)?;
    let interface = interface::extract(&source).map_err(|e| CliError::failure(e.to_string()))?;
    for warning in &interface.warnings {
        eprintln!("warning: {}", warning);
    }
    Ok(interface)
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text =
        serde_json::to_string_pretty(value).map_err(|e| CliError::failure(format!("Error encoding JSON: {}", e)))?;
    println!("{}", text);
    Ok(())
}

/// Read a single file for the debug flags, refusing oversized input.
pub fn read_source(path: &Path) -> CliResult<String> {
    let meta =
        fs::metadata(path).map_err(|e| CliError::failure(format!("Cannot access file '{}': {}", path.display(), e)))?;
    if meta.len() > MAX_SOURCE_FILE_SIZE {
        return Err(CliError::failure(format!(
            "File '{}' is too large ({} bytes; max {} bytes)",
            path.display(),
            meta.len(),
            MAX_SOURCE_FILE_SIZE
        )));
    }
    fs::read_to_string(path).map_err(|e| CliError::failure(format!("Error reading file '{}': {}", path.display(), e)))
}

// ============================================================================
// Debug flags
// ============================================================================

/// Lex and display tokens.
pub fn lex_file(path: &Path) -> CliResult<ExitCode> {
    let source = read_source(path)?;
    let name = path.display().to_string();
    let tokens = lexer::lex(&source).map_err(|errs| {
        let msg: String = errs.iter().map(|e| diagnostics::format_error(&name, &source, e)).collect();
        CliError::failure(msg.trim_end())
    })?;

    for tok in &tokens {
        println!("{:?}", tok);
    }
    Ok(ExitCode::SUCCESS)
}

/// Parse and display the syntax tree.
pub fn parse_file(path: &Path) -> CliResult<ExitCode> {
    let source = read_source(path)?;
    let name = path.display().to_string();
    match parser::parse_source(&source) {
        Ok(body) => {
            println!("{:#?}", body);
            Ok(ExitCode::SUCCESS)
        }
        Err(errs) => {
            let msg: String = errs.iter().map(|e| diagnostics::render_fancy(&name, &source, e)).collect();
            Err(CliError::failure(msg.trim_end()))
        }
    }
}

// ============================================================================
// extract
// ============================================================================

/// Print the interface summary of a module.
pub fn extract(dir: &Path, json: bool) -> CliResult<ExitCode> {
    let interface = load_interface(dir)?;
    let summary = interface.summary();
    if json {
        print_json(&summary)?;
        return Ok(ExitCode::SUCCESS);
    }

    println!("Module: {}", summary.module);
    println!();
    println!("Inputs ({}):", summary.inputs.len());
    let rows: Vec<[String; 3]> = summary
        .inputs
        .iter()
        .map(|i| {
            let mut flags = Vec::new();
            match &i.default {
                Some(v) => flags.push(format!("default {}", v)),
                None => flags.push("required".to_string()),
            }
            if i.nullable {
                flags.push("nullable".to_string());
            }
            if i.sensitive {
                flags.push("sensitive".to_string());
            }
            if i.type_unknown {
                flags.push("type-unknown".to_string());
            }
            if i.validations > 0 {
                flags.push(format!("{} validation(s)", i.validations));
            }
            [i.name.clone(), i.ty.clone(), flags.join(", ")]
        })
        .collect();
    print_table(&rows);

    println!();
    println!("Outputs ({}):", summary.outputs.len());
    let rows: Vec<[String; 3]> = summary
        .outputs
        .iter()
        .map(|o| {
            let flag = if o.sensitive { "sensitive" } else { "" };
            [o.name.clone(), o.expression.clone(), flag.to_string()]
        })
        .collect();
    print_table(&rows);

    println!();
    println!("Branches ({}):", summary.branches.len());
    let rows: Vec<[String; 3]> = summary
        .branches
        .iter()
        .map(|b| {
            [
                format!("#{}", b.id),
                b.condition.clone(),
                format!("drivers: {}; in {}", b.drivers.join(", "), b.origins.join(", ")),
            ]
        })
        .collect();
    print_table(&rows);
    Ok(ExitCode::SUCCESS)
}

fn print_table(rows: &[[String; 3]]) {
    let w0 = rows.iter().map(|r| r[0].chars().count()).max().unwrap_or(0);
    let w1 = rows.iter().map(|r| r[1].chars().count()).max().unwrap_or(0);
    for [a, b, c] in rows {
        let line = format!("  {:w0$}  {:w1$}  {}", a, b, c, w0 = w0, w1 = w1);
        println!("{}", line.trim_end());
    }
}

// ============================================================================
// scenarios
// ============================================================================

#[derive(Serialize)]
struct ScenarioReport<'a> {
    module: &'a str,
    #[serde(flatten)]
    set: &'a ScenarioSet,
    coverage: Vec<BranchCoverage>,
}

/// Print enumerated scenarios, the branch coverage matrix and enumeration gaps.
pub fn scenarios(dir: &Path, config_path: Option<&Path>, json: bool) -> CliResult<ExitCode> {
    let config = load_config(dir, config_path)?;
    let interface = load_interface(dir)?;
    let set = scenario::enumerate(&interface, &config);
    let coverage = set.coverage(&interface);

    if json {
        print_json(&ScenarioReport {
            module: &interface.name,
            set: &set,
            coverage,
        })?;
        return Ok(ExitCode::SUCCESS);
    }

    if !set.baseline.is_empty() {
        println!("Baseline:");
        for (name, value) in &set.baseline {
            println!("  {} = {}", name, value);
        }
        println!();
    }

    println!("Scenarios ({}):", set.scenarios.len());
    for s in &set.scenarios {
        print_scenario(s);
    }

    if !coverage.is_empty() {
        println!();
        println!("Branch coverage:");
        for c in &coverage {
            println!("  #{} {}", c.branch, c.condition);
            println!("      true:  {}", list_or_dash(&c.when_true));
            println!("      false: {}", list_or_dash(&c.when_false));
            if !c.unknown.is_empty() {
                println!("      unknown: {}", c.unknown.join(", "));
            }
        }
    }

    print_gaps(&set.gaps, &config);
    Ok(ExitCode::SUCCESS)
}

fn print_scenario(s: &Scenario) {
    let area = if s.area == "main" {
        String::new()
    } else {
        format!(" [{}]", s.area)
    };
    println!("  {}{} (command = {})", s.name, area, s.mode());
    for (name, value) in &s.overrides {
        println!("      {} = {}", name, value);
    }
    for note in &s.notes {
        println!("      # {}", note);
    }
}

fn list_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn print_gaps(gaps: &[CoverageGap], config: &Config) {
    if gaps.is_empty() {
        return;
    }
    let (acknowledged, open) = coverage::partition(gaps, &config.gaps);
    println!();
    println!(
        "Coverage gaps ({}, {} acknowledged):",
        gaps.len(),
        acknowledged.len()
    );
    for gap in open {
        println!("  {}", gap);
    }
    for gap in acknowledged {
        println!("  {} (acknowledged)", gap);
    }
}

// ============================================================================
// generate
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub out: Option<PathBuf>,
    pub check: bool,
    pub deny_gaps: bool,
}

/// Generate test files, or compare them with what is on disk.
pub fn generate(dir: &Path, config_path: Option<&Path>, options: &GenerateOptions) -> CliResult<ExitCode> {
    let config = load_config(dir, config_path)?;
    let source = load(dir)?;
    let generated = pipeline::generate(&source, &config).map_err(|e| CliError::failure(e.to_string()))?;
    for warning in &generated.interface.warnings {
        eprintln!("warning: {}", warning);
    }
    let out_dir = options
        .out
        .clone()
        .unwrap_or_else(|| dir.join(&config.generate.output_dir));

    if options.check {
        let mut outdated = 0;
        for (path, status) in emit::check_files(&generated.files, &out_dir) {
            match status {
                FileStatus::UpToDate => println!("✓ {}", path.display()),
                FileStatus::Missing => {
                    println!("Missing: {}", path.display());
                    outdated += 1;
                }
                FileStatus::Stale(diff) => {
                    println!("--- {}", path.display());
                    print!("{}", diff);
                    println!();
                    outdated += 1;
                }
            }
        }
        print_gaps(&generated.gaps, &config);
        if outdated > 0 {
            return Err(CliError::failure(format!(
                "\n{} file(s) out of date; run `tfscenario generate` to update",
                outdated
            )));
        }
    } else {
        let written = emit::write_files(&generated.files, &out_dir).map_err(|e| CliError::failure(e.to_string()))?;
        for (path, file) in written.iter().zip(&generated.files) {
            println!("Wrote {} ({} run(s))", path.display(), file.runs);
        }
        println!(
            "\n✓ {} scenario(s), {} assertion(s)",
            generated.scenarios.scenarios.len(),
            generated.synthesis.assertion_count()
        );
        print_gaps(&generated.gaps, &config);
    }

    let open = generated.unacknowledged_gaps(&config);
    if (options.deny_gaps || config.gaps.fail_on_unacknowledged) && !open.is_empty() {
        return Err(CliError::new(
            format!("\n{} coverage gap(s) not acknowledged in the config", open.len()),
            ExitCode::UNACKNOWLEDGED_GAPS,
        ));
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// test
// ============================================================================

/// Evaluate generated test files with `terraform test`, plan only.
pub fn test(dir: &Path, config_path: Option<&Path>, options: &RunOptions) -> CliResult<ExitCode> {
    let config = load_config(dir, config_path)?;
    runner::run_tests(dir, &config.generate.output_dir, &config.runner.terraform_bin, options)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MODULE: &str = r#"
variable "environment" {
  type    = string
  default = "dev"
}

output "backup_enabled" {
  value = var.environment == "prod"
}
"#;

    fn module_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.tf"), MODULE).unwrap();
        dir
    }

    #[test]
    fn test_generate_then_check() {
        let dir = module_dir();
        let options = GenerateOptions::default();
        assert_eq!(generate(dir.path(), None, &options).unwrap(), ExitCode::SUCCESS);
        assert!(dir.path().join("tests/main.tftest.hcl").is_file());

        let check = GenerateOptions {
            check: true,
            ..GenerateOptions::default()
        };
        assert_eq!(generate(dir.path(), None, &check).unwrap(), ExitCode::SUCCESS);

        fs::write(dir.path().join("outputs.tf"), "output \"region\" {\n  value = \"eu-west-1\"\n}\n").unwrap();
        let err = generate(dir.path(), None, &check).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
    }

    #[test]
    fn test_deny_gaps_exit_code() {
        let dir = module_dir();
        fs::write(
            dir.path().join("outputs.tf"),
            "resource \"aws_instance\" \"web\" {\n  ami = \"a\"\n}\noutput \"arn\" {\n  value = aws_instance.web.arn\n}\n",
        )
        .unwrap();
        let options = GenerateOptions {
            deny_gaps: true,
            ..GenerateOptions::default()
        };
        let err = generate(dir.path(), None, &options).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::UNACKNOWLEDGED_GAPS);

        fs::write(
            dir.path().join("tfscenario.toml"),
            "[gaps]\nacknowledged = [\"output.arn\"]\n",
        )
        .unwrap();
        assert_eq!(generate(dir.path(), None, &options).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn test_custom_out_dir() {
        let dir = module_dir();
        let out = dir.path().join("generated");
        let options = GenerateOptions {
            out: Some(out.clone()),
            ..GenerateOptions::default()
        };
        generate(dir.path(), None, &options).unwrap();
        assert!(out.join("main.tftest.hcl").is_file());
    }

    #[test]
    fn test_missing_module_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract(dir.path(), false).unwrap_err();
        assert!(err.message.contains("no .tf files"), "{}", err.message);
    }

    #[test]
    fn test_dry_run_after_generate() {
        let dir = module_dir();
        generate(dir.path(), None, &GenerateOptions::default()).unwrap();
        let options = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };
        assert_eq!(test(dir.path(), None, &options).unwrap(), ExitCode::SUCCESS);
    }
}
