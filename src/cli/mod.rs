//! CLI module for tfscenario
//!
//! ## Commands
//!
//! - `extract <dir>` - Print the module's interface summary
//! - `scenarios <dir>` - Print enumerated scenarios and branch coverage
//! - `generate <dir>` - Write `.tftest.hcl` files (or `--check` them)
//! - `test <dir>` - Evaluate generated files with `terraform test`, plan only
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `runner` - Test discovery, plan-only guard, reporting
//! - `runner_interfaces` - The [`runner_interfaces::PlanEvaluator`] boundary
//!
//! ## Design
//!
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod runner;
pub mod runner_interfaces;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use crate::version::TFSCENARIO_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    /// Coverage gaps nobody acknowledged, under `--deny-gaps`.
    pub const UNACKNOWLEDGED_GAPS: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Derive terraform test scenarios from a module's declared interface
#[derive(Parser, Debug)]
#[command(name = "tfscenario")]
#[command(version = TFSCENARIO_VERSION)]
#[command(about = "Derive plan-only terraform test scenarios from a module's interface", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file (default: tfscenario.toml in the module directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // Debug/development flags
    /// Tokenize only (debug)
    #[arg(long = "lex", value_name = "FILE")]
    pub lex_file: Option<PathBuf>,

    /// Parse only (debug)
    #[arg(long = "parse", value_name = "FILE", conflicts_with = "lex_file")]
    pub parse_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the interface summary: inputs, outputs, branches
    Extract {
        #[arg(value_name = "MODULE_DIR", default_value = ".")]
        dir: PathBuf,
        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Print enumerated scenarios, branch coverage and gaps
    Scenarios {
        #[arg(value_name = "MODULE_DIR", default_value = ".")]
        dir: PathBuf,
        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Write one .tftest.hcl file per feature area
    Generate {
        #[arg(value_name = "MODULE_DIR", default_value = ".")]
        dir: PathBuf,
        /// Output directory (default: `generate.output_dir`, relative to the module)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Compare with files on disk instead of writing
        #[arg(long)]
        check: bool,
        /// Exit with code 2 when a coverage gap is not acknowledged in the config
        #[arg(long)]
        deny_gaps: bool,
    },

    /// Evaluate generated test files with terraform test (plan only)
    Test {
        #[arg(value_name = "MODULE_DIR", default_value = ".")]
        dir: PathBuf,
        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
        /// Stop after the first failing file
        #[arg(short = 'x', long = "exitfirst")]
        stop_on_fail: bool,
        /// Only report runs whose name contains EXPR
        #[arg(short = 'k', value_name = "EXPR")]
        filter: Option<String>,
        /// List runs without invoking terraform
        #[arg(long)]
        dry_run: bool,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    // Handle debug flags first
    if let Some(file) = cli.lex_file {
        return commands::lex_file(&file);
    }
    if let Some(file) = cli.parse_file {
        return commands::parse_file(&file);
    }

    let config = cli.config.as_deref();
    match cli.command {
        Some(Command::Extract { dir, json }) => commands::extract(&dir, json),
        Some(Command::Scenarios { dir, json }) => commands::scenarios(&dir, config, json),
        Some(Command::Generate {
            dir,
            out,
            check,
            deny_gaps,
        }) => commands::generate(
            &dir,
            config,
            &commands::GenerateOptions {
                out,
                check,
                deny_gaps,
            },
        ),
        Some(Command::Test {
            dir,
            verbose,
            stop_on_fail,
            filter,
            dry_run,
        }) => commands::test(
            &dir,
            config,
            &runner::RunOptions {
                verbose,
                stop_on_fail,
                filter,
                dry_run,
            },
        ),
        None => Err(CliError::failure("No command given; see `tfscenario --help`")),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_generate() {
        let cli = Cli::try_parse_from(["tfscenario", "generate", "modules/backup", "--check", "--deny-gaps"]).unwrap();
        if let Some(Command::Generate {
            dir,
            out,
            check,
            deny_gaps,
        }) = cli.command
        {
            assert_eq!(dir, PathBuf::from("modules/backup"));
            assert!(out.is_none());
            assert!(check);
            assert!(deny_gaps);
        } else {
            panic!("Expected Generate command");
        }
    }

    #[test]
    fn test_cli_parse_test() {
        let cli = Cli::try_parse_from(["tfscenario", "test", ".", "-v", "-x", "-k", "prod", "--dry-run"]).unwrap();
        if let Some(Command::Test {
            verbose,
            stop_on_fail,
            filter,
            dry_run,
            ..
        }) = cli.command
        {
            assert!(verbose);
            assert!(stop_on_fail);
            assert!(dry_run);
            assert_eq!(filter.as_deref(), Some("prod"));
        } else {
            panic!("Expected Test command");
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["tfscenario", "extract", "m", "--json", "--config", "ci.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("ci.toml")));
        assert!(matches!(cli.command, Some(Command::Extract { json: true, .. })));
    }

    #[test]
    fn test_cli_parse_debug_flags() {
        let cli = Cli::try_parse_from(["tfscenario", "--lex", "main.tf"]).unwrap();
        assert!(cli.lex_file.is_some());

        let cli = Cli::try_parse_from(["tfscenario", "--parse", "main.tf"]).unwrap();
        assert!(cli.parse_file.is_some());
    }

    #[test]
    fn test_no_command_is_an_error() {
        let cli = Cli::try_parse_from(["tfscenario"]).unwrap();
        let err = execute(cli).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
    }
}
