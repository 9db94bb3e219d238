//! Generator configuration (`tfscenario.toml`)
//!
//! Resolution order: an explicit `--config` path, then `TFSCENARIO_CONFIG`, then
//! `tfscenario.toml` in the module directory. When none of these exist the
//! defaults apply. Unknown keys are rejected.
//!
//! ```toml
//! [generate]
//! output_dir = "tests"
//! outputs = ["backup_enabled"]
//!
//! [gaps]
//! acknowledged = ["output.bucket_arn"]
//!
//! [[areas]]
//! name = "networking"
//! inputs = ["access_list_*", "vpc_*"]
//! ```
//!
//! Gap subjects and area inputs are glob patterns (`*`, `?`, `{a,b}`) compiled with
//! `globset`. Square brackets match themselves, so `output.ready[true]` can be
//! acknowledged as written.

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use thiserror::Error;

use crate::ast::is_identifier;

// ============================================================================
// Limits
// ============================================================================

const DEFAULT_CONFIG_NAME: &str = "tfscenario.toml";
pub const CONFIG_ENV_VAR: &str = "TFSCENARIO_CONFIG";
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
const MAX_COMBINATIONS_LIMIT: usize = 4096;
const MAX_ENTRY_ASSERTIONS_LIMIT: usize = 256;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error ({path}): {message}")]
    Io { path: PathBuf, message: String },
    #[error("config parse error ({path}): {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration types
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub generate: GenerateConfig,
    #[serde(default)]
    pub gaps: GapsConfig,
    #[serde(default)]
    pub areas: Vec<AreaConfig>,
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Where the configuration was read from, if anywhere.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateConfig {
    /// Directory (relative to the module) that receives `*.tftest.hcl` files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Outputs to assert on; empty means every non-sensitive output.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Fold independent branch drivers into shared scenarios.
    #[serde(default = "default_true")]
    pub combine_independent_branches: bool,
    /// Upper bound on candidate assignments tried per branch requirement.
    #[serde(default = "default_max_combinations")]
    pub max_combinations: usize,
    /// Per-element assertions emitted for a collection output.
    #[serde(default = "default_max_entry_assertions")]
    pub max_entry_assertions: usize,
    #[serde(default = "default_true")]
    pub assert_resource_counts: bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            outputs: Vec::new(),
            combine_independent_branches: true,
            max_combinations: default_max_combinations(),
            max_entry_assertions: default_max_entry_assertions(),
            assert_resource_counts: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GapsConfig {
    /// Gap subjects (`output.bucket_arn`, `aws_s3_bucket.*`) reviewed by a human.
    #[serde(default)]
    pub acknowledged: Vec<String>,
    #[serde(default)]
    pub fail_on_unacknowledged: bool,
    /// Compiled on first match.
    #[serde(skip)]
    pub(crate) matcher: OnceLock<GlobSet>,
}

impl GapsConfig {
    pub fn is_acknowledged(&self, subject: &str) -> bool {
        self.matcher.get_or_init(|| lenient_set(&self.acknowledged)).is_match(subject)
    }
}

/// A feature area: scenarios driven by matching inputs land in `<name>.tftest.hcl`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaConfig {
    pub name: String,
    pub inputs: Vec<String>,
    #[serde(skip)]
    matcher: OnceLock<GlobSet>,
}

impl AreaConfig {
    pub fn matches(&self, input: &str) -> bool {
        self.matcher.get_or_init(|| lenient_set(&self.inputs)).is_match(input)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    #[serde(default = "default_terraform_bin")]
    pub terraform_bin: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            terraform_bin: default_terraform_bin(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("tests")
}

fn default_true() -> bool {
    true
}

fn default_max_combinations() -> usize {
    256
}

fn default_max_entry_assertions() -> usize {
    8
}

fn default_terraform_bin() -> String {
    "terraform".to_string()
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration for a module directory.
    ///
    /// ## Errors
    /// Returns [`ConfigError`] when an explicitly requested file is missing, too large,
    /// malformed, or fails validation.
    pub fn load(module_dir: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => match env::var(CONFIG_ENV_VAR) {
                Ok(p) if !p.trim().is_empty() => Some(PathBuf::from(p)),
                _ => {
                    let candidate = module_dir.join(DEFAULT_CONFIG_NAME);
                    candidate.is_file().then_some(candidate)
                }
            },
        };

        let Some(path) = path else {
            tracing::debug!("no config file found; using defaults");
            return Ok(Self::default());
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let io_err = |message: String| ConfigError::Io {
            path: path.to_path_buf(),
            message,
        };
        let bytes = fs::read(path).map_err(|e| io_err(e.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "{} exceeds the {} byte size limit",
                path.display(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let content =
            std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;

        let mut config = Self::from_toml(content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        config.source = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from(DEFAULT_CONFIG_NAME),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check limits and internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.generate;
        if g.max_combinations == 0 || g.max_combinations > MAX_COMBINATIONS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "generate.max_combinations must be between 1 and {}",
                MAX_COMBINATIONS_LIMIT
            )));
        }
        if g.max_entry_assertions > MAX_ENTRY_ASSERTIONS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "generate.max_entry_assertions must be at most {}",
                MAX_ENTRY_ASSERTIONS_LIMIT
            )));
        }
        if g.output_dir.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(ConfigError::Invalid(format!(
                "generate.output_dir '{}' must not contain '..'",
                g.output_dir.display()
            )));
        }
        if g.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("generate.output_dir must not be empty".to_string()));
        }

        let mut seen = Vec::new();
        for area in &self.areas {
            if !is_identifier(&area.name) {
                return Err(ConfigError::Invalid(format!(
                    "area name '{}' must be an identifier",
                    area.name
                )));
            }
            if area.name == "main" {
                return Err(ConfigError::Invalid("area name 'main' is reserved".to_string()));
            }
            if seen.contains(&area.name.as_str()) {
                return Err(ConfigError::Invalid(format!("area '{}' is defined more than once", area.name)));
            }
            if area.inputs.is_empty() || area.inputs.iter().any(|p| p.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "area '{}' needs at least one non-empty input pattern",
                    area.name
                )));
            }
            compile_patterns(&area.inputs)
                .map_err(|e| ConfigError::Invalid(format!("areas.{}.inputs: {}", area.name, e)))?;
            seen.push(area.name.as_str());
        }
        compile_patterns(&self.gaps.acknowledged)
            .map_err(|e| ConfigError::Invalid(format!("gaps.acknowledged: {}", e)))?;
        Ok(())
    }

    // ========================================================================
    // Builder-style setters
    // ========================================================================

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.generate.output_dir = dir.into();
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<String>) -> Self {
        self.generate.outputs = outputs;
        self
    }

    pub fn with_combine_independent_branches(mut self, combine: bool) -> Self {
        self.generate.combine_independent_branches = combine;
        self
    }

    pub fn with_max_combinations(mut self, max: usize) -> Self {
        self.generate.max_combinations = max;
        self
    }

    pub fn with_area(mut self, name: &str, inputs: &[&str]) -> Self {
        self.areas.push(AreaConfig {
            name: name.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            matcher: OnceLock::new(),
        });
        self
    }

    pub fn with_acknowledged_gap(mut self, subject: &str) -> Self {
        self.gaps.acknowledged.push(subject.to_string());
        self.gaps.matcher = OnceLock::new();
        self
    }

    /// Area for an input name; `main` when no `[[areas]]` entry matches.
    pub fn area_for(&self, input: &str) -> Option<&str> {
        self.areas.iter().find(|a| a.matches(input)).map(|a| a.name.as_str())
    }
}

// ============================================================================
// Patterns
// ============================================================================

/// One pattern as a glob, with `[` and `]` taken literally.
fn pattern_glob(pattern: &str) -> Result<Glob, globset::Error> {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '[' => escaped.push_str("[[]"),
            ']' => escaped.push_str("[]]"),
            c => escaped.push(c),
        }
    }
    Glob::new(&escaped)
}

/// Compile patterns into one set.
///
/// ## Errors
/// Reports the first pattern that is not a valid glob, e.g. an unclosed `{`.
pub fn compile_patterns(patterns: &[String]) -> Result<GlobSet, String> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = pattern_glob(pattern).map_err(|e| format!("invalid pattern '{}': {}", pattern, e.kind()))?;
        builder.add(glob);
    }
    builder.build().map_err(|e| e.to_string())
}

/// Like [`compile_patterns`], skipping invalid patterns. `validate` reports those.
fn lenient_set(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match pattern_glob(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => tracing::warn!(pattern = %pattern, error = %e, "ignoring invalid pattern"),
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}
