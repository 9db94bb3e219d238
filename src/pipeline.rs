//! The linear pipeline: extract → enumerate → synthesize → render.
//!
//! Each stage is a pure function of the previous stage's output and the config;
//! only [`generate_dir`] touches the filesystem, and only to read the module.

use std::path::Path;

use crate::config::Config;
use crate::coverage::{self, CoverageGap};
use crate::emit::{self, EmitInput, TestFile};
use crate::frontend::module::{ModuleError, ModuleSource, load_module};
use crate::interface::{self, ModuleInterface};
use crate::scenario::{self, ScenarioSet};
use crate::synth::{self, Synthesis};

/// Everything produced for one module.
#[derive(Debug)]
pub struct Generated {
    pub interface: ModuleInterface,
    pub scenarios: ScenarioSet,
    pub synthesis: Synthesis,
    /// Enumeration gaps followed by synthesis gaps.
    pub gaps: Vec<CoverageGap>,
    pub files: Vec<TestFile>,
}

impl Generated {
    /// Gaps not acknowledged in the config.
    pub fn unacknowledged_gaps<'a>(&'a self, config: &Config) -> Vec<&'a CoverageGap> {
        coverage::partition(&self.gaps, &config.gaps).1
    }
}

/// Run every stage over an already loaded module.
///
/// ## Errors
/// Returns [`ModuleError::Interface`] when the module's declarations are inconsistent.
#[tracing::instrument(skip_all, fields(module = %source.name))]
pub fn generate(source: &ModuleSource, config: &Config) -> Result<Generated, ModuleError> {
    let interface = interface::extract(source)?;
    for warning in &interface.warnings {
        tracing::warn!("{}", warning);
    }
    let scenarios = scenario::enumerate(&interface, config);
    let synthesis = synth::synthesize(&interface, &scenarios, config);

    let mut gaps = scenarios.gaps.clone();
    gaps.extend(synthesis.gaps.iter().cloned());

    let files = emit::render(&EmitInput {
        module: &interface.name,
        set: &scenarios,
        synthesis: &synthesis,
        gaps: &gaps,
        config,
    });
    tracing::info!(
        scenarios = scenarios.scenarios.len(),
        assertions = synthesis.assertion_count(),
        gaps = gaps.len(),
        files = files.len(),
        "generation complete"
    );

    Ok(Generated {
        interface,
        scenarios,
        synthesis,
        gaps,
        files,
    })
}

/// Load the module in `dir` and run every stage.
///
/// ## Errors
/// Returns [`ModuleError`] when the module cannot be read, parsed or extracted.
pub fn generate_dir(dir: &Path, config: &Config) -> Result<Generated, ModuleError> {
    let source = load_module(dir)?;
    generate(&source, config)
}
