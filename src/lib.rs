#![forbid(unsafe_code)]
//! tfscenario: derive `terraform test` scenarios from a module's declared interface.
//!
//! The pipeline is linear and offline:
//!
//! 1. [`interface`] reads `variable`, `output`, `locals` and `resource` blocks into a
//!    [`interface::ModuleInterface`], including the conditional branches inputs drive.
//! 2. [`scenario`] proposes input value sets: the declared defaults, both outcomes of
//!    every branch, and documented edge values.
//! 3. [`synth`] evaluates every output of interest per scenario with the bounded
//!    evaluator in [`eval`] and turns known values into assertions.
//! 4. [`emit`] writes one `.tftest.hcl` file per feature area, every run with
//!    `command = plan`.
//!
//! What cannot be asserted under plan is reported as a [`coverage::CoverageGap`].
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module
//!   enforces `#![deny(clippy::unwrap_used)]`.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod coverage;
pub mod emit;
pub mod eval;
pub mod frontend;
pub mod interface;
pub mod pipeline;
pub mod scenario;
pub mod synth;
pub mod version;

pub use frontend::ast;
pub use frontend::diagnostics;
pub use frontend::lexer;
pub use frontend::parser;

pub use config::Config;
pub use pipeline::{Generated, generate, generate_dir};
