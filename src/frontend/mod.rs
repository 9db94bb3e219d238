//! Terraform frontend
//!
//! - `lexer`, `parser`, `ast`, `diagnostics`: the shared `tfscenario_syntax` crate
//! - `module`: loading and parsing a module directory

// Syntax components are provided by the shared tfscenario_syntax crate.
pub use tfscenario_syntax::{ast, diagnostics, lexer, parser};

pub mod module;
