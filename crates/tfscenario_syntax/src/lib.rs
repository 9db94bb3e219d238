//! Syntax frontend for Terraform configuration and test files: lexer, parser, AST, diagnostics.
//!
//! Covers the native HCL syntax used by `*.tf` and `*.tftest.hcl` files: attributes,
//! labelled blocks, and the full expression language (templates, heredocs, `for`
//! expressions, splats, conditionals).
//!
//! ## Notes
//! - This crate is syntax-only: it does not know what a `variable` or `resource` block means.
//! - Template directives (`%{ if }`, `%{ for }`) are rejected with a diagnostic.
//!
//! ## Examples
//! ```rust,no_run
//! use tfscenario_syntax::{lexer, parser};
//!
//! let tokens = lexer::lex("locals {\n  enabled = true\n}\n").unwrap();
//! let body = parser::parse(&tokens).unwrap();
//! assert_eq!(body.blocks_of("locals").count(), 1);
//! ```

pub mod ast;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
