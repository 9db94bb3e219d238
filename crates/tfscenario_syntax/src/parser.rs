//! Parser for the HCL subset
//!
//! Converts a token stream into a [`Body`] of attributes and blocks.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use tfscenario_syntax::{lexer, parser};
//!
//! let source = "variable \"region\" {\n  default = \"eu-west-1\"\n}\n";
//! let tokens = lexer::lex(source).unwrap();
//! let body = parser::parse(&tokens).unwrap();
//! assert_eq!(body.blocks_of("variable").count(), 1);
//! ```

use crate::ast::*;
use crate::diagnostics::CompileError;
use crate::lexer::{self, OperatorId, PunctuationId, TemplatePiece, Token, TokenKind};

// NOTE: This module is split across multiple files using `include!` to keep all parser
// methods in the same Rust module (preserving privacy + call patterns) while avoiding
// a single large source file.

include!("parser/core.rs");
include!("parser/helpers.rs");
include!("parser/body.rs");
include!("parser/expr.rs");
include!("parser/template.rs");
include!("parser/api.rs");
include!("parser/tests.rs");
