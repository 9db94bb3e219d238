//! Token types for the HCL lexer.
//!
//! HCL has no reserved words: `true`, `false`, `null`, `for`, `in` and `if`
//! are identifiers that the parser interprets by position.

use crate::ast::Span;

// ============================================================================
// TOKEN TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorId {
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Question,
    Colon,
    FatArrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunctuationId {
    Eq,
    Comma,
    Dot,
    Ellipsis,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
}

/// Kind of token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Operator(OperatorId),
    Punctuation(PunctuationId),

    // ========== Identifiers and Literals ==========
    Ident(String),
    Number(f64),
    /// Quoted string or heredoc; interpolations are kept as raw source.
    Template(Vec<TemplatePiece>),

    // ========== Layout ==========
    Newline,
    Eof,
}

/// Part of a template token.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePiece {
    Literal(String),
    /// Raw interpolation source and the byte offset where it starts in the file.
    Interp(String, usize),
}

impl TokenKind {
    pub fn is_operator(&self, id: OperatorId) -> bool {
        matches!(self, TokenKind::Operator(o) if *o == id)
    }

    pub fn is_punctuation(&self, id: PunctuationId) -> bool {
        matches!(self, TokenKind::Punctuation(p) if *p == id)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(self, TokenKind::Ident(s) if s == name)
    }
}

/// A token with its kind and source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}
