//! Lexer for the HCL subset
//!
//! Handles tokenization including:
//! - Identifiers (HCL identifiers may contain `-`) and numbers
//! - Quoted templates and heredocs, keeping `${...}` interpolations as raw source
//! - Operators and punctuation (`==`, `&&`, `=>`, `...`, ...)
//! - Comments (`#`, `//`, `/* */`)
//!
//! ## Module Structure
//!
//! - `tokens` - Token types (TokenKind, Token, TemplatePiece)
//! - `strings` - Quoted template / heredoc scanning
//! - `numbers` - Numeric literal scanning

mod numbers;
mod strings;
pub mod tokens;

pub use tokens::{OperatorId, PunctuationId, TemplatePiece, Token, TokenKind};

use crate::ast::Span;
use crate::diagnostics::CompileError;

// ============================================================================
// LEXER STATE
// ----------------------------------------------------------------------------
// Newlines terminate attributes and block headers, so they are significant at
// the body level and inside `{ }` (object items are newline-separated). Inside
// `( )` and `[ ]` they are insignificant and dropped:
//
//   [body] → see '(' or '[' → [suppress newlines] → see ')' or ']' → [body]
//   [body] → see '{'        → [emit newlines]     → see '}'        → [body]
// ============================================================================

/// Lexer for HCL source text.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    /// Open brackets, innermost last.
    brackets: Vec<PunctuationId>,
    tokens: Vec<Token>,
    errors: Vec<CompileError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            brackets: Vec::new(),
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source.
    ///
    /// The token stream always ends with `Newline` (if the last line had content) and `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<CompileError>> {
        while !self.is_at_end() {
            self.scan_token();
        }

        if let Some(open) = self.brackets.last() {
            self.errors.push(CompileError::syntax(
                format!("Unclosed {:?} at end of file", open),
                Span::new(self.current_pos, self.current_pos),
            ));
        }

        self.push_newline(self.current_pos);
        self.tokens
            .push(Token::new(TokenKind::Eof, Span::new(self.current_pos, self.current_pos)));

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    // ========================================================================
    // Core character handling
    // ========================================================================

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.source[self.current_pos..].chars();
        iter.next(); // skip current
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((pos, c)) = self.chars.next() {
            self.current_pos = pos + c.len_utf8();
            Some(c)
        } else {
            None
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ========================================================================
    // Main scanning dispatch
    // ========================================================================

    fn scan_token(&mut self) {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' || c == '\r' {
                self.advance();
            } else {
                break;
            }
        }

        let start = self.current_pos;
        let Some(c) = self.advance() else {
            return;
        };

        match c {
            '#' => self.skip_line_comment(),
            '/' if self.peek() == Some('/') => self.skip_line_comment(),
            '/' if self.peek() == Some('*') => self.skip_block_comment(start),
            '\n' => {
                if self.newlines_significant() {
                    self.push_newline(start);
                }
            }

            '+' => self.add_op(OperatorId::Plus, start),
            '-' => self.add_op(OperatorId::Minus, start),
            '*' => self.add_op(OperatorId::Star, start),
            '/' => self.add_op(OperatorId::Slash, start),
            '%' => self.add_op(OperatorId::Percent, start),
            '?' => self.add_op(OperatorId::Question, start),
            ':' => self.add_op(OperatorId::Colon, start),
            ',' => self.add_punct(PunctuationId::Comma, start),
            '(' => self.open_bracket(PunctuationId::LParen, start),
            ')' => self.close_bracket(PunctuationId::LParen, PunctuationId::RParen, start),
            '[' => self.open_bracket(PunctuationId::LBracket, start),
            ']' => self.close_bracket(PunctuationId::LBracket, PunctuationId::RBracket, start),
            '{' => self.open_bracket(PunctuationId::LBrace, start),
            '}' => self.close_bracket(PunctuationId::LBrace, PunctuationId::RBrace, start),
            '=' => {
                if self.match_char('=') {
                    self.add_op(OperatorId::EqEq, start);
                } else if self.match_char('>') {
                    self.add_op(OperatorId::FatArrow, start);
                } else {
                    self.add_punct(PunctuationId::Eq, start);
                }
            }
            '!' => {
                if self.match_char('=') {
                    self.add_op(OperatorId::NotEq, start);
                } else {
                    self.add_op(OperatorId::Bang, start);
                }
            }
            '<' => {
                if self.peek() == Some('<') {
                    self.advance();
                    self.scan_heredoc(start);
                } else if self.match_char('=') {
                    self.add_op(OperatorId::LtEq, start);
                } else {
                    self.add_op(OperatorId::Lt, start);
                }
            }
            '>' => {
                if self.match_char('=') {
                    self.add_op(OperatorId::GtEq, start);
                } else {
                    self.add_op(OperatorId::Gt, start);
                }
            }
            '&' => {
                if self.match_char('&') {
                    self.add_op(OperatorId::AndAnd, start);
                } else {
                    self.unexpected('&', start);
                }
            }
            '|' => {
                if self.match_char('|') {
                    self.add_op(OperatorId::OrOr, start);
                } else {
                    self.unexpected('|', start);
                }
            }
            '.' => {
                if self.peek() == Some('.') && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    self.add_punct(PunctuationId::Ellipsis, start);
                } else {
                    self.add_punct(PunctuationId::Dot, start);
                }
            }

            '"' => self.scan_quoted(start),

            '0'..='9' => self.scan_number(start),

            _ if is_ident_start(c) => self.scan_identifier(start),

            _ => self.unexpected(c, start),
        }
    }

    fn unexpected(&mut self, c: char, start: usize) {
        self.errors.push(CompileError::syntax(
            format!("Unexpected character '{}'", c),
            Span::new(start, self.current_pos),
        ));
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self, start: usize) {
        self.advance(); // '*'
        loop {
            match self.advance() {
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    return;
                }
                Some(_) => {}
                None => {
                    self.errors.push(CompileError::syntax(
                        "Unterminated block comment".to_string(),
                        Span::new(start, self.current_pos),
                    ));
                    return;
                }
            }
        }
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn add_token(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token::new(kind, Span::new(start, self.current_pos)));
    }

    fn add_op(&mut self, id: OperatorId, start: usize) {
        self.add_token(TokenKind::Operator(id), start);
    }

    fn add_punct(&mut self, id: PunctuationId, start: usize) {
        self.add_token(TokenKind::Punctuation(id), start);
    }

    fn newlines_significant(&self) -> bool {
        !matches!(
            self.brackets.last(),
            Some(PunctuationId::LParen) | Some(PunctuationId::LBracket)
        )
    }

    /// Emit a newline unless the previous token already ends a line.
    fn push_newline(&mut self, start: usize) {
        let redundant = matches!(self.tokens.last(), None | Some(Token { kind: TokenKind::Newline, .. }));
        if !redundant {
            self.tokens
                .push(Token::new(TokenKind::Newline, Span::new(start, start + 1)));
        }
    }

    fn open_bracket(&mut self, kind: PunctuationId, start: usize) {
        self.brackets.push(kind);
        self.add_punct(kind, start);
    }

    /// Emit a closing bracket, checking it matches the innermost open bracket.
    fn close_bracket(&mut self, opener: PunctuationId, kind: PunctuationId, start: usize) {
        match self.brackets.last() {
            Some(open) if *open == opener => {
                self.brackets.pop();
            }
            _ => {
                self.errors.push(CompileError::syntax(
                    "Unmatched closing bracket".to_string(),
                    Span::new(start, self.current_pos),
                ));
            }
        }
        self.add_punct(kind, start);
    }

    // ========================================================================
    // Identifier scanning
    // ========================================================================

    fn scan_identifier(&mut self, start: usize) {
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                self.advance();
            } else {
                break;
            }
        }
        let spelling = &self.source[start..self.current_pos];
        self.add_token(TokenKind::Ident(spelling.to_string()), start);
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Convenience function to lex a source string.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn lex(source: &str) -> Result<Vec<Token>, Vec<CompileError>> {
    Lexer::new(source).tokenize()
}
