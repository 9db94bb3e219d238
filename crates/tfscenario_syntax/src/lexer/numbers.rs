//! Number scanning for the HCL lexer

use super::Lexer;
use super::tokens::{PunctuationId, TokenKind};
use crate::ast::Span;
use crate::diagnostics::CompileError;

impl<'a> Lexer<'a> {
    /// Scan a number; the first digit has been consumed.
    pub(super) fn scan_number(&mut self, start: usize) {
        // `list.0.name` is a legacy index traversal, not a decimal.
        let after_dot = matches!(
            self.tokens.last(),
            Some(t) if t.kind.is_punctuation(PunctuationId::Dot)
        );

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if !after_dot && self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if !after_dot && matches!(self.peek(), Some('e') | Some('E')) {
            let mut lookahead = self.source[self.current_pos..].chars().skip(1);
            let next = lookahead.next();
            let exponent = match next {
                Some('+') | Some('-') => lookahead.next().is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exponent {
                self.advance();
                if matches!(self.peek(), Some('+') | Some('-')) {
                    self.advance();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text = &self.source[start..self.current_pos];
        match text.parse::<f64>() {
            Ok(n) => self.add_token(TokenKind::Number(n), start),
            Err(_) => self.errors.push(CompileError::syntax(
                format!("Invalid number literal: {}", text),
                Span::new(start, self.current_pos),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::lex;
    use super::*;

    #[test]
    fn test_numbers() {
        let tokens = lex("1 2.5 1e3 4E-2").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number(1.0));
        assert_eq!(tokens[1].kind, TokenKind::Number(2.5));
        assert_eq!(tokens[2].kind, TokenKind::Number(1000.0));
        assert_eq!(tokens[3].kind, TokenKind::Number(0.04));
    }

    #[test]
    fn test_legacy_index_after_dot_is_not_decimal() {
        let tokens = lex("a.0.1").unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Number(0.0));
        assert!(tokens[3].kind.is_punctuation(PunctuationId::Dot));
        assert_eq!(tokens[4].kind, TokenKind::Number(1.0));
    }
}
