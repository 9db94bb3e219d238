/// Token-stream helpers and error recovery.
///
/// Peeking and consuming tokens, matching punctuation/operators, and
/// `synchronize`, which skips to the end of the current line without escaping
/// the enclosing block.
impl<'a> Parser<'a> {
    // ========================================================================
    // Helpers
    // ========================================================================

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek_next(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + 1).min(last)]
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.pos += 1;
        }
        &self.tokens[self.pos - 1]
    }

    fn previous_span(&self) -> Span {
        if self.pos == 0 {
            self.current_span()
        } else {
            self.tokens[self.pos - 1].span
        }
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    fn check_punct(&self, id: PunctuationId) -> bool {
        self.peek().kind.is_punctuation(id)
    }

    fn check_op(&self, id: OperatorId) -> bool {
        self.peek().kind.is_operator(id)
    }

    fn check_ident(&self, name: &str) -> bool {
        self.peek().kind.is_ident(name)
    }

    fn check_newline(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Newline)
    }

    fn match_punct(&mut self, id: PunctuationId) -> bool {
        if self.check_punct(id) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_op(&mut self, id: OperatorId) -> bool {
        if self.check_op(id) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, id: PunctuationId, msg: &str) -> Result<Span, CompileError> {
        if self.check_punct(id) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(msg))
        }
    }

    fn expect_op(&mut self, id: OperatorId, msg: &str) -> Result<Span, CompileError> {
        if self.check_op(id) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(msg))
        }
    }

    fn expect_ident(&mut self, name: &str, msg: &str) -> Result<Span, CompileError> {
        if self.check_ident(name) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(msg))
        }
    }

    fn identifier(&mut self) -> Result<Ident, CompileError> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("Expected identifier")),
        }
    }

    fn unexpected(&self, msg: &str) -> CompileError {
        CompileError::syntax(format!("{}, found {}", msg, describe(&self.peek().kind)), self.current_span())
    }

    fn skip_newlines(&mut self) {
        while self.check_newline() {
            self.advance();
        }
    }

    /// Skip to the start of the next line, staying inside the current block.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        while !self.is_at_end() {
            match &self.peek().kind {
                TokenKind::Newline if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::Punctuation(PunctuationId::LBrace) => depth += 1,
                TokenKind::Punctuation(PunctuationId::RBrace) => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            self.advance();
        }
    }
}

/// Human-readable token description for error messages.
fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(name) => format!("identifier '{}'", name),
        TokenKind::Number(n) => format!("number {}", format_number(*n)),
        TokenKind::Template(_) => "string".to_string(),
        TokenKind::Newline => "end of line".to_string(),
        TokenKind::Eof => "end of file".to_string(),
        TokenKind::Operator(op) => format!("operator {:?}", op),
        TokenKind::Punctuation(p) => format!("{:?}", p),
    }
}
