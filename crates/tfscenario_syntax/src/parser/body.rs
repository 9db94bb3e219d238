/// Structural parsing: bodies, attributes and blocks.
///
/// ```text
/// body      := (item NEWLINE)*
/// item      := IDENT '=' expr | IDENT label* '{' body '}'
/// label     := IDENT | STRING
/// ```
///
/// A block may be written on one line (`variable "x" { default = 1 }`) as
/// long as it holds at most one attribute.
impl<'a> Parser<'a> {
    // ========================================================================
    // Bodies
    // ========================================================================

    /// Parse items until `}` (when `nested`) or end of file.
    fn body(&mut self, nested: bool) -> Body {
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            if self.is_at_end() || self.check_punct(PunctuationId::RBrace) {
                break;
            }

            match self.item() {
                Ok(item) => {
                    items.push(item);
                    if !self.check_newline()
                        && !self.is_at_end()
                        && !(nested && self.check_punct(PunctuationId::RBrace))
                    {
                        let err = self.unexpected("Expected newline after item");
                        self.errors.push(err);
                        self.synchronize();
                    }
                }
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }
        Body { items }
    }

    fn item(&mut self) -> Result<Spanned<Item>, CompileError> {
        let start = self.current_span();
        let name = self.identifier()?;

        if self.match_punct(PunctuationId::Eq) {
            let value = self.expression()?;
            let span = start.merge(value.span);
            return Ok(Spanned::new(Item::Attribute(Attribute { name, value }), span));
        }

        let mut labels = Vec::new();
        loop {
            match &self.peek().kind {
                TokenKind::Ident(label) => {
                    labels.push(label.clone());
                    self.advance();
                }
                TokenKind::Template(pieces) => {
                    let label = match pieces.as_slice() {
                        [TemplatePiece::Literal(s)] => s.clone(),
                        _ => {
                            return Err(CompileError::syntax(
                                "Block labels cannot contain interpolations".to_string(),
                                self.current_span(),
                            ));
                        }
                    };
                    labels.push(label);
                    self.advance();
                }
                _ => break,
            }
        }

        if !self.check_punct(PunctuationId::LBrace) {
            let mut err = self.unexpected(&format!("Expected '=' or '{{' after '{}'", name));
            if labels.is_empty() {
                err = err.with_hint("Attributes are written as `name = value`");
            }
            return Err(err);
        }
        self.advance();

        let body = self.body(true);
        let end = self.expect_punct(PunctuationId::RBrace, &format!("Expected '}}' to close '{}' block", name))?;

        Ok(Spanned::new(
            Item::Block(Block { kind: name, labels, body }),
            start.merge(end),
        ))
    }
}
