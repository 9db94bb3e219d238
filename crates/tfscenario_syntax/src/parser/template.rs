/// Template parsing.
///
/// The lexer keeps each `${ ... }` interpolation as raw source plus the file
/// offset where it starts. Here each one is lexed and parsed as a standalone
/// expression, and the resulting spans are shifted back into file coordinates.
impl<'a> Parser<'a> {
    fn template(&mut self, pieces: &[TemplatePiece]) -> Result<Expr, CompileError> {
        if let [TemplatePiece::Literal(s)] = pieces {
            return Ok(Expr::Literal(Literal::String(s.clone())));
        }

        let mut parts = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match piece {
                TemplatePiece::Literal(s) => parts.push(TemplatePart::Literal(s.clone())),
                TemplatePiece::Interp(raw, offset) => {
                    match parse_interpolation(raw, *offset) {
                        Ok(expr) => parts.push(TemplatePart::Interp(expr)),
                        Err(errors) => {
                            let mut errors = errors.into_iter();
                            let first = errors.next().unwrap_or_else(|| {
                                CompileError::syntax("Invalid interpolation".to_string(), Span::new(*offset, *offset))
                            });
                            self.errors.extend(errors);
                            return Err(first);
                        }
                    }
                }
            }
        }
        Ok(Expr::Template(parts))
    }
}

fn parse_interpolation(raw: &str, offset: usize) -> Result<Spanned<Expr>, Vec<CompileError>> {
    let shift = |mut e: CompileError| {
        e.span = e.span.offset(offset);
        e
    };

    let tokens: Vec<Token> = lexer::lex(raw)
        .map_err(|errors| errors.into_iter().map(shift).collect::<Vec<_>>())?
        .into_iter()
        .map(|t| Token::new(t.kind, t.span.offset(offset)))
        .collect();

    if tokens.iter().all(|t| matches!(t.kind, TokenKind::Newline | TokenKind::Eof)) {
        return Err(vec![CompileError::syntax(
            "Empty interpolation".to_string(),
            Span::new(offset, offset + raw.len()),
        )]);
    }

    Parser::new(&tokens).parse_expression()
}
