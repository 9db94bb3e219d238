/// Expression parsing methods.
///
/// This chunk implements the expression grammar using a precedence ladder:
/// conditional → `||` → `&&` → equality → comparison → additive → multiplicative → unary → postfix → primary.
///
/// ## Notes
/// - `true`, `false`, `null` and `for` are plain identifiers in the token stream and are
///   recognised here by position.
/// - Newlines are only significant inside `{ }`; object and `for` parsing skip them
///   between items and clauses.
impl<'a> Parser<'a> {
    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self) -> Result<Spanned<Expr>, CompileError> {
        self.conditional()
    }

    fn conditional(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let cond = self.or_expr()?;
        if !self.match_op(OperatorId::Question) {
            return Ok(cond);
        }
        let then = self.expression()?;
        self.expect_op(OperatorId::Colon, "Expected ':' in conditional expression")?;
        let otherwise = self.expression()?;
        let span = cond.span.merge(otherwise.span);
        Ok(Spanned::new(
            Expr::Conditional {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            span,
        ))
    }

    fn or_expr(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let mut left = self.and_expr()?;
        while self.match_op(OperatorId::OrOr) {
            let right = self.and_expr()?;
            left = binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let mut left = self.equality()?;
        while self.match_op(OperatorId::AndAnd) {
            let right = self.equality()?;
            left = binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let mut left = self.comparison()?;
        loop {
            let op = if self.match_op(OperatorId::EqEq) {
                BinaryOp::Eq
            } else if self.match_op(OperatorId::NotEq) {
                BinaryOp::NotEq
            } else {
                break;
            };
            let right = self.comparison()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let mut left = self.additive()?;
        loop {
            let op = if self.match_op(OperatorId::Lt) {
                BinaryOp::Lt
            } else if self.match_op(OperatorId::LtEq) {
                BinaryOp::LtEq
            } else if self.match_op(OperatorId::Gt) {
                BinaryOp::Gt
            } else if self.match_op(OperatorId::GtEq) {
                BinaryOp::GtEq
            } else {
                break;
            };
            let right = self.additive()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = if self.match_op(OperatorId::Plus) {
                BinaryOp::Add
            } else if self.match_op(OperatorId::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.multiplicative()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let mut left = self.unary()?;
        loop {
            let op = if self.match_op(OperatorId::Star) {
                BinaryOp::Mul
            } else if self.match_op(OperatorId::Slash) {
                BinaryOp::Div
            } else if self.match_op(OperatorId::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };
            let right = self.unary()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let start = self.current_span();
        if self.match_op(OperatorId::Bang) {
            let operand = self.unary()?;
            let span = start.merge(operand.span);
            return Ok(Spanned::new(Expr::Unary(UnaryOp::Not, Box::new(operand)), span));
        }
        if self.match_op(OperatorId::Minus) {
            // Fold `-3` into a literal so constants stay comparable.
            if let TokenKind::Number(n) = self.peek().kind {
                let span = start.merge(self.advance().span);
                let lit = Spanned::new(Expr::Literal(Literal::Number(-n)), span);
                return self.postfix_tail(lit);
            }
            let operand = self.unary()?;
            let span = start.merge(operand.span);
            return Ok(Spanned::new(Expr::Unary(UnaryOp::Neg, Box::new(operand)), span));
        }
        self.postfix()
    }

    // ========================================================================
    // Postfix: traversals, indexes, splats
    // ========================================================================

    fn postfix(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let base = self.primary()?;
        self.postfix_tail(base)
    }

    fn postfix_tail(&mut self, mut expr: Spanned<Expr>) -> Result<Spanned<Expr>, CompileError> {
        loop {
            if self.check_punct(PunctuationId::Dot) {
                match &self.peek_next().kind {
                    TokenKind::Ident(name) => {
                        let name = name.clone();
                        self.advance();
                        let end = self.advance().span;
                        let span = expr.span.merge(end);
                        expr = Spanned::new(Expr::GetAttr(Box::new(expr), name), span);
                    }
                    TokenKind::Number(n) => {
                        // Legacy index syntax: `list.0`
                        let n = *n;
                        self.advance();
                        let idx_span = self.advance().span;
                        let idx = Spanned::new(Expr::Literal(Literal::Number(n)), idx_span);
                        let span = expr.span.merge(idx_span);
                        expr = Spanned::new(Expr::Index(Box::new(expr), Box::new(idx)), span);
                    }
                    TokenKind::Operator(OperatorId::Star) => {
                        self.advance();
                        self.advance();
                        let steps = self.splat_steps(false)?;
                        let span = expr.span.merge(self.previous_span());
                        expr = Spanned::new(Expr::Splat(Box::new(expr), steps), span);
                    }
                    _ => {
                        self.advance();
                        return Err(self.unexpected("Expected attribute name after '.'"));
                    }
                }
            } else if self.check_punct(PunctuationId::LBracket) {
                self.advance();
                if self.check_op(OperatorId::Star) && self.peek_next().kind.is_punctuation(PunctuationId::RBracket) {
                    self.advance();
                    self.advance();
                    let steps = self.splat_steps(true)?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Spanned::new(Expr::Splat(Box::new(expr), steps), span);
                } else {
                    let idx = self.expression()?;
                    let end = self.expect_punct(PunctuationId::RBracket, "Expected ']' after index")?;
                    let span = expr.span.merge(end);
                    expr = Spanned::new(Expr::Index(Box::new(expr), Box::new(idx)), span);
                }
            } else {
                return Ok(expr);
            }
        }
    }

    /// Traversal steps applied to each element after a splat.
    ///
    /// Attribute-only splats (`.*`) accept just `.name` steps; full splats (`[*]`) also take indexes.
    fn splat_steps(&mut self, full: bool) -> Result<Vec<SplatStep>, CompileError> {
        let mut steps = Vec::new();
        loop {
            if self.check_punct(PunctuationId::Dot) {
                if let TokenKind::Ident(name) = &self.peek_next().kind {
                    let name = name.clone();
                    self.advance();
                    self.advance();
                    steps.push(SplatStep::Attr(name));
                    continue;
                }
                return Ok(steps);
            }
            if full && self.check_punct(PunctuationId::LBracket) {
                self.advance();
                let idx = self.expression()?;
                self.expect_punct(PunctuationId::RBracket, "Expected ']' after index")?;
                steps.push(SplatStep::Index(idx));
                continue;
            }
            return Ok(steps);
        }
    }

    // ========================================================================
    // Primary expressions
    // ========================================================================

    fn primary(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let span = self.current_span();
        match &self.peek().kind {
            TokenKind::Number(n) => {
                let n = *n;
                self.advance();
                Ok(Spanned::new(Expr::Literal(Literal::Number(n)), span))
            }
            TokenKind::Template(pieces) => {
                let pieces = pieces.clone();
                self.advance();
                let expr = self.template(&pieces)?;
                Ok(Spanned::new(expr, span))
            }
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                match name.as_str() {
                    "true" => Ok(Spanned::new(Expr::Literal(Literal::Bool(true)), span)),
                    "false" => Ok(Spanned::new(Expr::Literal(Literal::Bool(false)), span)),
                    "null" => Ok(Spanned::new(Expr::Literal(Literal::Null), span)),
                    _ if self.check_punct(PunctuationId::LParen) => self.call(name, span),
                    _ => Ok(Spanned::new(Expr::Variable(name), span)),
                }
            }
            TokenKind::Punctuation(PunctuationId::LParen) => {
                self.advance();
                let inner = self.expression()?;
                let end = self.expect_punct(PunctuationId::RParen, "Expected ')'")?;
                Ok(Spanned::new(Expr::Paren(Box::new(inner)), span.merge(end)))
            }
            TokenKind::Punctuation(PunctuationId::LBracket) => {
                self.advance();
                if self.check_ident("for") {
                    self.for_expr(span, false)
                } else {
                    self.tuple(span)
                }
            }
            TokenKind::Punctuation(PunctuationId::LBrace) => {
                self.advance();
                self.skip_newlines();
                if self.check_ident("for") {
                    self.for_expr(span, true)
                } else {
                    self.object(span)
                }
            }
            _ => Err(self.unexpected("Expected expression")),
        }
    }

    fn call(&mut self, name: Ident, start: Span) -> Result<Spanned<Expr>, CompileError> {
        self.expect_punct(PunctuationId::LParen, "Expected '('")?;
        let mut args = Vec::new();
        let mut expand_final = false;
        while !self.check_punct(PunctuationId::RParen) {
            args.push(self.expression()?);
            if self.match_punct(PunctuationId::Ellipsis) {
                expand_final = true;
                break;
            }
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        let end = self.expect_punct(PunctuationId::RParen, &format!("Expected ')' to close call to '{}'", name))?;
        Ok(Spanned::new(
            Expr::Call {
                name,
                args,
                expand_final,
            },
            start.merge(end),
        ))
    }

    fn tuple(&mut self, start: Span) -> Result<Spanned<Expr>, CompileError> {
        let mut items = Vec::new();
        while !self.check_punct(PunctuationId::RBracket) {
            items.push(self.expression()?);
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        let end = self.expect_punct(PunctuationId::RBracket, "Expected ']' to close list")?;
        Ok(Spanned::new(Expr::Tuple(items), start.merge(end)))
    }

    /// Object constructor; items are separated by commas or newlines.
    fn object(&mut self, start: Span) -> Result<Spanned<Expr>, CompileError> {
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            if self.check_punct(PunctuationId::RBrace) {
                break;
            }

            let key = match &self.peek().kind {
                TokenKind::Ident(name)
                    if self.peek_next().kind.is_punctuation(PunctuationId::Eq)
                        || self.peek_next().kind.is_operator(OperatorId::Colon) =>
                {
                    let name = name.clone();
                    self.advance();
                    ObjectKey::Ident(name)
                }
                _ => ObjectKey::Expr(self.expression()?),
            };

            if !self.match_punct(PunctuationId::Eq) && !self.match_op(OperatorId::Colon) {
                return Err(self.unexpected("Expected '=' or ':' after object key"));
            }
            let value = self.expression()?;
            items.push(ObjectItem { key, value });

            if !self.match_punct(PunctuationId::Comma) && !self.check_newline() {
                break;
            }
        }
        self.skip_newlines();
        let end = self.expect_punct(PunctuationId::RBrace, "Expected '}' to close object")?;
        Ok(Spanned::new(Expr::Object(items), start.merge(end)))
    }

    /// `[for ...]` or `{for ...}`; the opening bracket has been consumed.
    fn for_expr(&mut self, start: Span, object: bool) -> Result<Spanned<Expr>, CompileError> {
        self.expect_ident("for", "Expected 'for'")?;
        let first = self.identifier()?;
        let (key_var, value_var) = if self.match_punct(PunctuationId::Comma) {
            (Some(first), self.identifier()?)
        } else {
            (None, first)
        };
        self.expect_ident("in", "Expected 'in' in for expression")?;
        let collection = self.expression()?;
        self.expect_op(OperatorId::Colon, "Expected ':' after for expression collection")?;
        self.skip_newlines();

        let key = if object {
            let key = self.expression()?;
            self.expect_op(OperatorId::FatArrow, "Expected '=>' in object for expression")?;
            Some(key)
        } else {
            None
        };
        let value = self.expression()?;
        let grouping = object && self.match_punct(PunctuationId::Ellipsis);

        self.skip_newlines();
        let cond = if self.check_ident("if") {
            self.advance();
            Some(self.expression()?)
        } else {
            None
        };
        self.skip_newlines();

        let (close, what) = if object {
            (PunctuationId::RBrace, "Expected '}' to close for expression")
        } else {
            (PunctuationId::RBracket, "Expected ']' to close for expression")
        };
        let end = self.expect_punct(close, what)?;

        Ok(Spanned::new(
            Expr::For(Box::new(ForExpr {
                key_var,
                value_var,
                collection,
                key,
                value,
                grouping,
                cond,
            })),
            start.merge(end),
        ))
    }
}

fn binary(left: Spanned<Expr>, op: BinaryOp, right: Spanned<Expr>) -> Spanned<Expr> {
    let span = left.span.merge(right.span);
    Spanned::new(Expr::Binary(Box::new(left), op, Box::new(right)), span)
}
