/// Parser core type and entrypoint.
///
/// ## Notes
/// - This file is `include!`'d into `crate::parser`.
/// - The parser is single-pass and recovers at line boundaries so one run reports
///   every malformed attribute in a file.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    errors: Vec<CompileError>,
}

impl<'a> Parser<'a> {
    /// Create a new parser for a token stream.
    ///
    /// ## Parameters
    /// - `tokens`: Token stream produced by `tfscenario_syntax::lexer`; must end with `Eof`.
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Parse the entire token stream as a configuration file.
    ///
    /// ## Errors
    /// Returns every [`CompileError`] collected while parsing.
    pub fn parse(mut self) -> Result<Body, Vec<CompileError>> {
        let body = self.body(false);
        if !self.is_at_end() {
            let span = self.current_span();
            self.errors
                .push(CompileError::syntax("Unexpected '}' at top level".to_string(), span));
        }

        if self.errors.is_empty() {
            Ok(body)
        } else {
            Err(self.errors)
        }
    }

    /// Parse the stream as a single expression (used for template interpolations).
    pub fn parse_expression(mut self) -> Result<Spanned<Expr>, Vec<CompileError>> {
        self.skip_newlines();
        let expr = match self.expression() {
            Ok(expr) => expr,
            Err(e) => return Err(vec![e]),
        };
        self.skip_newlines();
        if !self.is_at_end() {
            return Err(vec![CompileError::syntax(
                format!("Unexpected {:?} after expression", self.peek().kind),
                self.current_span(),
            )]);
        }
        if self.errors.is_empty() {
            Ok(expr)
        } else {
            Err(self.errors)
        }
    }
}
