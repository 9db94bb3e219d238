/// Parse a token stream into a configuration [`Body`].
///
/// This is the main public entrypoint for parsing.
///
/// ## Errors
/// Returns `Err(Vec<CompileError>)` if parsing fails.
#[tracing::instrument(skip_all, fields(token_count = tokens.len()))]
pub fn parse(tokens: &[Token]) -> Result<Body, Vec<CompileError>> {
    Parser::new(tokens).parse()
}

/// Lex and parse a source string.
///
/// ## Errors
/// Returns lexer errors if tokenization fails, otherwise parser errors.
pub fn parse_source(source: &str) -> Result<Body, Vec<CompileError>> {
    let tokens = lexer::lex(source)?;
    parse(&tokens)
}

/// Lex and parse a standalone expression such as `var.env == "prod"`.
pub fn parse_expression_source(source: &str) -> Result<Spanned<Expr>, Vec<CompileError>> {
    let tokens = lexer::lex(source)?;
    Parser::new(&tokens).parse_expression()
}
