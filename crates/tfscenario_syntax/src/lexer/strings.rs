//! Template scanning for the HCL lexer
//!
//! Handles quoted templates (`"..."`) and heredocs (`<<EOT` / `<<-EOT`).
//! Interpolations are not lexed here: their raw source and file offset are
//! kept so the parser can re-lex them with correct spans.

use super::Lexer;
use super::tokens::{TemplatePiece, TokenKind};
use crate::ast::Span;
use crate::diagnostics::CompileError;

impl<'a> Lexer<'a> {
    /// Scan a quoted template. The opening quote has been consumed.
    pub(super) fn scan_quoted(&mut self, start: usize) {
        let source = self.source;
        let content_start = self.current_pos;
        // Brace depth inside `${ ... }`; 0 means literal text.
        let mut depth = 0usize;
        let mut in_nested_string = false;

        loop {
            let Some(c) = self.peek() else {
                self.errors.push(CompileError::syntax(
                    "Unterminated string".to_string(),
                    Span::new(start, self.current_pos),
                ));
                return;
            };

            match c {
                '\n' if depth == 0 || in_nested_string => {
                    self.errors.push(
                        CompileError::syntax("Unterminated string".to_string(), Span::new(start, self.current_pos))
                            .with_hint("Quoted strings cannot span lines; use a heredoc (<<EOT) instead"),
                    );
                    return;
                }
                '\\' => {
                    self.advance();
                    self.advance();
                }
                '"' if depth == 0 => {
                    let content_end = self.current_pos;
                    self.advance();
                    let raw = &source[content_start..content_end];
                    match split_template(raw, content_start, true) {
                        Ok(pieces) => self.add_token(TokenKind::Template(pieces), start),
                        Err((message, at)) => self
                            .errors
                            .push(CompileError::syntax(message, Span::new(at, at + 1))),
                    }
                    return;
                }
                '"' => {
                    in_nested_string = !in_nested_string;
                    self.advance();
                }
                '$' | '%' if depth == 0 => {
                    self.advance();
                    if self.peek() == Some(c) && self.peek_next() == Some('{') {
                        // `$${` / `%%{` escapes
                        self.advance();
                        self.advance();
                    } else if self.peek() == Some('{') {
                        self.advance();
                        depth = 1;
                    }
                }
                '{' if !in_nested_string && depth > 0 => {
                    depth += 1;
                    self.advance();
                }
                '}' if !in_nested_string && depth > 0 => {
                    depth -= 1;
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Scan a heredoc. `<<` has been consumed.
    pub(super) fn scan_heredoc(&mut self, start: usize) {
        let source = self.source;
        let strip_indent = self.match_char('-');

        let marker_start = self.current_pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let marker = source[marker_start..self.current_pos].to_string();
        if marker.is_empty() {
            self.errors.push(CompileError::syntax(
                "Expected heredoc marker after '<<'".to_string(),
                Span::new(start, self.current_pos),
            ));
            return;
        }
        if !self.match_char('\n') {
            self.errors.push(CompileError::syntax(
                format!("Heredoc marker '{}' must be followed by a newline", marker),
                Span::new(start, self.current_pos),
            ));
            return;
        }

        let content_start = self.current_pos;
        let mut lines: Vec<&'a str> = Vec::new();
        loop {
            if self.is_at_end() {
                self.errors.push(CompileError::syntax(
                    format!("Unterminated heredoc; expected closing '{}'", marker),
                    Span::new(start, self.current_pos),
                ));
                return;
            }
            let line_start = self.current_pos;
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                self.advance();
            }
            let line = &source[line_start..self.current_pos];
            if line.trim() == marker {
                break;
            }
            lines.push(line.trim_end_matches('\r'));
            self.advance(); // '\n'
        }

        let text = if strip_indent {
            let indent = lines
                .iter()
                .filter(|l| !l.trim().is_empty())
                .map(|l| l.len() - l.trim_start().len())
                .min()
                .unwrap_or(0);
            lines
                .iter()
                .map(|l| if l.len() >= indent { &l[indent..] } else { l.trim_start() })
                .map(|l| format!("{}\n", l))
                .collect::<String>()
        } else {
            lines.iter().map(|l| format!("{}\n", l)).collect::<String>()
        };

        match split_template(&text, content_start, false) {
            Ok(pieces) => self.add_token(TokenKind::Template(pieces), start),
            Err((message, at)) => self.errors.push(CompileError::syntax(message, Span::new(at, at + 1))),
        }
    }
}

/// Split template text into literal and interpolation pieces.
///
/// `base` is the file offset of `raw[0]`; `escapes` enables backslash escapes
/// (quoted templates only). Errors carry a message and a file offset.
fn split_template(raw: &str, base: usize, escapes: bool) -> Result<Vec<TemplatePiece>, (String, usize)> {
    let chars: Vec<(usize, char)> = raw.char_indices().collect();
    let at = |i: usize| chars.get(i).map(|(_, c)| *c);
    let offset = |i: usize| base + chars.get(i).map(|(o, _)| *o).unwrap_or(raw.len());

    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i].1;
        match c {
            '\\' if escapes => {
                let escaped = match at(i + 1) {
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('r') => '\r',
                    Some('"') => '"',
                    Some('\\') => '\\',
                    Some(u @ ('u' | 'U')) => {
                        let width = if u == 'u' { 4 } else { 8 };
                        let hex: String = (0..width).filter_map(|k| at(i + 2 + k)).collect();
                        let decoded = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32);
                        match decoded {
                            Some(ch) if hex.len() == width => {
                                literal.push(ch);
                                i += 2 + width;
                                continue;
                            }
                            _ => return Err((format!("Invalid unicode escape '\\{}{}'", u, hex), offset(i))),
                        }
                    }
                    Some(other) => return Err((format!("Invalid escape sequence '\\{}'", other), offset(i))),
                    None => return Err(("Incomplete escape sequence".to_string(), offset(i))),
                };
                literal.push(escaped);
                i += 2;
            }
            '$' | '%' if at(i + 1) == Some(c) && at(i + 2) == Some('{') => {
                literal.push(c);
                literal.push('{');
                i += 3;
            }
            '%' if at(i + 1) == Some('{') => {
                return Err((
                    "Template directives (%{ ... }) are not supported".to_string(),
                    offset(i),
                ));
            }
            '$' if at(i + 1) == Some('{') => {
                let open = i + 2;
                let mut depth = 1usize;
                let mut in_string = false;
                let mut j = open;
                while j < chars.len() {
                    match chars[j].1 {
                        '\\' if in_string => j += 1,
                        '"' => in_string = !in_string,
                        '{' if !in_string => depth += 1,
                        '}' if !in_string => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    j += 1;
                }
                if j >= chars.len() {
                    return Err(("Unterminated interpolation".to_string(), offset(i)));
                }

                if !literal.is_empty() {
                    pieces.push(TemplatePiece::Literal(std::mem::take(&mut literal)));
                }
                let inner_start = chars[open].0;
                let inner_end = chars[j].0;
                let mut inner = &raw[inner_start..inner_end];
                let mut inner_offset = base + inner_start;
                // Strip markers: `${~ expr ~}`
                if let Some(rest) = inner.strip_prefix('~') {
                    inner = rest;
                    inner_offset += 1;
                }
                inner = inner.strip_suffix('~').unwrap_or(inner);
                pieces.push(TemplatePiece::Interp(inner.to_string(), inner_offset));
                i = j + 1;
            }
            _ => {
                literal.push(c);
                i += 1;
            }
        }
    }

    if !literal.is_empty() || pieces.is_empty() {
        pieces.push(TemplatePiece::Literal(literal));
    }
    Ok(pieces)
}
