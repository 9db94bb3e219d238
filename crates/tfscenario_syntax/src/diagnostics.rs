//! Diagnostics and error reporting
//!
//! Errors carry a byte span into the file they came from. `format_error`
//! renders a compact excerpt with a caret underline; `render_fancy` hands the
//! same error to miette's graphical report handler.

use std::fmt;

use miette::{GraphicalReportHandler, GraphicalTheme, NamedSource, SourceSpan};

use crate::ast::Span;

/// An error (or warning) with location information
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub message: String,
    pub span: Span,
    pub kind: ErrorKind,
    pub notes: Vec<String>,
    pub hints: Vec<String>,
}

impl CompileError {
    pub fn new(message: String, span: Span) -> Self {
        Self {
            message,
            span,
            kind: ErrorKind::Error,
            notes: Vec::new(),
            hints: Vec::new(),
        }
    }

    pub fn syntax(message: String, span: Span) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            ..Self::new(message, span)
        }
    }

    /// A problem with a module's declared interface (duplicate names, malformed blocks).
    pub fn interface(message: String, span: Span) -> Self {
        Self {
            kind: ErrorKind::Interface,
            ..Self::new(message, span)
        }
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self {
            kind: ErrorKind::Warning,
            ..Self::new(message, span)
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn is_warning(&self) -> bool {
        self.kind == ErrorKind::Warning
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CompileError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    Syntax,
    Interface,
    Warning,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Error => write!(f, "error"),
            ErrorKind::Syntax => write!(f, "syntax error"),
            ErrorKind::Interface => write!(f, "interface error"),
            ErrorKind::Warning => write!(f, "warning"),
        }
    }
}

/// Render an error with one line of source context.
///
/// ```text
/// syntax error: Expected '=' after attribute name, found Newline
///   --> main.tf:3:9
///    |
///  3 |   default
///    |          ^
/// ```
pub fn format_error(file_name: &str, source: &str, error: &CompileError) -> String {
    let (line_num, col_num, line_text) = get_line_info(source, error.span.start);
    let width = line_num.to_string().len();

    let underline_len = if error.span.end > error.span.start {
        (error.span.end - error.span.start)
            .min(line_text.len().saturating_sub(col_num - 1))
            .max(1)
    } else {
        1
    };

    let mut out = String::new();
    out.push_str(&format!("{}: {}\n", error.kind, error.message));
    out.push_str(&format!("  --> {}:{}:{}\n", file_name, line_num, col_num));
    out.push_str(&format!("  {:>width$} |\n", "", width = width));
    out.push_str(&format!("  {:>width$} | {}\n", line_num, line_text, width = width));
    out.push_str(&format!(
        "  {:>width$} | {}{}\n",
        "",
        " ".repeat(col_num - 1),
        "^".repeat(underline_len),
        width = width
    ));
    for note in &error.notes {
        out.push_str(&format!("  = note: {}\n", note));
    }
    for hint in &error.hints {
        out.push_str(&format!("  = hint: {}\n", hint));
    }
    out
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("{message}")]
struct FancyReport {
    message: String,
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
}

/// Render an error through miette's graphical handler (no colors, unicode box drawing).
pub fn render_fancy(file_name: &str, source: &str, error: &CompileError) -> String {
    let start = error.span.start.min(source.len());
    let len = error.span.end.saturating_sub(error.span.start).min(source.len() - start);
    let help: Vec<String> = error
        .notes
        .iter()
        .map(|n| format!("note: {}", n))
        .chain(error.hints.iter().cloned())
        .collect();
    let report = FancyReport {
        message: format!("{}: {}", error.kind, error.message),
        src: NamedSource::new(file_name, source.to_string()),
        span: SourceSpan::from((start, len)),
        help: if help.is_empty() { None } else { Some(help.join("\n")) },
    };

    let mut out = String::new();
    let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor());
    if handler.render_report(&mut out, &report).is_err() {
        return format_error(file_name, source, error);
    }
    out
}

/// Get line number, column number, and line text for a byte offset
fn get_line_info(source: &str, offset: usize) -> (usize, usize, &str) {
    let offset = offset.min(source.len());
    let mut line_num = 1;
    let mut line_start = 0;

    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line_num += 1;
            line_start = i + 1;
        }
    }

    let line_end = source[line_start..]
        .find('\n')
        .map(|i| line_start + i)
        .unwrap_or(source.len());

    let line_text = &source[line_start..line_end];
    let col_num = offset - line_start + 1;

    (line_num, col_num, line_text)
}
