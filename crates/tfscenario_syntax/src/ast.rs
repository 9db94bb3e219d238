//! Abstract Syntax Tree definitions for the HCL subset
//!
//! A configuration file is a [`Body`]: a sequence of attributes (`name = expr`)
//! and blocks (`kind "label" { ... }`). Expressions cover the native HCL
//! expression syntax that Terraform modules use day to day.

use std::fmt;

/// Source location span (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Shift both offsets by `by` bytes (used for re-lexed interpolations).
    pub fn offset(self, by: usize) -> Span {
        Span {
            start: self.start + by,
            end: self.end + by,
        }
    }
}

/// A node with source location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

pub type Ident = String;

// ============================================================================
// Structure
// ============================================================================

/// A configuration body: the whole file, or the inside of a block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    pub items: Vec<Spanned<Item>>,
}

impl Body {
    /// Look up a top-level attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes().find(|a| a.name == name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.items.iter().filter_map(|item| match &item.node {
            Item::Attribute(attr) => Some(attr),
            Item::Block(_) => None,
        })
    }

    /// All nested blocks, with their spans.
    pub fn blocks(&self) -> impl Iterator<Item = Spanned<&Block>> {
        self.items.iter().filter_map(|item| match &item.node {
            Item::Block(block) => Some(Spanned::new(block, item.span)),
            Item::Attribute(_) => None,
        })
    }

    /// Nested blocks of one kind (`variable`, `validation`, `run`, ...).
    pub fn blocks_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = Spanned<&'a Block>> + 'a {
        self.blocks().filter(move |b| b.node.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Attribute(Attribute),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: Ident,
    pub value: Spanned<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: Ident,
    pub labels: Vec<String>,
    pub body: Body,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// String template with at least one interpolation.
    Template(Vec<TemplatePart>),
    /// A root name: `var`, `local`, `aws_s3_bucket`, `each`, a `for` variable, or a bare type keyword.
    Variable(Ident),
    GetAttr(Box<Spanned<Expr>>, Ident),
    Index(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    /// `source[*].a.b` / `source.*.a`
    Splat(Box<Spanned<Expr>>, Vec<SplatStep>),
    Call {
        name: Ident,
        args: Vec<Spanned<Expr>>,
        /// Final argument is expanded (`f(xs...)`).
        expand_final: bool,
    },
    Conditional {
        cond: Box<Spanned<Expr>>,
        then: Box<Spanned<Expr>>,
        otherwise: Box<Spanned<Expr>>,
    },
    Unary(UnaryOp, Box<Spanned<Expr>>),
    Binary(Box<Spanned<Expr>>, BinaryOp, Box<Spanned<Expr>>),
    Tuple(Vec<Spanned<Expr>>),
    Object(Vec<ObjectItem>),
    For(Box<ForExpr>),
    Paren(Box<Spanned<Expr>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Interp(Spanned<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SplatStep {
    Attr(Ident),
    Index(Spanned<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectItem {
    pub key: ObjectKey,
    pub value: Spanned<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKey {
    /// Bare identifier key: `name = ...`
    Ident(Ident),
    /// Quoted or parenthesized key: `"name" = ...`, `(local.k) = ...`
    Expr(Spanned<Expr>),
}

/// `[for k, v in coll : value if cond]` or `{for k, v in coll : key => value... if cond}`
#[derive(Debug, Clone, PartialEq)]
pub struct ForExpr {
    pub key_var: Option<Ident>,
    pub value_var: Ident,
    pub collection: Spanned<Expr>,
    /// Present for the object form.
    pub key: Option<Spanned<Expr>>,
    pub value: Spanned<Expr>,
    pub grouping: bool,
    pub cond: Option<Spanned<Expr>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }

    /// Operators whose result is always a bool.
    pub fn is_predicate(self) -> bool {
        matches!(
            self,
            BinaryOp::Or
                | BinaryOp::And
                | BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }
}

impl Expr {
    /// `var.<name>` → `Some(name)`
    pub fn as_input_ref(&self) -> Option<&str> {
        match self {
            Expr::GetAttr(base, name) => match &base.node {
                Expr::Variable(root) if root == "var" => Some(name),
                _ => None,
            },
            Expr::Paren(inner) => inner.node.as_input_ref(),
            _ => None,
        }
    }

    /// Strip redundant parentheses.
    pub fn unparen(&self) -> &Expr {
        match self {
            Expr::Paren(inner) => inner.node.unparen(),
            other => other,
        }
    }

    /// Whether the expression is, at its root, a boolean predicate.
    pub fn is_predicate(&self) -> bool {
        match self.unparen() {
            Expr::Binary(_, op, _) => op.is_predicate(),
            Expr::Unary(UnaryOp::Not, _) => true,
            Expr::Call { name, .. } => matches!(
                name.as_str(),
                "contains" | "can" | "alltrue" | "anytrue" | "startswith" | "endswith"
            ),
            _ => false,
        }
    }

    /// Visit direct child expressions.
    pub fn for_each_child<'a>(&'a self, f: &mut dyn FnMut(&'a Spanned<Expr>)) {
        match self {
            Expr::Literal(_) | Expr::Variable(_) => {}
            Expr::Template(parts) => {
                for part in parts {
                    if let TemplatePart::Interp(e) = part {
                        f(e);
                    }
                }
            }
            Expr::GetAttr(base, _) => f(base),
            Expr::Index(base, idx) => {
                f(base);
                f(idx);
            }
            Expr::Splat(base, steps) => {
                f(base);
                for step in steps {
                    if let SplatStep::Index(e) = step {
                        f(e);
                    }
                }
            }
            Expr::Call { args, .. } => args.iter().for_each(|a| f(a)),
            Expr::Conditional { cond, then, otherwise } => {
                f(cond);
                f(then);
                f(otherwise);
            }
            Expr::Unary(_, e) | Expr::Paren(e) => f(e),
            Expr::Binary(l, _, r) => {
                f(l);
                f(r);
            }
            Expr::Tuple(items) => items.iter().for_each(|i| f(i)),
            Expr::Object(items) => {
                for item in items {
                    if let ObjectKey::Expr(k) = &item.key {
                        f(k);
                    }
                    f(&item.value);
                }
            }
            Expr::For(fe) => {
                f(&fe.collection);
                if let Some(k) = &fe.key {
                    f(k);
                }
                f(&fe.value);
                if let Some(c) = &fe.cond {
                    f(c);
                }
            }
        }
    }

    /// Visit this expression and every descendant, depth first.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        f(self);
        self.for_each_child(&mut |child| child.node.walk(&mut *f));
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Render a number the way HCL writes it (`3`, not `3.0`).
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Escape the inside of a quoted HCL string.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out
}

/// Render a quoted HCL string literal.
pub fn quote_string(s: &str) -> String {
    format!("\"{}\"", escape_string(s))
}

/// Whether `s` can be written as a bare identifier (object keys, attribute names).
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Number(n) => write!(f, "{}", format_number(*n)),
            Literal::String(s) => write!(f, "{}", quote_string(s)),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::Template(parts) => {
                write!(f, "\"")?;
                for part in parts {
                    match part {
                        TemplatePart::Literal(s) => write!(f, "{}", escape_string(s))?,
                        TemplatePart::Interp(e) => write!(f, "${{{}}}", e.node)?,
                    }
                }
                write!(f, "\"")
            }
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::GetAttr(base, name) => write!(f, "{}.{}", base.node, name),
            Expr::Index(base, idx) => write!(f, "{}[{}]", base.node, idx.node),
            Expr::Splat(base, steps) => {
                write!(f, "{}[*]", base.node)?;
                for step in steps {
                    match step {
                        SplatStep::Attr(name) => write!(f, ".{}", name)?,
                        SplatStep::Index(e) => write!(f, "[{}]", e.node)?,
                    }
                }
                Ok(())
            }
            Expr::Call {
                name,
                args,
                expand_final,
            } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg.node)?;
                }
                if *expand_final {
                    write!(f, "...")?;
                }
                write!(f, ")")
            }
            Expr::Conditional { cond, then, otherwise } => {
                write!(f, "{} ? {} : {}", cond.node, then.node, otherwise.node)
            }
            Expr::Unary(UnaryOp::Not, e) => write!(f, "!{}", e.node),
            Expr::Unary(UnaryOp::Neg, e) => write!(f, "-{}", e.node),
            Expr::Binary(l, op, r) => write!(f, "{} {} {}", l.node, op.symbol(), r.node),
            Expr::Tuple(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.node)?;
                }
                write!(f, "]")
            }
            Expr::Object(items) => {
                if items.is_empty() {
                    return write!(f, "{{}}");
                }
                write!(f, "{{ ")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match &item.key {
                        ObjectKey::Ident(k) => write!(f, "{} = {}", k, item.value.node)?,
                        ObjectKey::Expr(k) => write!(f, "{} = {}", k.node, item.value.node)?,
                    }
                }
                write!(f, " }}")
            }
            Expr::For(fe) => {
                let (open, close) = if fe.key.is_some() { ("{", "}") } else { ("[", "]") };
                write!(f, "{}for ", open)?;
                if let Some(k) = &fe.key_var {
                    write!(f, "{}, ", k)?;
                }
                write!(f, "{} in {} : ", fe.value_var, fe.collection.node)?;
                if let Some(k) = &fe.key {
                    write!(f, "{} => ", k.node)?;
                }
                write!(f, "{}", fe.value.node)?;
                if fe.grouping {
                    write!(f, "...")?;
                }
                if let Some(c) = &fe.cond {
                    write!(f, " if {}", c.node)?;
                }
                write!(f, "{}", close)
            }
            Expr::Paren(e) => write!(f, "({})", e.node),
        }
    }
}
