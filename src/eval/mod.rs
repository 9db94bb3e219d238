//! Symbolic evaluation of module expressions for one set of input values.
//!
//! The evaluator covers the expression subset modules commonly use: references to
//! inputs and locals, operators, conditionals, `for` expressions and the functions in
//! [`functions`]. Anything it cannot know before apply (resource attributes that are
//! computed by the provider, data sources, child modules) comes back as [`Unknown`]
//! instead of a guess.
//!
//! ## Notes
//! - Locals are cached per evaluator; a local that refers back to itself is reported as
//!   a dependency cycle instead of recursing forever.
//! - `&&` and `||` evaluate both operands, like Terraform: an unknown operand makes the
//!   result unknown even if the other one would decide it.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::ast::{BinaryOp, Expr, Literal, ObjectKey, SplatStep, Spanned, TemplatePart, UnaryOp};
use crate::interface::{InputDecl, ModuleInterface, ResourceDecl};

pub mod functions;
pub mod value;

pub use value::{Value, hcl_key};

/// Largest instance collection the evaluator builds element by element.
pub const MAX_EXPANDED_INSTANCES: usize = 1024;

fn expandable(res: &ResourceDecl, n: usize) -> Result<usize, Unknown> {
    if n > MAX_EXPANDED_INSTANCES {
        return Err(Unknown::not_derivable(format!(
            "{} has {} instances; collections over {} are not expanded",
            res.address(),
            n,
            MAX_EXPANDED_INSTANCES
        )));
    }
    Ok(n)
}

/// Why a value could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownReason {
    /// Depends on something only known after resources are created.
    AfterApply,
    /// Outside what the evaluator models (data sources, unsupported functions, ...).
    NotDerivable,
    /// Terraform itself would reject the expression with these inputs.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{detail}")]
pub struct Unknown {
    pub reason: UnknownReason,
    pub detail: String,
}

impl Unknown {
    pub fn after_apply(detail: impl Into<String>) -> Self {
        Self {
            reason: UnknownReason::AfterApply,
            detail: detail.into(),
        }
    }

    pub fn not_derivable(detail: impl Into<String>) -> Self {
        Self {
            reason: UnknownReason::NotDerivable,
            detail: detail.into(),
        }
    }

    pub fn invalid(detail: impl Into<String>) -> Self {
        Self {
            reason: UnknownReason::Invalid,
            detail: detail.into(),
        }
    }
}

pub type EvalResult = Result<Value, Unknown>;

/// Evaluate an expression that references nothing (type defaults, literals).
pub fn constant(expr: &Spanned<Expr>) -> EvalResult {
    Evaluator::detached().eval(expr)
}

// ============================================================================
// Traversals
// ============================================================================

/// One step of a reference traversal after its root name.
#[derive(Debug, Clone, Copy)]
pub enum Step<'a> {
    Attr(&'a str),
    Index(&'a Spanned<Expr>),
}

/// Split `a.b[c].d` into its base expression and steps.
pub fn traversal(expr: &Spanned<Expr>) -> (&Spanned<Expr>, Vec<Step<'_>>) {
    let mut steps = Vec::new();
    let mut cur = expr;
    loop {
        match &cur.node {
            Expr::GetAttr(base, name) => {
                steps.push(Step::Attr(name));
                cur = base;
            }
            Expr::Index(base, idx) => {
                steps.push(Step::Index(idx));
                cur = base;
            }
            _ => break,
        }
    }
    steps.reverse();
    (cur, steps)
}

#[derive(Debug, Clone)]
enum LocalState {
    InProgress,
    Done(EvalResult),
}

static NO_BINDINGS: BTreeMap<String, Value> = BTreeMap::new();

/// Evaluates expressions of one module against one scenario's input values.
pub struct Evaluator<'m> {
    module: Option<&'m ModuleInterface>,
    bindings: &'m BTreeMap<String, Value>,
    locals: HashMap<String, LocalState>,
    /// `for` expression variables, innermost last.
    scopes: Vec<(String, Value)>,
    stack: Vec<String>,
}

impl<'m> Evaluator<'m> {
    pub fn new(module: &'m ModuleInterface, bindings: &'m BTreeMap<String, Value>) -> Self {
        Self {
            module: Some(module),
            bindings,
            locals: HashMap::new(),
            scopes: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// An evaluator with no module: every reference is not derivable.
    fn detached() -> Evaluator<'static> {
        Evaluator {
            module: None,
            bindings: &NO_BINDINGS,
            locals: HashMap::new(),
            scopes: Vec::new(),
            stack: Vec::new(),
        }
    }

    pub fn eval(&mut self, expr: &Spanned<Expr>) -> EvalResult {
        match &expr.node {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
            }),
            Expr::Template(parts) => self.eval_template(parts),
            Expr::Variable(_) | Expr::GetAttr(..) | Expr::Index(..) => self.eval_traversal(expr),
            Expr::Splat(base, steps) => self.eval_splat(base, steps),
            Expr::Call {
                name,
                args,
                expand_final,
            } => self.eval_call(name, args, *expand_final),
            Expr::Conditional { cond, then, otherwise } => {
                let c = self.eval(cond)?;
                match c.as_bool() {
                    Some(true) => self.eval(then),
                    Some(false) => self.eval(otherwise),
                    None => Err(Unknown::invalid(format!("condition must be a bool, got {}", c))),
                }
            }
            Expr::Unary(op, operand) => {
                let v = self.eval(operand)?;
                match op {
                    UnaryOp::Not => v
                        .as_bool()
                        .map(|b| Value::Bool(!b))
                        .ok_or_else(|| Unknown::invalid(format!("'!' needs a bool, got {}", v))),
                    UnaryOp::Neg => v
                        .as_number()
                        .map(|n| Value::Number(-n))
                        .ok_or_else(|| Unknown::invalid(format!("'-' needs a number, got {}", v))),
                }
            }
            Expr::Binary(left, op, right) => {
                let l = self.eval(left);
                let r = self.eval(right);
                binary(*op, l?, r?)
            }
            Expr::Tuple(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item)?);
                }
                Ok(Value::List(out))
            }
            Expr::Object(items) => {
                let mut out = BTreeMap::new();
                for item in items {
                    let key = match &item.key {
                        ObjectKey::Ident(k) => k.clone(),
                        ObjectKey::Expr(k) => {
                            let v = self.eval(k)?;
                            v.as_string()
                                .ok_or_else(|| Unknown::invalid(format!("object key must be a string, got {}", v)))?
                        }
                    };
                    out.insert(key, self.eval(&item.value)?);
                }
                Ok(Value::Map(out))
            }
            Expr::For(fe) => self.eval_for(fe),
            Expr::Paren(inner) => self.eval(inner),
        }
    }

    // ---- references ----

    fn eval_traversal(&mut self, expr: &Spanned<Expr>) -> EvalResult {
        let (base, steps) = traversal(expr);
        let (value, consumed) = match &base.node {
            Expr::Variable(root) => self.resolve_root(root, &steps)?,
            _ => (self.eval(base)?, 0),
        };
        self.apply_steps(value, &steps[consumed..])
    }

    /// Resolve a root name plus the steps it needs; returns how many steps were used.
    fn resolve_root(&mut self, root: &str, steps: &[Step<'_>]) -> Result<(Value, usize), Unknown> {
        if let Some((_, v)) = self.scopes.iter().rev().find(|(name, _)| name == root) {
            return Ok((v.clone(), 0));
        }
        let first = match steps.first() {
            Some(Step::Attr(name)) => Some(*name),
            _ => None,
        };
        match root {
            "var" => {
                let name = first.ok_or_else(|| Unknown::invalid("'var' must be followed by an input name"))?;
                Ok((self.input(name)?, 1))
            }
            "local" => {
                let name = first.ok_or_else(|| Unknown::invalid("'local' must be followed by a local name"))?;
                Ok((self.local(name)?, 1))
            }
            "path" if first.is_some() => Ok((Value::string("."), 1)),
            "terraform" if first == Some("workspace") => Ok((Value::string("default"), 1)),
            "data" => Err(Unknown::not_derivable(format!(
                "data source {} is read during plan",
                render_path("data", &steps[..steps.len().min(2)])
            ))),
            "module" => Err(Unknown::not_derivable(format!(
                "child module {}",
                render_path("module", &steps[..steps.len().min(1)])
            ))),
            "count" | "each" | "self" => Err(Unknown::not_derivable(format!(
                "'{}' is only meaningful inside a resource instance",
                root
            ))),
            _ => {
                let resource = self
                    .module
                    .zip(first)
                    .and_then(|(m, name)| m.resource(root, name));
                match resource {
                    Some(res) => {
                        let (v, used) = self.resource_ref(res, &steps[1..])?;
                        Ok((v, used + 1))
                    }
                    None if self.module.is_none() => {
                        Err(Unknown::not_derivable(format!("reference to '{}'", root)))
                    }
                    None => Err(Unknown::invalid(format!(
                        "reference to undeclared {}",
                        render_path(root, &steps[..steps.len().min(1)])
                    ))),
                }
            }
        }
    }

    fn resource_ref(&mut self, res: &ResourceDecl, rest: &[Step<'_>]) -> Result<(Value, usize), Unknown> {
        let addr = res.address();
        if res.is_multi() {
            match rest.first() {
                None => Ok((self.instances(res)?, 0)),
                Some(Step::Index(_)) => match rest.get(1) {
                    Some(Step::Attr(attr)) => Ok((self.resource_attr(res, attr)?, 2)),
                    _ => Err(Unknown::after_apply(format!("{}[...]", addr))),
                },
                Some(Step::Attr(attr)) => Err(Unknown::invalid(format!(
                    "{} has multiple instances; index it before reading '{}'",
                    addr, attr
                ))),
            }
        } else {
            match rest.first() {
                Some(Step::Attr(attr)) => Ok((self.resource_attr(res, attr)?, 1)),
                _ => Err(Unknown::after_apply(addr)),
            }
        }
    }

    /// A configured argument is known at plan time; anything else is computed by the provider.
    fn resource_attr(&mut self, res: &ResourceDecl, attr: &str) -> EvalResult {
        match res.args.get(attr) {
            Some(expr) if !references_instance(expr) => self.eval(expr),
            _ => Err(Unknown::after_apply(format!("{}.{}", res.address(), attr))),
        }
    }

    /// The instance collection of a `count` / `for_each` resource, with unknown attributes elided.
    ///
    /// `count` collections larger than [`MAX_EXPANDED_INSTANCES`] are not derivable; use
    /// [`Evaluator::instance_count`] when only the number matters.
    pub fn instances(&mut self, res: &ResourceDecl) -> EvalResult {
        if let Some(count) = &res.count {
            let n = self.whole_count(count)?;
            let n = expandable(res, n)?;
            return Ok(Value::List(vec![Value::Map(BTreeMap::new()); n]));
        }
        if let Some(for_each) = &res.for_each {
            let keys: Vec<String> = match self.eval(for_each)? {
                Value::Map(entries) => entries.into_keys().collect(),
                Value::List(items) => items
                    .iter()
                    .map(|v| {
                        v.as_string()
                            .ok_or_else(|| Unknown::invalid("for_each set elements must be strings"))
                    })
                    .collect::<Result<_, _>>()?,
                Value::Null => return Err(Unknown::invalid("for_each must not be null")),
                other => {
                    return Err(Unknown::invalid(format!("for_each needs a map or set, got {}", other.type_name())));
                }
            };
            return Ok(Value::Map(keys.into_iter().map(|k| (k, Value::Map(BTreeMap::new()))).collect()));
        }
        Err(Unknown::after_apply(res.address()))
    }

    /// Number of instances of a `count` / `for_each` resource, without building them.
    pub fn instance_count(&mut self, res: &ResourceDecl) -> Result<usize, Unknown> {
        match &res.count {
            Some(count) => self.whole_count(count),
            None => Ok(self.instances(res)?.len().unwrap_or(0)),
        }
    }

    fn whole_count(&mut self, count: &Spanned<Expr>) -> Result<usize, Unknown> {
        let n = self.eval(count)?;
        n.as_number()
            .filter(|n| *n >= 0.0 && n.fract() == 0.0)
            .map(|n| n as usize)
            .ok_or_else(|| Unknown::invalid(format!("count must be a whole number, got {}", n)))
    }

    fn apply_steps(&mut self, mut value: Value, steps: &[Step<'_>]) -> EvalResult {
        for step in steps {
            value = match step {
                Step::Attr(name) => match value {
                    Value::Map(mut entries) => entries
                        .remove(*name)
                        .ok_or_else(|| Unknown::invalid(format!("object has no attribute \"{}\"", name)))?,
                    Value::Null => {
                        return Err(Unknown::invalid(format!("attempt to get attribute \"{}\" of null", name)));
                    }
                    other => {
                        return Err(Unknown::invalid(format!(
                            "cannot get attribute \"{}\" of a {}",
                            name,
                            other.type_name()
                        )));
                    }
                },
                Step::Index(idx) => {
                    let key = self.eval(idx)?;
                    index(value, &key)?
                }
            };
        }
        Ok(value)
    }

    /// `aws_instance.web[*].id` and friends.
    fn eval_splat(&mut self, base: &Spanned<Expr>, steps: &[SplatStep]) -> EvalResult {
        let (root, base_steps) = traversal(base);
        if let (Expr::Variable(root), [Step::Attr(name)]) = (&root.node, base_steps.as_slice()) {
            if let Some(res) = self.module.and_then(|m| m.resource(root, name)) {
                let attr = match steps.first() {
                    Some(SplatStep::Attr(a)) => a.as_str(),
                    _ => return Err(Unknown::after_apply(format!("{}[*]", res.address()))),
                };
                let count = self.instance_count(res)?;
                let count = expandable(res, count)?;
                let v = self.resource_attr(res, attr)?;
                let rest: Vec<Step<'_>> = steps[1..].iter().map(splat_step).collect();
                let v = self.apply_steps(v, &rest)?;
                return Ok(Value::List(vec![v; count]));
            }
        }

        let items = match self.eval(base)? {
            Value::Null => Vec::new(),
            Value::List(items) => items,
            single => vec![single],
        };
        let steps: Vec<Step<'_>> = steps.iter().map(splat_step).collect();
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(self.apply_steps(item, &steps)?);
        }
        Ok(Value::List(out))
    }

    /// Value of an input in this scenario, converted to its declared type.
    pub fn input(&mut self, name: &str) -> EvalResult {
        let module = self
            .module
            .ok_or_else(|| Unknown::not_derivable(format!("var.{}", name)))?;
        let decl = module
            .input(name)
            .ok_or_else(|| Unknown::invalid(format!("reference to undeclared input \"{}\"", name)))?;
        let mut value = match self.bindings.get(name).or(decl.default.as_ref()) {
            Some(v) => v.clone(),
            None => return Err(Unknown::not_derivable(format!("input \"{}\" has no value", name))),
        };
        if value.is_null() && !decl.nullable {
            value = decl.default.clone().unwrap_or(Value::Null);
        }
        decl.ty
            .convert(value)
            .map_err(|e| Unknown::invalid(format!("invalid value for input \"{}\": {}", name, e)))
    }

    fn local(&mut self, name: &str) -> EvalResult {
        match self.locals.get(name) {
            Some(LocalState::Done(result)) => return result.clone(),
            Some(LocalState::InProgress) => {
                let mut cycle = self.stack.clone();
                cycle.push(name.to_string());
                return Err(Unknown::invalid(format!(
                    "local value dependency cycle: {}",
                    cycle.join(" -> ")
                )));
            }
            None => {}
        }
        let module = self
            .module
            .ok_or_else(|| Unknown::not_derivable(format!("local.{}", name)))?;
        let decl = module
            .local(name)
            .ok_or_else(|| Unknown::invalid(format!("reference to undeclared local \"{}\"", name)))?;

        self.locals.insert(name.to_string(), LocalState::InProgress);
        self.stack.push(name.to_string());
        // Locals never see the `for` variables of the expression that referenced them.
        let scopes = std::mem::take(&mut self.scopes);
        let result = self.eval(&decl.value);
        self.scopes = scopes;
        self.stack.pop();
        self.locals.insert(name.to_string(), LocalState::Done(result.clone()));
        result
    }

    // ---- calls ----

    fn eval_call(&mut self, name: &str, args: &[Spanned<Expr>], expand_final: bool) -> EvalResult {
        match name {
            "can" => {
                let [arg] = args else {
                    return Err(Unknown::invalid("can() takes exactly one argument"));
                };
                match self.eval(arg) {
                    Ok(_) => Ok(Value::Bool(true)),
                    Err(u) if u.reason == UnknownReason::Invalid => Ok(Value::Bool(false)),
                    Err(u) => Err(u),
                }
            }
            "try" => {
                let mut last = Unknown::invalid("try() needs at least one argument");
                for arg in args {
                    match self.eval(arg) {
                        Ok(v) => return Ok(v),
                        Err(u) if u.reason == UnknownReason::Invalid => last = u,
                        Err(u) => return Err(u),
                    }
                }
                Err(last)
            }
            _ => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                if expand_final {
                    match values.pop() {
                        Some(Value::List(items)) => values.extend(items),
                        Some(other) => {
                            return Err(Unknown::invalid(format!(
                                "cannot expand a {} into arguments",
                                other.type_name()
                            )));
                        }
                        None => {}
                    }
                }
                functions::call(name, values)
            }
        }
    }

    // ---- templates and for expressions ----

    fn eval_template(&mut self, parts: &[TemplatePart]) -> EvalResult {
        if let [TemplatePart::Interp(only)] = parts {
            return self.eval(only);
        }
        let mut out = String::new();
        for part in parts {
            match part {
                TemplatePart::Literal(s) => out.push_str(s),
                TemplatePart::Interp(e) => {
                    let v = self.eval(e)?;
                    let s = v
                        .as_string()
                        .ok_or_else(|| Unknown::invalid(format!("cannot interpolate a {} value", v.type_name())))?;
                    out.push_str(&s);
                }
            }
        }
        Ok(Value::String(out))
    }

    fn eval_for(&mut self, fe: &crate::ast::ForExpr) -> EvalResult {
        let pairs: Vec<(Value, Value)> = match self.eval(&fe.collection)? {
            Value::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Value::Number(i as f64), v))
                .collect(),
            Value::Map(entries) => entries.into_iter().map(|(k, v)| (Value::String(k), v)).collect(),
            other => {
                return Err(Unknown::invalid(format!("cannot iterate over a {}", other.type_name())));
            }
        };

        let depth = self.scopes.len();
        let result = self.eval_for_items(fe, pairs);
        self.scopes.truncate(depth);
        result
    }

    fn eval_for_items(&mut self, fe: &crate::ast::ForExpr, pairs: Vec<(Value, Value)>) -> EvalResult {
        let depth = self.scopes.len();
        let mut list = Vec::new();
        let mut map: BTreeMap<String, Value> = BTreeMap::new();
        let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();

        for (k, v) in pairs {
            self.scopes.truncate(depth);
            if let Some(key_var) = &fe.key_var {
                self.scopes.push((key_var.clone(), k));
            }
            self.scopes.push((fe.value_var.clone(), v));

            if let Some(cond) = &fe.cond {
                let c = self.eval(cond)?;
                match c.as_bool() {
                    Some(true) => {}
                    Some(false) => continue,
                    None => return Err(Unknown::invalid(format!("for filter must be a bool, got {}", c))),
                }
            }

            let value = self.eval(&fe.value)?;
            let Some(key_expr) = &fe.key else {
                list.push(value);
                continue;
            };
            let key = self.eval(key_expr)?;
            let key = key
                .as_string()
                .ok_or_else(|| Unknown::invalid(format!("for key must be a string, got {}", key)))?;
            if fe.grouping {
                groups.entry(key).or_default().push(value);
            } else if map.contains_key(&key) {
                return Err(Unknown::invalid(format!(
                    "duplicate key \"{}\" in for expression; use '...' to group",
                    key
                )));
            } else {
                map.insert(key, value);
            }
        }

        if fe.grouping {
            map.extend(groups.into_iter().map(|(k, v)| (k, Value::List(v))));
        }
        Ok(if fe.key.is_some() { Value::Map(map) } else { Value::List(list) })
    }

    // ---- validations ----

    /// Error messages of the input's validation blocks that fail for its current value.
    ///
    /// A condition that cannot be evaluated counts as passing: only definite failures
    /// are reported.
    pub fn validation_failures(&mut self, input: &InputDecl) -> Vec<String> {
        let mut failures = Vec::new();
        for validation in &input.validations {
            match self.eval(&validation.condition) {
                Ok(Value::Bool(true)) => {}
                Ok(Value::Bool(false)) => failures.push(validation.error_message.clone()),
                Ok(other) => failures.push(format!("condition produced {} instead of a bool", other.type_name())),
                Err(u) if u.reason == UnknownReason::Invalid => failures.push(u.detail),
                Err(_) => {}
            }
        }
        failures
    }
}

fn splat_step(step: &SplatStep) -> Step<'_> {
    match step {
        SplatStep::Attr(a) => Step::Attr(a),
        SplatStep::Index(e) => Step::Index(e),
    }
}

fn render_path(root: &str, steps: &[Step<'_>]) -> String {
    let mut out = root.to_string();
    for step in steps {
        match step {
            Step::Attr(a) => {
                out.push('.');
                out.push_str(a);
            }
            Step::Index(e) => out.push_str(&format!("[{}]", e.node)),
        }
    }
    out
}

/// Whether an argument reads `count`, `each` or `self` and so differs per instance.
pub fn references_instance(expr: &Spanned<Expr>) -> bool {
    let mut found = false;
    expr.node.walk(&mut |e| {
        if let Expr::Variable(root) = e {
            if matches!(root.as_str(), "count" | "each" | "self") {
                found = true;
            }
        }
    });
    found
}

fn index(value: Value, key: &Value) -> EvalResult {
    match value {
        Value::List(items) => {
            let i = key
                .as_number()
                .filter(|n| n.fract() == 0.0 && *n >= 0.0)
                .ok_or_else(|| Unknown::invalid(format!("list index must be a whole number, got {}", key)))?;
            let len = items.len();
            items
                .into_iter()
                .nth(i as usize)
                .ok_or_else(|| Unknown::invalid(format!("index {} out of range for list of {}", i, len)))
        }
        Value::Map(mut entries) => {
            let k = key
                .as_string()
                .ok_or_else(|| Unknown::invalid(format!("map key must be a string, got {}", key)))?;
            entries
                .remove(&k)
                .ok_or_else(|| Unknown::invalid(format!("map has no element for key \"{}\"", k)))
        }
        Value::Null => Err(Unknown::invalid("cannot index a null value")),
        other => Err(Unknown::invalid(format!("cannot index a {}", other.type_name()))),
    }
}

fn binary(op: BinaryOp, l: Value, r: Value) -> EvalResult {
    let bools = |l: &Value, r: &Value| match (l.as_bool(), r.as_bool()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(Unknown::invalid(format!("'{}' needs bools, got {} and {}", op.symbol(), l, r))),
    };
    let numbers = |l: &Value, r: &Value| match (l.as_number(), r.as_number()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(Unknown::invalid(format!("'{}' needs numbers, got {} and {}", op.symbol(), l, r))),
    };
    Ok(match op {
        BinaryOp::Or => {
            let (a, b) = bools(&l, &r)?;
            Value::Bool(a || b)
        }
        BinaryOp::And => {
            let (a, b) = bools(&l, &r)?;
            Value::Bool(a && b)
        }
        BinaryOp::Eq => Value::Bool(l == r),
        BinaryOp::NotEq => Value::Bool(l != r),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let (a, b) = numbers(&l, &r)?;
            Value::Bool(match op {
                BinaryOp::Lt => a < b,
                BinaryOp::LtEq => a <= b,
                BinaryOp::Gt => a > b,
                _ => a >= b,
            })
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let (a, b) = numbers(&l, &r)?;
            if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b == 0.0 {
                return Err(Unknown::invalid("division by zero"));
            }
            Value::Number(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            })
        }
    })
}

#[cfg(test)]
mod tests;
