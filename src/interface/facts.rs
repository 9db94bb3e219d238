//! Per-input facts that hint at interesting values: compared literals, allowed sets, bounds.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ast::{BinaryOp, Expr, Spanned};
use crate::eval::{self, Value};

use super::ModuleInterface;

/// A numeric limit taken from a validation condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bound {
    pub value: f64,
    pub inclusive: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputFacts {
    /// Literals the input (or a value derived only from it) is compared against.
    pub compared: Vec<Value>,
    /// `contains([...], var.x)` in a validation.
    pub allowed: Option<Vec<Value>>,
    pub min: Option<Bound>,
    pub max: Option<Bound>,
}

impl InputFacts {
    /// Smallest whole number the bounds admit.
    pub fn minimum(&self) -> Option<f64> {
        self.min
            .map(|b| if b.inclusive { b.value } else { b.value.floor() + 1.0 })
    }

    /// Largest whole number the bounds admit.
    pub fn maximum(&self) -> Option<f64> {
        self.max
            .map(|b| if b.inclusive { b.value } else { b.value.ceil() - 1.0 })
    }

    fn compare(&mut self, value: Value) {
        if value.is_scalar() && !self.compared.contains(&value) {
            self.compared.push(value);
        }
    }
}

pub(super) fn collect(module: &ModuleInterface) -> BTreeMap<String, InputFacts> {
    let mut facts: BTreeMap<String, InputFacts> = BTreeMap::new();

    let mut exprs: Vec<&Spanned<Expr>> = Vec::new();
    exprs.extend(module.outputs.iter().map(|o| &o.value));
    exprs.extend(module.locals.iter().map(|l| &l.value));
    for res in &module.resources {
        exprs.extend(res.count.iter().chain(res.for_each.iter()).chain(res.args.values()));
    }
    for input in &module.inputs {
        exprs.extend(input.validations.iter().map(|v| &v.condition));
    }

    for expr in exprs {
        expr.node.walk(&mut |e| comparisons(module, e, &mut facts));
    }

    for input in &module.inputs {
        for validation in &input.validations {
            validation
                .condition
                .node
                .walk(&mut |e| constraints(&input.name, e, facts.entry(input.name.clone()).or_default()));
        }
    }
    facts
}

/// `<input-derived> == <literal>` anywhere in the module.
fn comparisons(module: &ModuleInterface, e: &Expr, facts: &mut BTreeMap<String, InputFacts>) {
    match e {
        Expr::Binary(l, op, r) if op.is_predicate() && !matches!(op, BinaryOp::And | BinaryOp::Or) => {
            for (side, other) in [(l, r), (r, l)] {
                let Ok(value) = eval::constant(other) else {
                    continue;
                };
                if let [input] = module.input_deps(side).as_slice() {
                    facts.entry(input.clone()).or_default().compare(value);
                }
            }
        }
        Expr::Call { name, args, .. } if name == "contains" && args.len() == 2 => {
            let Ok(Value::List(items)) = eval::constant(&args[0]) else {
                return;
            };
            if let [input] = module.input_deps(&args[1]).as_slice() {
                let entry = facts.entry(input.clone()).or_default();
                for item in items {
                    entry.compare(item);
                }
            }
        }
        _ => {}
    }
}

/// Allowed sets and bounds from an input's own validation conditions.
fn constraints(input: &str, e: &Expr, facts: &mut InputFacts) {
    match e {
        Expr::Call { name, args, .. } if name == "contains" && args.len() == 2 => {
            if args[1].node.as_input_ref() != Some(input) || facts.allowed.is_some() {
                return;
            }
            if let Ok(Value::List(items)) = eval::constant(&args[0]) {
                facts.allowed = Some(items);
            }
        }
        Expr::Binary(l, op, r) => {
            let (bound_expr, op) = if l.node.as_input_ref() == Some(input) {
                (r, *op)
            } else if r.node.as_input_ref() == Some(input) {
                (l, flip(*op))
            } else {
                return;
            };
            let Some(value) = eval::constant(bound_expr).ok().and_then(|v| v.as_number()) else {
                return;
            };
            match op {
                BinaryOp::Gt | BinaryOp::GtEq => {
                    facts.min = Some(Bound {
                        value,
                        inclusive: op == BinaryOp::GtEq,
                    });
                }
                BinaryOp::Lt | BinaryOp::LtEq => {
                    facts.max = Some(Bound {
                        value,
                        inclusive: op == BinaryOp::LtEq,
                    });
                }
                _ => {}
            }
        }
        _ => {}
    }
}

/// `5 <= var.x` reads as `var.x >= 5`.
fn flip(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Lt => BinaryOp::Gt,
        BinaryOp::LtEq => BinaryOp::GtEq,
        BinaryOp::Gt => BinaryOp::Lt,
        BinaryOp::GtEq => BinaryOp::LtEq,
        other => other,
    }
}
