//! Branch discovery and input dependency analysis.

use std::collections::{BTreeSet, HashSet};

use crate::ast::{Expr, SplatStep, Spanned};
use crate::eval::{Step, references_instance, traversal};

use super::ModuleInterface;

/// An input-dependent condition.
#[derive(Debug, Clone)]
pub struct Branch {
    pub id: usize,
    /// Canonical condition text; identical conditions share one branch.
    pub key: String,
    pub condition: Spanned<Expr>,
    /// Where the condition appears, e.g. `output.backup_enabled` or `aws_s3_bucket.logs.count`.
    pub origins: Vec<String>,
    /// Inputs the condition depends on, in declaration order.
    pub drivers: Vec<String>,
}

impl Branch {
    /// Gap subject for one outcome of this branch: `local.is_prod[false]`.
    pub fn subject(&self, outcome: bool) -> String {
        let origin = self.origins.first().map(String::as_str).unwrap_or("branch");
        format!("{}[{}]", origin, outcome)
    }
}

pub(super) fn discover(module: &ModuleInterface) -> Vec<Branch> {
    let mut d = Discovery {
        module,
        branches: Vec::new(),
    };
    for local in &module.locals {
        d.root(&local.value, format!("local.{}", local.name));
    }
    for output in &module.outputs {
        d.root(&output.value, format!("output.{}", output.name));
    }
    for res in &module.resources {
        let addr = res.address();
        if let Some(count) = &res.count {
            d.scan(count, &format!("{}.count", addr), false);
        }
        if let Some(for_each) = &res.for_each {
            d.scan(for_each, &format!("{}.for_each", addr), false);
        }
        for (name, arg) in &res.args {
            d.scan(arg, &format!("{}.{}", addr, name), false);
        }
    }
    for branch in &d.branches {
        tracing::debug!(id = branch.id, condition = %branch.key, drivers = ?branch.drivers, "branch");
    }
    d.branches
}

struct Discovery<'m> {
    module: &'m ModuleInterface,
    branches: Vec<Branch>,
}

impl<'m> Discovery<'m> {
    /// Outputs and locals: a predicate at the root is itself a branch.
    fn root(&mut self, expr: &Spanned<Expr>, origin: String) {
        if self.resolve_alias(expr).node.is_predicate() {
            self.add(expr, &origin);
        }
        self.scan(expr, &origin, false);
    }

    /// Follow `local.x` references that are nothing but another expression.
    fn resolve_alias<'e>(&self, mut expr: &'e Spanned<Expr>) -> &'e Spanned<Expr>
    where
        'm: 'e,
    {
        for _ in 0..16 {
            let Expr::GetAttr(base, name) = expr.node.unparen() else {
                break;
            };
            if !matches!(&base.node, Expr::Variable(root) if root == "local") {
                break;
            }
            match self.module.local(name) {
                Some(local) => expr = &local.value,
                None => break,
            }
        }
        expr
    }

    fn scan(&mut self, expr: &Spanned<Expr>, origin: &str, in_for: bool) {
        match &expr.node {
            Expr::Conditional { cond, .. } if !in_for => {
                self.add(cond, origin);
                expr.node.for_each_child(&mut |c| self.scan(c, origin, in_for));
            }
            // Conditions inside a `for` body depend on the iteration variables.
            Expr::For(fe) => {
                self.scan(&fe.collection, origin, in_for);
                if let Some(k) = &fe.key {
                    self.scan(k, origin, true);
                }
                self.scan(&fe.value, origin, true);
                if let Some(c) = &fe.cond {
                    self.scan(c, origin, true);
                }
            }
            _ => expr.node.for_each_child(&mut |c| self.scan(c, origin, in_for)),
        }
    }

    fn add(&mut self, cond: &Spanned<Expr>, origin: &str) {
        if references_instance(cond) {
            return;
        }
        let drivers = self.module.input_deps(cond);
        if drivers.is_empty() {
            return;
        }
        let key = self.resolve_alias(cond).node.unparen().to_string();
        if let Some(existing) = self.branches.iter_mut().find(|b| b.key == key) {
            if !existing.origins.iter().any(|o| o == origin) {
                existing.origins.push(origin.to_string());
            }
            return;
        }
        self.branches.push(Branch {
            id: self.branches.len(),
            key,
            condition: cond.clone(),
            origins: vec![origin.to_string()],
            drivers,
        });
    }
}

// ============================================================================
// Dependencies
// ============================================================================

impl ModuleInterface {
    /// Inputs an expression depends on, following locals and resource arguments.
    ///
    /// Returned in declaration order.
    pub fn input_deps(&self, expr: &Spanned<Expr>) -> Vec<String> {
        let mut found = BTreeSet::new();
        let mut seen = HashSet::new();
        self.collect_deps(expr, &mut found, &mut seen);
        found.into_iter().map(|i| self.inputs[i].name.clone()).collect()
    }

    fn collect_deps(&self, expr: &Spanned<Expr>, found: &mut BTreeSet<usize>, seen: &mut HashSet<String>) {
        match &expr.node {
            Expr::Variable(_) | Expr::GetAttr(..) | Expr::Index(..) => {
                let (base, steps) = traversal(expr);
                self.step_deps(&steps, found, seen);
                let attrs: Vec<Option<&str>> = steps.iter().map(step_attr).collect();
                match &base.node {
                    Expr::Variable(root) => self.reference_deps(root, &attrs, found, seen),
                    _ => self.collect_deps(base, found, seen),
                }
            }
            Expr::Splat(base, splat) => {
                let (root, steps) = traversal(base);
                self.step_deps(&steps, found, seen);
                let mut attrs: Vec<Option<&str>> = steps.iter().map(step_attr).collect();
                for step in splat {
                    match step {
                        SplatStep::Attr(a) => attrs.push(Some(a.as_str())),
                        SplatStep::Index(e) => {
                            self.collect_deps(e, found, seen);
                            attrs.push(None);
                        }
                    }
                }
                match &root.node {
                    Expr::Variable(name) => self.reference_deps(name, &attrs, found, seen),
                    _ => self.collect_deps(root, found, seen),
                }
            }
            other => other.for_each_child(&mut |c| self.collect_deps(c, found, seen)),
        }
    }

    fn step_deps(&self, steps: &[Step<'_>], found: &mut BTreeSet<usize>, seen: &mut HashSet<String>) {
        for step in steps {
            if let Step::Index(e) = step {
                self.collect_deps(e, found, seen);
            }
        }
    }

    fn reference_deps(
        &self,
        root: &str,
        attrs: &[Option<&str>],
        found: &mut BTreeSet<usize>,
        seen: &mut HashSet<String>,
    ) {
        let Some(Some(name)) = attrs.first() else {
            return;
        };
        match root {
            "var" => {
                if let Some(i) = self.input_index(name) {
                    found.insert(i);
                }
            }
            "local" => {
                if seen.insert(format!("local.{}", name)) {
                    if let Some(local) = self.local(name) {
                        self.collect_deps(&local.value, found, seen);
                    }
                }
            }
            _ => {
                let Some(res) = self.resource(root, name) else {
                    return;
                };
                let attr = attrs[1..].iter().flatten().next();
                let (key, exprs): (String, Vec<&Spanned<Expr>>) = match attr {
                    Some(a) => (
                        format!("{}.{}", res.address(), a),
                        res.args.get(*a).into_iter().collect(),
                    ),
                    None => (
                        format!("{}#instances", res.address()),
                        res.count.iter().chain(res.for_each.iter()).collect(),
                    ),
                };
                if seen.insert(key) {
                    for e in exprs {
                        self.collect_deps(e, found, seen);
                    }
                }
            }
        }
    }
}

fn step_attr<'a>(step: &Step<'a>) -> Option<&'a str> {
    match step {
        Step::Attr(a) => Some(*a),
        Step::Index(_) => None,
    }
}
