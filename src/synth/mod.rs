//! Assertion synthesis: expected output values per scenario.
//!
//! Each output of interest is evaluated against a scenario's bindings. Known values
//! become `assert` blocks; anything the evaluator cannot settle under plan becomes a
//! [`CoverageGap`] instead.
//!
//! ## Notes
//! - Collections are asserted through `length(...)` plus a bounded number of
//!   per-element checks on scalar elements. Set-typed outputs get the length only,
//!   since sets cannot be indexed.
//! - Synthesis is a pure function of the interface, the scenarios and the config.

use serde::Serialize;

use crate::ast::{Expr, Spanned, quote_string};
use crate::config::Config;
use crate::coverage::{self, CoverageGap, GapKind};
use crate::eval::{Evaluator, Value};
use crate::interface::{ModuleInterface, OutputDecl, ResourceDecl, ResourceMode};
use crate::scenario::{Scenario, ScenarioSet};

/// A predicate over one output (or resource count) with its failure explanation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assertion {
    /// `output.backup_enabled`, `output.merged_ips["10.0.0.1/32"]`, `aws_s3_bucket.logs`.
    pub subject: String,
    /// HCL condition, e.g. `output.backup_enabled == true`.
    pub condition: String,
    pub error_message: String,
}

/// Assertions of one scenario, in output declaration order.
#[derive(Debug, Clone, Serialize)]
pub struct RunAssertions {
    pub scenario: String,
    pub assertions: Vec<Assertion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Synthesis {
    pub runs: Vec<RunAssertions>,
    pub gaps: Vec<CoverageGap>,
}

impl Synthesis {
    pub fn assertions_for(&self, scenario: &str) -> &[Assertion] {
        self.runs
            .iter()
            .find(|r| r.scenario == scenario)
            .map(|r| r.assertions.as_slice())
            .unwrap_or(&[])
    }

    pub fn assertion_count(&self) -> usize {
        self.runs.iter().map(|r| r.assertions.len()).sum()
    }
}

/// Synthesize assertions for every scenario of a set.
#[tracing::instrument(skip_all, fields(module = %module.name, scenarios = set.scenarios.len()))]
pub fn synthesize(module: &ModuleInterface, set: &ScenarioSet, config: &Config) -> Synthesis {
    let mut gaps = Vec::new();
    let outputs = outputs_of_interest(module, config, &mut gaps);

    let mut runs = Vec::with_capacity(set.scenarios.len());
    for scenario in &set.scenarios {
        let mut ctx = RunContext {
            module,
            config,
            scenario,
            assertions: Vec::new(),
            gaps: Vec::new(),
        };
        for output in &outputs {
            ctx.output(output);
        }
        if config.generate.assert_resource_counts {
            for res in module
                .resources
                .iter()
                .filter(|r| r.mode == ResourceMode::Managed && r.is_multi())
            {
                ctx.resource_count(res);
            }
        }
        tracing::debug!(
            scenario = %scenario.name,
            assertions = ctx.assertions.len(),
            gaps = ctx.gaps.len(),
            "synthesized run"
        );
        gaps.extend(ctx.gaps);
        runs.push(RunAssertions {
            scenario: scenario.name.clone(),
            assertions: ctx.assertions,
        });
    }

    let gaps = coverage::collapse(gaps, set.scenarios.len());
    for gap in &gaps {
        tracing::warn!(gap = %gap, "coverage gap");
    }
    Synthesis { runs, gaps }
}

/// Configured outputs (or every output), sensitive ones diverted to gaps.
fn outputs_of_interest<'m>(
    module: &'m ModuleInterface,
    config: &Config,
    gaps: &mut Vec<CoverageGap>,
) -> Vec<&'m OutputDecl> {
    let wanted = &config.generate.outputs;
    for name in wanted.iter().filter(|n| module.output(n).is_none()) {
        tracing::warn!(output = %name, "configured output is not declared by the module");
    }
    module
        .outputs
        .iter()
        .filter(|o| wanted.is_empty() || wanted.contains(&o.name))
        .filter(|o| {
            if o.sensitive {
                gaps.push(CoverageGap::new(
                    GapKind::Sensitive,
                    format!("output.{}", o.name),
                    "output is marked sensitive; its value is not asserted on",
                ));
            }
            !o.sensitive
        })
        .collect()
}

struct RunContext<'a> {
    module: &'a ModuleInterface,
    config: &'a Config,
    scenario: &'a Scenario,
    assertions: Vec<Assertion>,
    gaps: Vec<CoverageGap>,
}

impl RunContext<'_> {
    fn output(&mut self, output: &OutputDecl) {
        let subject = format!("output.{}", output.name);
        let value = match Evaluator::new(self.module, &self.scenario.bindings).eval(&output.value) {
            Ok(v) => v,
            Err(unknown) => {
                self.gaps
                    .push(CoverageGap::from_unknown(&subject, &unknown).in_scenario(&self.scenario.name));
                return;
            }
        };
        let when = self.governing(&output.value);

        match &value {
            Value::List(items) => {
                self.length(&subject, items.len(), &when);
                if !is_set_valued(&output.value) {
                    let entries = items.iter().enumerate().map(|(i, v)| (format!("[{}]", i), v));
                    self.entries(&subject, entries, &when);
                }
            }
            Value::Map(entries) => {
                self.length(&subject, entries.len(), &when);
                let entries = entries.iter().map(|(k, v)| (format!("[{}]", quote_string(k)), v));
                self.entries(&subject, entries, &when);
            }
            scalar => self.equals(subject, scalar, &when),
        }
    }

    fn resource_count(&mut self, res: &ResourceDecl) {
        let subject = res.address();
        let n = match Evaluator::new(self.module, &self.scenario.bindings).instance_count(res) {
            Ok(n) => n,
            Err(unknown) => {
                self.gaps
                    .push(CoverageGap::from_unknown(&subject, &unknown).in_scenario(&self.scenario.name));
                return;
            }
        };
        let driver = res.count.as_ref().or(res.for_each.as_ref());
        let when = driver.map(|e| self.governing(e)).unwrap_or_default();
        self.length(&subject, n, &when);
    }

    fn length(&mut self, subject: &str, n: usize, when: &str) {
        let noun = if n == 1 { "entry" } else { "entries" };
        self.assertions.push(Assertion {
            subject: subject.to_string(),
            condition: format!("length({}) == {}", subject, n),
            error_message: format!("{} should have {} {} {}", subject, n, noun, when),
        });
    }

    fn entries<'v>(&mut self, subject: &str, entries: impl Iterator<Item = (String, &'v Value)>, when: &str) {
        let limit = self.config.generate.max_entry_assertions;
        for (index, value) in entries.filter(|(_, v)| v.is_scalar()).take(limit) {
            self.equals(format!("{}{}", subject, index), value, when);
        }
    }

    fn equals(&mut self, subject: String, value: &Value, when: &str) {
        let expectation = if value.is_null() {
            "be null".to_string()
        } else {
            format!("equal {}", value.to_hcl())
        };
        self.assertions.push(Assertion {
            condition: format!("{} == {}", subject, value.to_hcl()),
            error_message: format!("{} should {} {}", subject, expectation, when),
            subject,
        });
    }

    /// `when a = 1, b = "x"`, `... (using defaults)` or `regardless of inputs`.
    fn governing(&self, expr: &Spanned<Expr>) -> String {
        let deps = self.module.input_deps(expr);
        if deps.is_empty() {
            return "regardless of inputs".to_string();
        }
        let pairs: Vec<String> = deps
            .iter()
            .map(|name| {
                let value = self
                    .scenario
                    .bindings
                    .get(name)
                    .cloned()
                    .or_else(|| self.module.input(name).and_then(|i| i.default.clone()))
                    .unwrap_or(Value::Null);
                format!("{} = {}", name, value.to_hcl())
            })
            .collect();
        let overridden = deps.iter().any(|d| self.scenario.overrides.contains_key(d));
        let suffix = if overridden { "" } else { " (using defaults)" };
        format!("when {}{}", pairs.join(", "), suffix)
    }
}

/// Outputs built by a set function lose their element order under Terraform.
fn is_set_valued(expr: &Spanned<Expr>) -> bool {
    match expr.node.unparen() {
        Expr::Call { name, .. } => matches!(
            name.as_str(),
            "toset" | "setunion" | "setintersection" | "setsubtract" | "setproduct"
        ),
        _ => false,
    }
}
