//! Scenario enumeration: input value sets that exercise a module's branches and edges.
//!
//! [`enumerate`] builds, in order:
//! 1. the `defaults` scenario (declared defaults, placeholders for required inputs)
//! 2. branch scenarios: for every branch, one scenario driving it true and one driving it
//!    false, unless an earlier scenario already does
//! 3. edge scenarios per input: empty/populated collections, null, numeric bounds and
//!    documented allowed values
//!
//! Every scenario is evaluated with `command = plan`. [`CommandMode`] has no other
//! variant, so a generated scenario cannot ask for an apply.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::config::Config;
use crate::coverage::{CoverageGap, GapKind};
use crate::eval::{Evaluator, UnknownReason, Value};
use crate::interface::{Branch, DeclaredType, InputDecl, ModuleInterface};

mod candidates;
pub mod naming;

use candidates::{Odometer, candidates};
use naming::EdgeIntent;

/// How `terraform test` runs a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandMode {
    Plan,
}

impl fmt::Display for CommandMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandMode::Plan => write!(f, "plan"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    Defaults,
    Branch,
    Edge,
}

/// A branch outcome a scenario was built to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub branch: usize,
    pub outcome: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    pub name: String,
    pub kind: ScenarioKind,
    /// Inputs set by this scenario, beyond the file-level baseline.
    pub overrides: BTreeMap<String, Value>,
    /// Baseline plus overrides: everything the evaluator needs.
    #[serde(skip)]
    pub bindings: BTreeMap<String, Value>,
    pub area: String,
    pub covers: Vec<Requirement>,
    /// One line per reason the scenario exists, for comments in the emitted file.
    pub notes: Vec<String>,
    #[serde(skip)]
    fragments: Vec<String>,
    mode: CommandMode,
}

impl Scenario {
    fn new(kind: ScenarioKind, baseline: &BTreeMap<String, Value>) -> Self {
        Self {
            name: String::new(),
            kind,
            overrides: BTreeMap::new(),
            bindings: baseline.clone(),
            area: String::new(),
            covers: Vec::new(),
            notes: Vec::new(),
            fragments: Vec::new(),
            mode: CommandMode::Plan,
        }
    }

    pub fn mode(&self) -> CommandMode {
        self.mode
    }

    fn set(&mut self, input: &str, value: Value) {
        self.overrides.insert(input.to_string(), value.clone());
        self.bindings.insert(input.to_string(), value);
    }
}

/// The enumerated scenarios of one module.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSet {
    pub scenarios: Vec<Scenario>,
    pub gaps: Vec<CoverageGap>,
    /// Values given to required inputs in every scenario.
    pub baseline: BTreeMap<String, Value>,
}

/// Which scenarios drive a branch which way.
#[derive(Debug, Clone, Serialize)]
pub struct BranchCoverage {
    pub branch: usize,
    pub condition: String,
    pub when_true: Vec<String>,
    pub when_false: Vec<String>,
    pub unknown: Vec<String>,
}

impl ScenarioSet {
    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Evaluate every branch in every scenario.
    pub fn coverage(&self, module: &ModuleInterface) -> Vec<BranchCoverage> {
        module
            .branches
            .iter()
            .map(|branch| {
                let mut cov = BranchCoverage {
                    branch: branch.id,
                    condition: branch.key.clone(),
                    when_true: Vec::new(),
                    when_false: Vec::new(),
                    unknown: Vec::new(),
                };
                for scenario in &self.scenarios {
                    match outcome(module, &scenario.bindings, branch) {
                        Ok(true) => cov.when_true.push(scenario.name.clone()),
                        Ok(false) => cov.when_false.push(scenario.name.clone()),
                        Err(_) => cov.unknown.push(scenario.name.clone()),
                    }
                }
                cov
            })
            .collect()
    }
}

/// Evaluate a branch condition to a bool.
fn outcome(module: &ModuleInterface, bindings: &BTreeMap<String, Value>, branch: &Branch) -> Result<bool, UnknownReason> {
    match Evaluator::new(module, bindings).eval(&branch.condition) {
        Ok(v) => v.as_bool().ok_or(UnknownReason::Invalid),
        Err(u) => Err(u.reason),
    }
}

// ============================================================================
// Enumeration
// ============================================================================

/// Enumerate scenarios for a module.
#[tracing::instrument(skip_all, fields(module = %module.name))]
pub fn enumerate(module: &ModuleInterface, config: &Config) -> ScenarioSet {
    let mut en = Enumerator {
        module,
        config,
        baseline: BTreeMap::new(),
        scenarios: Vec::new(),
        gaps: Vec::new(),
    };
    en.baseline();
    en.scenarios.push(Scenario {
        fragments: vec!["defaults".to_string()],
        notes: vec!["declared defaults only".to_string()],
        ..Scenario::new(ScenarioKind::Defaults, &en.baseline)
    });
    en.branches();
    en.edges();
    en.finish()
}

struct Enumerator<'m> {
    module: &'m ModuleInterface,
    config: &'m Config,
    baseline: BTreeMap<String, Value>,
    scenarios: Vec<Scenario>,
    gaps: Vec<CoverageGap>,
}

impl<'m> Enumerator<'m> {
    /// Placeholder values for required inputs, chosen to pass validations.
    fn baseline(&mut self) {
        for input in self.module.inputs.iter().filter(|i| i.is_required()) {
            let mut tried = Vec::new();
            tried.extend(input.ty.placeholder());
            if let Some(allowed) = self.module.facts(&input.name).and_then(|f| f.allowed.as_ref()) {
                tried.extend(allowed.iter().filter_map(|v| input.ty.convert(v.clone()).ok()));
            }
            for c in candidates(self.module, input, None) {
                if !c.is_null() && !tried.contains(&c) {
                    tried.push(c);
                }
            }

            let chosen = tried.into_iter().find(|candidate| {
                let mut trial = self.baseline.clone();
                trial.insert(input.name.clone(), candidate.clone());
                Evaluator::new(self.module, &trial).validation_failures(input).is_empty()
            });
            match chosen {
                Some(v) => {
                    tracing::debug!(input = %input.name, value = %v, "baseline placeholder");
                    self.baseline.insert(input.name.clone(), v);
                }
                None => {
                    let detail = if input.type_unknown() {
                        format!("required input of unresolved type {}; set it in the generated variables block", input.ty)
                    } else {
                        "no candidate value satisfies its validations; set it in the generated variables block".to_string()
                    };
                    tracing::warn!(input = %input.name, "{}", detail);
                    self.gaps
                        .push(CoverageGap::new(GapKind::UnsynthesizableInput, format!("var.{}", input.name), detail));
                }
            }
        }
    }

    /// The value an input has when no scenario overrides it.
    fn base_value(&self, input: &InputDecl) -> Option<Value> {
        self.baseline.get(&input.name).cloned().or_else(|| input.default.clone())
    }

    fn validations_pass<'a>(&self, bindings: &BTreeMap<String, Value>, inputs: impl IntoIterator<Item = &'a str>) -> bool {
        let mut evaluator = Evaluator::new(self.module, bindings);
        for name in inputs {
            if let Some(input) = self.module.input(name) {
                let failures = evaluator.validation_failures(input);
                if !failures.is_empty() {
                    tracing::debug!(input = name, failures = ?failures, "candidate rejected by validation");
                    return false;
                }
            }
        }
        true
    }

    // ---- branches ----

    fn branches(&mut self) {
        let module = self.module;
        for branch in &module.branches {
            for outcome in [true, false] {
                self.require(branch, outcome);
            }
        }
    }

    fn require(&mut self, branch: &'m Branch, want: bool) {
        if self
            .scenarios
            .iter()
            .any(|s| outcome(self.module, &s.bindings, branch) == Ok(want))
        {
            tracing::debug!(branch = branch.id, outcome = want, "already covered");
            return;
        }

        let inputs: Vec<&'m InputDecl> = branch
            .drivers
            .iter()
            .filter_map(|d| self.module.input(d))
            .collect();
        let lists: Vec<Vec<Value>> = inputs
            .iter()
            .map(|input| candidates(self.module, input, self.base_value(input).as_ref()))
            .collect();

        let mut last_unknown: Option<(UnknownReason, String)> = None;
        let mut found: Option<BTreeMap<String, Value>> = None;
        for combo in Odometer::new(&lists).take(self.config.generate.max_combinations) {
            let mut trial = self.baseline.clone();
            let mut overrides = BTreeMap::new();
            for (input, value) in inputs.iter().zip(combo) {
                trial.insert(input.name.clone(), value.clone());
                if self.base_value(input).as_ref() != Some(value) {
                    overrides.insert(input.name.clone(), value.clone());
                }
            }
            if overrides.is_empty() || !self.validations_pass(&trial, inputs.iter().map(|i| i.name.as_str())) {
                continue;
            }
            match Evaluator::new(self.module, &trial).eval(&branch.condition) {
                Ok(v) if v.as_bool() == Some(want) => {
                    found = Some(overrides);
                    break;
                }
                Ok(_) => {}
                Err(u) if u.reason != UnknownReason::Invalid => last_unknown = Some((u.reason, u.detail)),
                Err(_) => {}
            }
        }

        let requirement = Requirement {
            branch: branch.id,
            outcome: want,
        };
        let Some(overrides) = found else {
            let gap = match last_unknown {
                Some((reason, detail)) => CoverageGap::new(reason.into(), branch.subject(want), detail),
                None => CoverageGap::new(
                    GapKind::UnreachableBranch,
                    branch.subject(want),
                    format!(
                        "no combination of {} within {} candidates makes `{}` {}",
                        branch.drivers.join(", "),
                        self.config.generate.max_combinations,
                        branch.key,
                        want
                    ),
                ),
            };
            tracing::warn!(gap = %gap, "branch not covered");
            self.gaps.push(gap);
            return;
        };

        let note = format!("drives `{}` {}", branch.key, want);
        if self.config.generate.combine_independent_branches && self.merge(&overrides, requirement, &note) {
            return;
        }

        let mut scenario = Scenario::new(ScenarioKind::Branch, &self.baseline);
        for (k, v) in &overrides {
            scenario.set(k, v.clone());
        }
        scenario.fragments.push(self.fragment(&overrides));
        scenario.covers.push(requirement);
        scenario.notes.push(note);
        self.scenarios.push(scenario);
    }

    /// Fold `overrides` into an earlier branch scenario that sets none of the same inputs.
    fn merge(&mut self, overrides: &BTreeMap<String, Value>, requirement: Requirement, note: &str) -> bool {
        for idx in 0..self.scenarios.len() {
            let scenario = &self.scenarios[idx];
            if scenario.kind != ScenarioKind::Branch || overrides.keys().any(|k| scenario.overrides.contains_key(k)) {
                continue;
            }
            let mut merged = scenario.bindings.clone();
            merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

            let touched: BTreeSet<&str> = scenario
                .overrides
                .keys()
                .chain(overrides.keys())
                .map(String::as_str)
                .collect();
            let still_holds = scenario
                .covers
                .iter()
                .chain(std::iter::once(&requirement))
                .all(|r| outcome(self.module, &merged, &self.module.branches[r.branch]) == Ok(r.outcome));
            if !still_holds || self.loses_coverage(idx, &merged) || !self.validations_pass(&merged, touched) {
                continue;
            }

            let fragment = self.fragment(overrides);
            let scenario = &mut self.scenarios[idx];
            for (k, v) in overrides {
                scenario.set(k, v.clone());
            }
            scenario.fragments.push(fragment);
            scenario.covers.push(requirement);
            scenario.notes.push(note.to_string());
            tracing::debug!(scenario = idx, branch = requirement.branch, "merged into existing scenario");
            return true;
        }
        false
    }

    /// Whether replacing scenario `idx`'s bindings with `merged` leaves some branch outcome
    /// the set currently produces with no scenario producing it.
    fn loses_coverage(&self, idx: usize, merged: &BTreeMap<String, Value>) -> bool {
        let before = &self.scenarios[idx].bindings;
        self.module.branches.iter().any(|branch| {
            let Ok(was) = outcome(self.module, before, branch) else {
                return false;
            };
            if outcome(self.module, merged, branch) == Ok(was) {
                return false;
            }
            let elsewhere = self
                .scenarios
                .iter()
                .enumerate()
                .any(|(j, s)| j != idx && outcome(self.module, &s.bindings, branch) == Ok(was));
            if !elsewhere {
                tracing::debug!(branch = branch.id, outcome = was, "merge rejected: outcome would be lost");
            }
            !elsewhere
        })
    }

    /// Name fragment for a set of overrides, inputs in declaration order.
    fn fragment(&self, overrides: &BTreeMap<String, Value>) -> String {
        let mut keys: Vec<&String> = overrides.keys().collect();
        keys.sort_by_key(|k| self.module.input_index(k));
        let parts: Vec<String> = keys
            .into_iter()
            .map(|k| naming::fragment(k, &overrides[k], None))
            .collect();
        naming::join(&parts)
    }

    // ---- edges ----

    fn edges(&mut self) {
        let module = self.module;
        for input in &module.inputs {
            let base = self.base_value(input);
            for (value, intent, note) in self.edge_values(input, base.as_ref()) {
                if base.as_ref() == Some(&value) {
                    continue;
                }
                let taken = self
                    .scenarios
                    .iter()
                    .any(|s| s.overrides.get(&input.name) == Some(&value));
                if taken {
                    continue;
                }
                let mut trial = self.baseline.clone();
                trial.insert(input.name.clone(), value.clone());
                if !self.validations_pass(&trial, std::iter::once(input.name.as_str())) {
                    continue;
                }

                let mut scenario = Scenario::new(ScenarioKind::Edge, &self.baseline);
                scenario.fragments.push(naming::fragment(&input.name, &value, intent));
                scenario.set(&input.name, value);
                scenario.notes.push(note);
                self.scenarios.push(scenario);
            }
        }
    }

    /// Documented edge values of an input, with the intent they exercise.
    fn edge_values(&self, input: &InputDecl, base: Option<&Value>) -> Vec<(Value, Option<EdgeIntent>, String)> {
        let mut out = Vec::new();
        let facts = self.module.facts(&input.name);
        let default_null = matches!(input.default, Some(Value::Null));

        if matches!(input.ty, DeclaredType::List(_) | DeclaredType::Set(_) | DeclaredType::Map(_)) {
            let base_is_empty = base.is_none_or(|b| b.is_null() || b.is_empty());
            if base_is_empty {
                if let Some(sample) = input.ty.populated_sample() {
                    let intent = default_null.then_some(EdgeIntent::Set);
                    out.push((sample, intent, format!("{} with two entries", input.name)));
                }
            }
            if !base.is_some_and(|b| b.is_empty()) {
                if let Some(empty) = input.ty.placeholder() {
                    out.push((empty, None, format!("{} empty", input.name)));
                }
            }
        } else if default_null {
            let value = facts
                .and_then(|f| f.allowed.as_ref().and_then(|a| a.first().cloned()))
                .or_else(|| facts.and_then(|f| f.compared.first().cloned()))
                .or_else(|| input.ty.placeholder());
            if let Some(value) = value.and_then(|v| input.ty.convert(v).ok()) {
                out.push((value, Some(EdgeIntent::Set), format!("{} given a value", input.name)));
            }
        }

        if input.nullable_declared && base.is_some_and(|b| !b.is_null()) {
            out.push((Value::Null, None, format!("{} explicitly null", input.name)));
        }

        if let Some(facts) = facts {
            if let Some(min) = facts.minimum() {
                out.push((Value::Number(min), Some(EdgeIntent::Minimum), format!("{} at its documented minimum", input.name)));
            }
            if let Some(max) = facts.maximum() {
                out.push((Value::Number(max), Some(EdgeIntent::Maximum), format!("{} at its documented maximum", input.name)));
            }
            for allowed in facts.allowed.iter().flatten() {
                if let Ok(v) = input.ty.convert(allowed.clone()) {
                    out.push((v, None, format!("{} set to documented value {}", input.name, allowed)));
                }
            }
        }
        out
    }

    // ---- finish ----

    fn finish(mut self) -> ScenarioSet {
        let mut names: Vec<String> = self.scenarios.iter().map(|s| naming::join(&s.fragments)).collect();
        naming::make_unique(&mut names);
        let areas: Vec<String> = self.scenarios.iter().map(|s| self.area(s)).collect();
        for ((scenario, name), area) in self.scenarios.iter_mut().zip(names).zip(areas) {
            scenario.name = name;
            scenario.area = area;
        }
        tracing::info!(
            scenarios = self.scenarios.len(),
            gaps = self.gaps.len(),
            "enumerated scenarios"
        );
        ScenarioSet {
            scenarios: self.scenarios,
            gaps: self.gaps,
            baseline: self.baseline,
        }
    }

    /// First overridden input, in declaration order, that belongs to a configured area.
    fn area(&self, scenario: &Scenario) -> String {
        self.module
            .inputs
            .iter()
            .filter(|i| scenario.overrides.contains_key(&i.name))
            .find_map(|i| self.config.area_for(&i.name))
            .unwrap_or("main")
            .to_string()
    }
}

#[cfg(test)]
mod tests;
