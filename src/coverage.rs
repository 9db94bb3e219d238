//! Coverage gaps: what could not be asserted under plan, and why.
//!
//! Gaps are never dropped. Every stage that gives up on something records a
//! [`CoverageGap`], and the CLI prints them all, marking the ones the module's
//! config acknowledges.

use std::fmt;

use serde::Serialize;

use crate::config::GapsConfig;
use crate::eval::{Unknown, UnknownReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GapKind {
    /// Needs a value only known after apply (resource attributes computed by the provider).
    AfterApply,
    /// Outside what the evaluator models.
    NotDerivable,
    /// Terraform would reject the expression with the scenario's inputs.
    PlanError,
    /// Output marked sensitive; its value is not asserted on.
    Sensitive,
    /// No input combination within the search budget drives the branch this way.
    UnreachableBranch,
    /// A required input for which no value could be synthesized.
    UnsynthesizableInput,
}

impl GapKind {
    pub fn label(self) -> &'static str {
        match self {
            GapKind::AfterApply => "after-apply",
            GapKind::NotDerivable => "not-derivable",
            GapKind::PlanError => "plan-error",
            GapKind::Sensitive => "sensitive",
            GapKind::UnreachableBranch => "unreachable-branch",
            GapKind::UnsynthesizableInput => "unsynthesizable-input",
        }
    }
}

impl From<UnknownReason> for GapKind {
    fn from(reason: UnknownReason) -> Self {
        match reason {
            UnknownReason::AfterApply => GapKind::AfterApply,
            UnknownReason::NotDerivable => GapKind::NotDerivable,
            UnknownReason::Invalid => GapKind::PlanError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageGap {
    pub kind: GapKind,
    /// What is not covered: `output.bucket_arn`, `local.is_prod[false]`, `var.blob`.
    pub subject: String,
    /// `None` when the gap applies to every scenario.
    pub scenario: Option<String>,
    pub detail: String,
}

impl CoverageGap {
    pub fn new(kind: GapKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            scenario: None,
            detail: detail.into(),
        }
    }

    pub fn from_unknown(subject: impl Into<String>, unknown: &Unknown) -> Self {
        Self::new(unknown.reason.into(), subject, unknown.detail.clone())
    }

    pub fn in_scenario(mut self, scenario: &str) -> Self {
        self.scenario = Some(scenario.to_string());
        self
    }
}

impl fmt::Display for CoverageGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.label(), self.subject)?;
        if let Some(scenario) = &self.scenario {
            write!(f, " (scenario {})", scenario)?;
        }
        write!(f, ": {}", self.detail)
    }
}

/// Fold per-scenario gaps that occur in every scenario into one scenario-less gap.
///
/// Order of first occurrence is kept.
pub fn collapse(gaps: Vec<CoverageGap>, scenario_count: usize) -> Vec<CoverageGap> {
    let key = |g: &CoverageGap| (g.kind, g.subject.clone(), g.detail.clone());
    let mut out: Vec<CoverageGap> = Vec::new();
    for gap in &gaps {
        if gap.scenario.is_some() {
            let k = key(gap);
            let occurrences = gaps.iter().filter(|g| g.scenario.is_some() && key(g) == k).count();
            if scenario_count > 1 && occurrences == scenario_count {
                if !out.iter().any(|g| g.scenario.is_none() && key(g) == k) {
                    out.push(CoverageGap {
                        scenario: None,
                        ..gap.clone()
                    });
                }
                continue;
            }
        }
        if !out.contains(gap) {
            out.push(gap.clone());
        }
    }
    out
}

/// Split gaps into (acknowledged, unacknowledged).
pub fn partition<'a>(gaps: &'a [CoverageGap], config: &GapsConfig) -> (Vec<&'a CoverageGap>, Vec<&'a CoverageGap>) {
    gaps.iter().partition(|g| config.is_acknowledged(&g.subject))
}
