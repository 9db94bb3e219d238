//! Property-based tests for scenario derivation
//!
//! These tests use proptest to generate small modules from toggles and
//! enumerated string inputs, then check the guarantees every generated
//! test file must keep regardless of the module's shape.

use proptest::prelude::*;
use tfscenario::Config;
use tfscenario::frontend::module::ModuleSource;
use tfscenario::{Generated, generate};

// =============================================================================
// Module generation
// =============================================================================

#[derive(Debug, Clone)]
struct Shape {
    toggles: usize,
    /// Allowed values of each enumerated input; the first one is its default.
    enums: Vec<Vec<String>>,
    /// Two-toggle predicates `(a, b, conjunction)`: `a && !b` or `a || b`.
    /// Entries naming a missing or repeated toggle are skipped.
    predicates: Vec<(usize, usize, bool)>,
    /// Whether to fold independent branches into shared scenarios.
    combine: bool,
}

fn shape() -> impl Strategy<Value = Shape> {
    let allowed = prop::collection::btree_set("[a-z]{1,6}", 2..4).prop_map(|s| s.into_iter().collect::<Vec<_>>());
    let predicates = prop::collection::vec((0usize..4, 0usize..4, any::<bool>()), 0..4);
    (0usize..4, prop::collection::vec(allowed, 0..3), predicates, any::<bool>()).prop_map(
        |(toggles, enums, predicates, combine)| Shape {
            toggles,
            enums,
            predicates,
            combine,
        },
    )
}

fn module_source(shape: &Shape) -> String {
    let mut out = String::new();
    for i in 0..shape.toggles {
        out.push_str(&format!(
            "variable \"flag_{i}\" {{\n  type    = bool\n  default = false\n}}\n\n\
             output \"flag_{i}_state\" {{\n  value = var.flag_{i} ? \"on-{i}\" : \"off-{i}\"\n}}\n\n"
        ));
    }
    for (j, allowed) in shape.enums.iter().enumerate() {
        let list: Vec<String> = allowed.iter().map(|v| format!("\"{}\"", v)).collect();
        let last = allowed.last().cloned().unwrap_or_default();
        out.push_str(&format!(
            "variable \"mode_{j}\" {{\n  type    = string\n  default = \"{default}\"\n\n  \
             validation {{\n    condition     = contains([{list}], var.mode_{j})\n    \
             error_message = \"Unsupported mode.\"\n  }}\n}}\n\n\
             output \"mode_{j}_is_last\" {{\n  value = var.mode_{j} == \"{last}\" ? 1 : 0\n}}\n\n",
            default = allowed[0],
            list = list.join(", "),
        ));
    }
    for (k, &(a, b, conjunction)) in shape.predicates.iter().enumerate() {
        if a == b || a >= shape.toggles || b >= shape.toggles {
            continue;
        }
        let condition = if conjunction {
            format!("var.flag_{a} && !var.flag_{b}")
        } else {
            format!("var.flag_{a} || var.flag_{b}")
        };
        out.push_str(&format!("output \"pred_{k}\" {{\n  value = {condition}\n}}\n\n"));
    }
    out.push_str("output \"constant\" {\n  value = \"fixed\"\n}\n");
    out
}

fn run(shape: &Shape) -> Generated {
    let source = module_source(shape);
    let module = ModuleSource::from_sources("generated", &[("main.tf", &source)]).expect("generated module parses");
    let config = Config::new().with_combine_independent_branches(shape.combine);
    generate(&module, &config).expect("generation succeeds")
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: the same module and config always produce the same files.
    #[test]
    fn generation_is_deterministic(shape in shape()) {
        let a = run(&shape);
        let b = run(&shape);
        let a: Vec<&str> = a.files.iter().map(|f| f.contents.as_str()).collect();
        let b: Vec<&str> = b.files.iter().map(|f| f.contents.as_str()).collect();
        prop_assert_eq!(a, b);
    }

    /// Property: every run in every file is a plan.
    #[test]
    fn every_run_is_plan_only(shape in shape()) {
        let generated = run(&shape);
        for file in &generated.files {
            prop_assert_eq!(file.contents.matches("run \"").count(), file.runs);
            prop_assert_eq!(file.contents.matches("command = plan").count(), file.runs);
            prop_assert!(!file.contents.contains("command = apply"));
        }
    }

    /// Property: each branch outcome is exercised by a scenario or reported as a gap.
    #[test]
    fn every_branch_outcome_is_covered_or_a_gap(shape in shape()) {
        let generated = run(&shape);
        let coverage = generated.scenarios.coverage(&generated.interface);
        for (branch, cov) in generated.interface.branches.iter().zip(&coverage) {
            for (outcome, hits) in [(true, &cov.when_true), (false, &cov.when_false)] {
                let subject = branch.subject(outcome);
                prop_assert!(
                    !hits.is_empty() || generated.gaps.iter().any(|g| g.subject == subject),
                    "{} neither covered nor reported", subject
                );
            }
        }
    }

    /// Property: with every branch satisfiable, each one is driven both ways by some scenario.
    #[test]
    fn every_branch_is_driven_both_ways(shape in shape()) {
        let generated = run(&shape);
        for cov in generated.scenarios.coverage(&generated.interface) {
            prop_assert!(!cov.when_true.is_empty(), "`{}` never true", cov.condition);
            prop_assert!(!cov.when_false.is_empty(), "`{}` never false", cov.condition);
        }
    }

    /// Property: modules built from satisfiable toggles and enums have no gaps.
    #[test]
    fn satisfiable_modules_have_no_gaps(shape in shape()) {
        let generated = run(&shape);
        prop_assert!(generated.gaps.is_empty(), "{:?}", generated.gaps);
    }

    /// Property: scenario names are unique snake_case identifiers.
    #[test]
    fn scenario_names_are_unique_identifiers(shape in shape()) {
        let generated = run(&shape);
        let mut seen = std::collections::HashSet::new();
        for scenario in &generated.scenarios.scenarios {
            prop_assert!(seen.insert(scenario.name.clone()), "duplicate {}", scenario.name);
            prop_assert!(
                scenario.name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
                "bad name {}", scenario.name
            );
        }
    }

    /// Property: every enumerated input override satisfies its validation.
    #[test]
    fn overrides_respect_allowed_values(shape in shape()) {
        let generated = run(&shape);
        for scenario in &generated.scenarios.scenarios {
            for (j, allowed) in shape.enums.iter().enumerate() {
                if let Some(value) = scenario.overrides.get(&format!("mode_{}", j)) {
                    let value = value.as_string().unwrap_or_default();
                    prop_assert!(allowed.contains(&value), "{} not in {:?}", value, allowed);
                }
            }
        }
    }

    /// Property: the parser never panics on arbitrary input.
    #[test]
    fn parser_does_not_panic(source in "[ -~\n]{0,200}") {
        let _ = tfscenario::parser::parse_source(&source);
    }
}
