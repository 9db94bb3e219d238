#![allow(clippy::unwrap_used)]

use super::*;

fn interface(source: &str) -> ModuleInterface {
    ModuleInterface::from_sources("test", &[("main.tf", source)]).unwrap()
}

fn names(set: &ScenarioSet) -> Vec<&str> {
    set.scenarios.iter().map(|s| s.name.as_str()).collect()
}

const BACKUP_MODULE: &str = r#"
variable "environment" {
  type = string

  validation {
    condition     = contains(["dev", "staging", "prod"], var.environment)
    error_message = "Environment must be dev, staging or prod."
  }
}

variable "retention_days" {
  type    = number
  default = 7

  validation {
    condition     = var.retention_days >= 1 && var.retention_days <= 35
    error_message = "Retention must be between 1 and 35 days."
  }
}

variable "access_list_ips" {
  type    = map(string)
  default = {}
}

locals {
  is_prod = var.environment == "prod"
}

output "backup_enabled" {
  value = local.is_prod
}
"#;

const TOGGLES_MODULE: &str = r#"
variable "enable_logging" {
  type    = bool
  default = false
}

variable "enable_backup" {
  type    = bool
  default = false
}

output "logging" {
  value = var.enable_logging ? "on" : "off"
}

output "backup" {
  value = var.enable_backup ? "on" : "off"
}
"#;

#[test]
fn test_backup_module_scenarios() {
    let m = interface(BACKUP_MODULE);
    let set = enumerate(&m, &Config::new());

    assert_eq!(
        names(&set),
        vec![
            "defaults",
            "environment_is_prod",
            "environment_is_staging",
            "retention_days_minimum",
            "retention_days_maximum",
            "access_list_ips_populated",
        ]
    );
    assert_eq!(set.baseline.get("environment"), Some(&Value::string("dev")));
    assert!(set.gaps.is_empty(), "gaps: {:?}", set.gaps);

    let defaults = &set.scenarios[0];
    assert_eq!(defaults.kind, ScenarioKind::Defaults);
    assert!(defaults.overrides.is_empty());

    let prod = set.get("environment_is_prod").unwrap();
    assert_eq!(prod.kind, ScenarioKind::Branch);
    assert_eq!(prod.overrides.get("environment"), Some(&Value::string("prod")));
    assert_eq!(prod.bindings.get("environment"), Some(&Value::string("prod")));
    assert_eq!(
        prod.covers,
        vec![Requirement {
            branch: 0,
            outcome: true
        }]
    );

    let days = set.get("retention_days_minimum").unwrap();
    assert_eq!(days.overrides.get("retention_days"), Some(&Value::Number(1.0)));
    assert_eq!(
        set.get("retention_days_maximum").unwrap().overrides.get("retention_days"),
        Some(&Value::Number(35.0))
    );
}

#[test]
fn test_every_scenario_is_plan_only() {
    let set = enumerate(&interface(BACKUP_MODULE), &Config::new());
    assert!(set.scenarios.iter().all(|s| s.mode() == CommandMode::Plan));
    assert_eq!(CommandMode::Plan.to_string(), "plan");
}

#[test]
fn test_branch_driven_both_ways() {
    let m = interface(BACKUP_MODULE);
    let set = enumerate(&m, &Config::new());
    let coverage = set.coverage(&m);
    assert_eq!(coverage.len(), 1);
    assert_eq!(coverage[0].when_true, vec!["environment_is_prod"]);
    assert!(coverage[0].when_false.contains(&"defaults".to_string()));
    assert!(coverage[0].unknown.is_empty());
}

#[test]
fn test_default_used_when_present() {
    let m = interface(
        "variable \"environment\" {\n  type = string\n  default = \"dev\"\n}\noutput \"backup_enabled\" {\n  value = var.environment == \"prod\"\n}\n",
    );
    let set = enumerate(&m, &Config::new());
    assert!(set.baseline.is_empty());
    assert_eq!(names(&set), vec!["defaults", "environment_is_prod"]);
}

#[test]
fn test_independent_branches_share_a_scenario() {
    let m = interface(TOGGLES_MODULE);
    let set = enumerate(&m, &Config::new());
    assert_eq!(names(&set), vec!["defaults", "enable_logging_enabled_and_enable_backup_enabled"]);
    assert_eq!(set.scenarios[1].covers.len(), 2);
    assert_eq!(set.scenarios[1].notes.len(), 2);
}

#[test]
fn test_combining_can_be_disabled() {
    let m = interface(TOGGLES_MODULE);
    let config = Config::new().with_combine_independent_branches(false);
    let set = enumerate(&m, &config);
    assert_eq!(names(&set), vec!["defaults", "enable_logging_enabled", "enable_backup_enabled"]);
}

#[test]
fn test_merge_keeps_incidental_coverage() {
    // `a_enabled` drives `var.a && !var.c` true without being built for it;
    // folding `c = true` into it would lose that outcome.
    let m = interface(
        r#"
variable "a" {
  type    = bool
  default = false
}

variable "c" {
  type    = bool
  default = false
}

output "o0" {
  value = var.a ? "x" : "y"
}

output "o1" {
  value = var.a && !var.c
}

output "o2" {
  value = var.c ? "x" : "y"
}
"#,
    );
    let set = enumerate(&m, &Config::new());
    assert_eq!(names(&set), vec!["defaults", "a_enabled", "c_enabled"]);
    assert!(set.gaps.is_empty(), "{:?}", set.gaps);
    for cov in set.coverage(&m) {
        assert!(!cov.when_true.is_empty(), "`{}` never true", cov.condition);
        assert!(!cov.when_false.is_empty(), "`{}` never false", cov.condition);
    }
}

#[test]
fn test_branches_on_the_same_input_are_not_merged() {
    let m = interface(
        r#"
variable "env" {
  type    = string
  default = "dev"
}

output "is_prod" {
  value = var.env == "prod"
}

output "is_staging" {
  value = var.env == "staging"
}
"#,
    );
    let set = enumerate(&m, &Config::new());
    assert_eq!(names(&set), vec!["defaults", "env_is_prod", "env_is_staging"]);
}

#[test]
fn test_unreachable_branch_becomes_a_gap() {
    let m = interface(
        "variable \"n\" {\n  type = number\n  default = 0\n}\nlocals {\n  odd = var.n > 5 && var.n < 3\n}\n",
    );
    let set = enumerate(&m, &Config::new());
    let gap = set
        .gaps
        .iter()
        .find(|g| g.kind == GapKind::UnreachableBranch)
        .unwrap();
    assert_eq!(gap.subject, "local.odd[true]");
    assert!(gap.detail.contains("var.n > 5 && var.n < 3"), "detail: {}", gap.detail);
}

#[test]
fn test_after_apply_condition_becomes_a_gap() {
    let m = interface(
        r#"
variable "enabled" {
  type    = bool
  default = false
}

resource "aws_instance" "web" {
  ami = "ami-123"
}

output "ready" {
  value = var.enabled && aws_instance.web.id != ""
}
"#,
    );
    let set = enumerate(&m, &Config::new());
    let subjects: Vec<_> = set
        .gaps
        .iter()
        .filter(|g| g.kind == GapKind::AfterApply)
        .map(|g| g.subject.as_str())
        .collect();
    assert_eq!(subjects, vec!["output.ready[true]", "output.ready[false]"]);
}

#[test]
fn test_required_input_of_unknown_type_is_unsynthesizable() {
    let m = interface("variable \"blob\" {\n  type = frobnicate\n}\n");
    let set = enumerate(&m, &Config::new());
    assert_eq!(set.gaps.len(), 1);
    assert_eq!(set.gaps[0].kind, GapKind::UnsynthesizableInput);
    assert_eq!(set.gaps[0].subject, "var.blob");
    assert!(!set.baseline.contains_key("blob"));
    assert_eq!(names(&set), vec!["defaults"]);
}

#[test]
fn test_null_edges() {
    let m = interface(
        r#"
variable "kms_key" {
  type    = string
  default = null
}

variable "name" {
  type     = string
  default  = "app"
  nullable = true
}
"#,
    );
    let set = enumerate(&m, &Config::new());
    assert_eq!(names(&set), vec!["defaults", "kms_key_set", "name_null"]);
    assert_eq!(
        set.get("kms_key_set").unwrap().overrides.get("kms_key"),
        Some(&Value::string("example"))
    );
    assert_eq!(set.get("name_null").unwrap().overrides.get("name"), Some(&Value::Null));
}

#[test]
fn test_edges_respect_validations() {
    let m = interface(
        r#"
variable "tags" {
  type    = list(string)
  default = ["a"]

  validation {
    condition     = length(var.tags) > 0
    error_message = "At least one tag."
  }
}
"#,
    );
    let set = enumerate(&m, &Config::new());
    assert!(set.get("tags_empty").is_none(), "scenarios: {:?}", names(&set));
}

#[test]
fn test_areas_follow_config() {
    let m = interface(BACKUP_MODULE);
    let config = Config::new().with_area("networking", &["access_list_*"]);
    let set = enumerate(&m, &config);
    assert_eq!(set.get("access_list_ips_populated").unwrap().area, "networking");
    assert_eq!(set.get("defaults").unwrap().area, "main");
    assert_eq!(set.get("environment_is_prod").unwrap().area, "main");
}

#[test]
fn test_names_are_unique() {
    let set = enumerate(&interface(BACKUP_MODULE), &Config::new());
    let mut seen = std::collections::HashSet::new();
    assert!(set.scenarios.iter().all(|s| seen.insert(s.name.clone())));
}

#[test]
fn test_enumeration_is_deterministic() {
    let m = interface(BACKUP_MODULE);
    let a = serde_json::to_string(&enumerate(&m, &Config::new())).unwrap();
    let b = serde_json::to_string(&enumerate(&m, &Config::new())).unwrap();
    assert_eq!(a, b);
}
