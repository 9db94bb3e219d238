#![allow(clippy::unwrap_used)]

use super::*;

fn interface(source: &str) -> ModuleInterface {
    ModuleInterface::from_sources("test", &[("main.tf", source)]).unwrap()
}

const BACKUP_MODULE: &str = r#"
variable "environment" {
  type        = string
  description = "Deployment environment"

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

output "retention" {
  value = local.is_prod ? var.retention_days * 2 : var.retention_days
}
"#;

#[test]
fn test_inputs_are_extracted_in_order() {
    let m = interface(BACKUP_MODULE);
    let names: Vec<_> = m.inputs.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["environment", "retention_days", "access_list_ips"]);

    let env = m.input("environment").unwrap();
    assert!(env.is_required());
    assert_eq!(env.ty, DeclaredType::String);
    assert_eq!(env.description.as_deref(), Some("Deployment environment"));
    assert_eq!(env.validations.len(), 1);
    assert_eq!(env.validations[0].error_message, "Environment must be dev, staging or prod.");

    let ips = m.input("access_list_ips").unwrap();
    assert_eq!(ips.default, Some(Value::Map(BTreeMap::new())));
    assert!(ips.nullable);
    assert!(!ips.nullable_declared);
}

#[test]
fn test_same_condition_is_one_branch() {
    let m = interface(BACKUP_MODULE);
    assert_eq!(m.branches.len(), 1, "branches: {:?}", m.branches);
    let branch = &m.branches[0];
    assert_eq!(branch.key, "var.environment == \"prod\"");
    assert_eq!(branch.drivers, vec!["environment".to_string()]);
    assert_eq!(branch.origins, vec!["local.is_prod", "output.backup_enabled", "output.retention"]);
}

#[test]
fn test_facts() {
    let m = interface(BACKUP_MODULE);
    let env = m.facts("environment").unwrap();
    assert_eq!(
        env.allowed,
        Some(vec![Value::string("dev"), Value::string("staging"), Value::string("prod")])
    );
    assert!(env.compared.contains(&Value::string("prod")));

    let days = m.facts("retention_days").unwrap();
    assert_eq!(days.minimum(), Some(1.0));
    assert_eq!(days.maximum(), Some(35.0));
}

#[test]
fn test_exclusive_bounds_are_whole_numbers() {
    let m = interface(
        "variable \"n\" {\n  type = number\n  default = 3\n  validation {\n    condition = var.n > 0 && 10 > var.n\n    error_message = \"x\"\n  }\n}\n",
    );
    let facts = m.facts("n").unwrap();
    assert_eq!(facts.minimum(), Some(1.0));
    assert_eq!(facts.maximum(), Some(9.0));
}

#[test]
fn test_unknown_type_is_flagged_not_fatal() {
    let m = interface("variable \"blob\" {\n  type = frobnicate\n  default = \"x\"\n}\n");
    let blob = m.input("blob").unwrap();
    assert!(blob.type_unknown());
    assert_eq!(blob.default, Some(Value::string("x")));
    assert_eq!(m.warnings.len(), 1);
    assert!(m.warnings[0].contains("cannot be resolved"));
}

#[test]
fn test_unevaluable_default_is_absent_with_warning() {
    let m = interface("variable \"name\" {\n  default = upper(var.other)\n}\n");
    assert!(m.input("name").unwrap().is_required());
    assert!(m.warnings[0].contains("Default of input 'name'"));
}

#[test]
fn test_duplicates_are_errors() {
    let err = ModuleInterface::from_sources(
        "dup",
        &[
            ("a.tf", "variable \"x\" {}\n"),
            ("b.tf", "variable \"x\" {}\noutput \"o\" {\n  value = 1\n}\noutput \"o\" {\n  value = 2\n}\n"),
        ],
    )
    .unwrap_err();
    match err {
        ModuleError::Interface(errors) => {
            assert_eq!(errors.len(), 2);
            assert!(errors[0].contains("var.x"));
            assert!(errors[1].contains("output.o"));
        }
        other => panic!("Expected interface error, got {:?}", other),
    }
}

#[test]
fn test_branches_follow_resources_and_skip_for_bodies() {
    let m = interface(
        r#"
variable "enable_logging" {
  type    = bool
  default = false
}

variable "names" {
  type    = list(string)
  default = []
}

resource "aws_s3_bucket" "logs" {
  count  = var.enable_logging ? 1 : 0
  bucket = "logs"
}

output "upper_names" {
  value = [for n in var.names : n == "" ? "none" : upper(n)]
}

output "log_bucket_count" {
  value = length(aws_s3_bucket.logs) > 0
}
"#,
    );
    let keys: Vec<_> = m.branches.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, vec!["length(aws_s3_bucket.logs) > 0", "var.enable_logging"]);
    assert_eq!(m.branches[0].drivers, vec!["enable_logging".to_string()]);
    assert_eq!(m.branches[1].origins, vec!["aws_s3_bucket.logs.count".to_string()]);
}

#[test]
fn test_conditions_without_inputs_are_not_branches() {
    let m = interface("locals {\n  x = terraform.workspace == \"default\" ? 1 : 2\n}\n");
    assert!(m.branches.is_empty());
}

#[test]
fn test_optional_object_attributes() {
    let m = interface(
        "variable \"settings\" {\n  type = object({\n    name = string\n    port = optional(number, 8080)\n  })\n}\n",
    );
    let settings = m.input("settings").unwrap();
    assert_eq!(settings.ty.to_string(), "object({ name = string, port = optional(number, 8080) })");
    assert_eq!(settings.ty.placeholder().unwrap().to_hcl(), r#"{ name = "example" }"#);
}

#[test]
fn test_summary_serializes() {
    let m = interface(BACKUP_MODULE);
    let json = serde_json::to_value(m.summary()).unwrap();
    assert_eq!(json["inputs"][0]["name"], "environment");
    assert_eq!(json["inputs"][0]["type"], "string");
    assert_eq!(json["inputs"][0]["required"], true);
    assert_eq!(json["inputs"][2]["default"], serde_json::json!({}));
    assert_eq!(json["branches"][0]["drivers"][0], "environment");
}
