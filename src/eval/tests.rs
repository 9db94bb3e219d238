#![allow(clippy::unwrap_used)]

use super::*;
use crate::parser::parse_expression_source;

fn module(source: &str) -> ModuleInterface {
    ModuleInterface::from_sources("test", &[("main.tf", source)]).unwrap()
}

fn bindings(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn eval_in(m: &ModuleInterface, b: &BTreeMap<String, Value>, source: &str) -> EvalResult {
    let expr = parse_expression_source(source).unwrap();
    Evaluator::new(m, b).eval(&expr)
}

fn eval_const(source: &str) -> EvalResult {
    constant(&parse_expression_source(source).unwrap())
}

const ACCESS_MODULE: &str = r#"
variable "environment" {
  type = string
}

variable "access_list_ips" {
  type    = map(string)
  default = {}
}

locals {
  infrastructure_ips = {
    "10.0.0.1/32" = "bastion"
    "10.0.0.2/32" = "monitoring"
    "10.0.0.3/32" = "ci"
  }
  merged_ips = merge(local.infrastructure_ips, var.access_list_ips)
  is_prod    = var.environment == "prod"
}

resource "aws_s3_bucket" "logs" {
  count  = local.is_prod ? 2 : 0
  bucket = "logs-${var.environment}"
}

resource "aws_instance" "web" {
  ami = "ami-123"
}
"#;

#[test]
fn test_literals_and_operators() {
    assert_eq!(eval_const("1 + 2 * 3").unwrap(), Value::Number(7.0));
    assert_eq!(eval_const("7 % 3").unwrap(), Value::Number(1.0));
    assert_eq!(eval_const("\"a\" == \"a\" && !false").unwrap(), Value::Bool(true));
    assert_eq!(eval_const("1 == \"1\"").unwrap(), Value::Bool(false));
    assert_eq!(eval_const("\"5\" > 3").unwrap(), Value::Bool(true));
    assert_eq!(eval_const("1 / 0").unwrap_err().reason, UnknownReason::Invalid);
}

#[test]
fn test_conditional_only_evaluates_taken_arm() {
    assert_eq!(eval_const("true ? 1 : data.x.y.id").unwrap(), Value::Number(1.0));
    assert_eq!(eval_const("false ? 1 : data.x.y.id").unwrap_err().reason, UnknownReason::NotDerivable);
}

#[test]
fn test_templates() {
    assert_eq!(eval_const("\"a-${1 + 1}-b\"").unwrap(), Value::string("a-2-b"));
    // A lone interpolation keeps the value's type.
    assert_eq!(eval_const("\"${[1, 2]}\"").unwrap(), Value::List(vec![Value::Number(1.0), Value::Number(2.0)]));
    assert_eq!(eval_const("\"x${null}\"").unwrap_err().reason, UnknownReason::Invalid);
}

#[test]
fn test_for_expressions() {
    assert_eq!(
        eval_const("[for s in [\"a\", \"\", \"b\"] : upper(s) if s != \"\"]").unwrap(),
        Value::List(vec![Value::string("A"), Value::string("B")])
    );
    assert_eq!(
        eval_const("{ for k, v in { a = 1, b = 2 } : v => k }").unwrap().to_hcl(),
        r#"{ "1" = "a", "2" = "b" }"#
    );
    assert_eq!(
        eval_const("{ for s in [\"ab\", \"ac\", \"b\"] : substr(s, 0, 1) => s... }").unwrap().to_hcl(),
        r#"{ a = ["ab", "ac"], b = ["b"] }"#
    );
    assert_eq!(
        eval_const("{ for s in [\"a\", \"a\"] : s => s }").unwrap_err().reason,
        UnknownReason::Invalid
    );
}

#[test]
fn test_can_and_try() {
    assert_eq!(eval_const("can({ a = 1 }.b)").unwrap(), Value::Bool(false));
    assert_eq!(eval_const("can({ a = 1 }.a)").unwrap(), Value::Bool(true));
    assert_eq!(eval_const("try({ a = 1 }.b, \"fallback\")").unwrap(), Value::string("fallback"));
    assert_eq!(eval_const("can(data.x.y.id)").unwrap_err().reason, UnknownReason::NotDerivable);
}

#[test]
fn test_merged_map_lengths() {
    let m = module(ACCESS_MODULE);
    let empty = bindings(&[("environment", Value::string("dev"))]);
    assert_eq!(eval_in(&m, &empty, "length(local.merged_ips)").unwrap(), Value::Number(3.0));

    let populated = bindings(&[
        ("environment", Value::string("dev")),
        ("access_list_ips", two_ips()),
    ]);
    assert_eq!(eval_in(&m, &populated, "length(local.merged_ips)").unwrap(), Value::Number(5.0));
}

fn two_ips() -> Value {
    Value::Map(bindings(&[
        ("key1", Value::string("example-1")),
        ("key2", Value::string("example-2")),
    ]))
}

#[test]
fn test_required_input_without_binding_is_not_derivable() {
    let m = module(ACCESS_MODULE);
    let none = BTreeMap::new();
    let err = eval_in(&m, &none, "local.is_prod").unwrap_err();
    assert_eq!(err.reason, UnknownReason::NotDerivable);
    assert!(err.detail.contains("environment"));
}

#[test]
fn test_resources() {
    let m = module(ACCESS_MODULE);
    let prod = bindings(&[("environment", Value::string("prod"))]);
    let dev = bindings(&[("environment", Value::string("dev"))]);

    assert_eq!(eval_in(&m, &prod, "length(aws_s3_bucket.logs)").unwrap(), Value::Number(2.0));
    assert_eq!(eval_in(&m, &dev, "length(aws_s3_bucket.logs)").unwrap(), Value::Number(0.0));
    assert_eq!(eval_in(&m, &prod, "aws_s3_bucket.logs[0].bucket").unwrap(), Value::string("logs-prod"));
    assert_eq!(
        eval_in(&m, &prod, "aws_s3_bucket.logs[*].bucket").unwrap(),
        Value::List(vec![Value::string("logs-prod"), Value::string("logs-prod")])
    );
    assert_eq!(eval_in(&m, &prod, "aws_instance.web.ami").unwrap(), Value::string("ami-123"));

    let err = eval_in(&m, &prod, "aws_instance.web.arn").unwrap_err();
    assert_eq!(err.reason, UnknownReason::AfterApply);
    assert_eq!(err.detail, "aws_instance.web.arn");
    assert_eq!(
        eval_in(&m, &prod, "aws_s3_bucket.logs[*].arn").unwrap_err().reason,
        UnknownReason::AfterApply
    );
}

#[test]
fn test_unknown_operands_stay_unknown() {
    let m = module(ACCESS_MODULE);
    let b = bindings(&[("environment", Value::string("dev"))]);
    let err = eval_in(&m, &b, "local.is_prod && aws_instance.web.id != \"\"").unwrap_err();
    assert_eq!(err.reason, UnknownReason::AfterApply);
}

#[test]
fn test_local_cycle_is_reported() {
    let m = module("locals {\n  a = local.b\n  b = local.a\n}\n");
    let b = BTreeMap::new();
    let err = eval_in(&m, &b, "local.a").unwrap_err();
    assert_eq!(err.reason, UnknownReason::Invalid);
    assert!(err.detail.contains("a -> b -> a"), "got: {}", err.detail);
}

#[test]
fn test_bindings_are_converted_to_declared_type() {
    let m = module("variable \"port\" {\n  type = number\n}\n");
    let b = bindings(&[("port", Value::string("8080"))]);
    assert_eq!(eval_in(&m, &b, "var.port + 1").unwrap(), Value::Number(8081.0));
    let bad = bindings(&[("port", Value::string("http"))]);
    assert_eq!(eval_in(&m, &bad, "var.port").unwrap_err().reason, UnknownReason::Invalid);
}

#[test]
fn test_null_for_non_nullable_uses_default() {
    let m = module("variable \"size\" {\n  type = number\n  default = 3\n  nullable = false\n}\n");
    let b = bindings(&[("size", Value::Null)]);
    assert_eq!(eval_in(&m, &b, "var.size").unwrap(), Value::Number(3.0));
}

#[test]
fn test_validation_failures() {
    let m = module(
        r#"
variable "environment" {
  type = string
  validation {
    condition     = contains(["dev", "prod"], var.environment)
    error_message = "Must be dev or prod."
  }
  validation {
    condition     = length(var.environment) <= 4
    error_message = "Too long."
  }
}
"#,
    );
    let input = m.input("environment").unwrap();

    let ok = bindings(&[("environment", Value::string("dev"))]);
    assert!(Evaluator::new(&m, &ok).validation_failures(input).is_empty());

    let bad = bindings(&[("environment", Value::string("staging"))]);
    assert_eq!(
        Evaluator::new(&m, &bad).validation_failures(input),
        vec!["Must be dev or prod.".to_string(), "Too long.".to_string()]
    );
}

#[test]
fn test_path_and_workspace() {
    let m = module("locals {\n  p = \"${path.module}/files\"\n}\n");
    let b = BTreeMap::new();
    assert_eq!(eval_in(&m, &b, "local.p").unwrap(), Value::string("./files"));
    assert_eq!(eval_in(&m, &b, "terraform.workspace").unwrap(), Value::string("default"));
}

#[test]
fn test_undeclared_references_are_invalid() {
    let m = module("locals {}\n");
    let b = BTreeMap::new();
    assert_eq!(eval_in(&m, &b, "var.nope").unwrap_err().reason, UnknownReason::Invalid);
    assert_eq!(eval_in(&m, &b, "aws_vpc.main.id").unwrap_err().reason, UnknownReason::Invalid);
}

#[test]
fn test_huge_count_is_counted_not_expanded() {
    let m = module(
        r#"
variable "n" {
  type    = number
  default = 1
}

resource "aws_instance" "fleet" {
  count = var.n
  ami   = "ami-123"
}
"#,
    );
    let huge = bindings(&[("n", Value::Number(100_000_000_000.0))]);
    let res = m.resource("aws_instance", "fleet").unwrap();
    assert_eq!(
        Evaluator::new(&m, &huge).instance_count(res).unwrap(),
        100_000_000_000
    );
    assert_eq!(
        eval_in(&m, &huge, "length(aws_instance.fleet)").unwrap_err().reason,
        UnknownReason::NotDerivable
    );
    assert_eq!(
        eval_in(&m, &huge, "aws_instance.fleet[*].ami").unwrap_err().reason,
        UnknownReason::NotDerivable
    );

    let small = bindings(&[("n", Value::Number(3.0))]);
    assert_eq!(eval_in(&m, &small, "length(aws_instance.fleet)").unwrap(), Value::Number(3.0));
}

#[test]
fn test_substr_with_extreme_arguments() {
    assert_eq!(eval_const("substr(\"hello\", 1, 1e300)").unwrap(), Value::string("ello"));
    assert_eq!(eval_const("substr(\"hello\", -1e300, 2)").unwrap(), Value::string("he"));
    assert_eq!(eval_const("substr(\"hello\", 3, -1)").unwrap(), Value::string("lo"));
}
