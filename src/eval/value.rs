//! Concrete values produced by the symbolic evaluator.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::ast::{format_number, is_identifier, quote_string};

/// A known Terraform value.
///
/// Tuples and sets are represented as lists; objects as maps. Map keys are kept
/// in lexicographic order, matching Terraform's object key ordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_))
    }

    /// Bool, number or string.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Bool(_) | Value::Number(_) | Value::String(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s == "true" => Some(true),
            Value::String(s) if s == "false" => Some(false),
            _ => None,
        }
    }

    /// Numeric view, converting numeric strings the way Terraform does.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// String view for scalars (`tostring` semantics); `None` for null and collections.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(format_number(*n)),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn len(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(items.len()),
            Value::Map(entries) => Some(entries.len()),
            Value::String(s) => Some(s.chars().count()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Render as an HCL literal, on one line.
    pub fn to_hcl(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => quote_string(s),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(|v| v.to_hcl()).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Map(entries) if entries.is_empty() => "{}".to_string(),
            Value::Map(entries) => {
                let entries: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{} = {}", hcl_key(k), v.to_hcl()))
                    .collect();
                format!("{{ {} }}", entries.join(", "))
            }
        }
    }

    /// Convert to JSON for `jsonencode` and machine-readable output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => {
                serde_json::Value::Object(entries.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }

    /// Total order used for `sort`, sets and candidate dedup.
    pub fn sort_key(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_hcl(),
        }
    }
}

/// Object keys that are not identifiers are quoted.
pub fn hcl_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        quote_string(key)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hcl())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_hcl() {
        let mut m = BTreeMap::new();
        m.insert("10.0.0.0/8".to_string(), Value::string("office"));
        m.insert("name".to_string(), Value::Number(3.0));
        let v = Value::List(vec![Value::Null, Value::Bool(true), Value::Map(m)]);
        assert_eq!(v.to_hcl(), r#"[null, true, { "10.0.0.0/8" = "office", name = 3 }]"#);
        assert_eq!(Value::Map(BTreeMap::new()).to_hcl(), "{}");
        assert_eq!(Value::string("a${b}").to_hcl(), r#""a$${b}""#);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::string("5").as_number(), Some(5.0));
        assert_eq!(Value::string("x").as_number(), None);
        assert_eq!(Value::string("true").as_bool(), Some(true));
        assert_eq!(Value::Number(2.5).as_string(), Some("2.5".to_string()));
        assert_eq!(Value::Null.as_string(), None);
    }

    #[test]
    fn test_json() {
        let v = Value::List(vec![Value::Number(1.0), Value::Number(1.5), Value::string("x")]);
        assert_eq!(v.to_json().to_string(), r#"[1,1.5,"x"]"#);
    }

    #[test]
    fn test_serialize_untagged() {
        let v = Value::List(vec![Value::Null, Value::Bool(false)]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[null,false]");
    }
}
