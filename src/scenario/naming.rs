//! Scenario names: snake_case, built from what the scenario sets, unique within a set.

use std::collections::HashMap;

use crate::ast::format_number;
use crate::eval::Value;

/// What an edge scenario exercises, when its value alone does not say it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeIntent {
    Minimum,
    Maximum,
    /// An input whose default is null, given a value.
    Set,
}

/// Name fragment for setting `input` to `value`.
pub fn fragment(input: &str, value: &Value, intent: Option<EdgeIntent>) -> String {
    let input = slug(input);
    let suffix = match (intent, value) {
        (Some(EdgeIntent::Minimum), _) => "minimum".to_string(),
        (Some(EdgeIntent::Maximum), _) => "maximum".to_string(),
        (Some(EdgeIntent::Set), v) if v.is_collection() && !v.is_empty() => "populated".to_string(),
        (Some(EdgeIntent::Set), _) => "set".to_string(),
        (None, Value::Null) => "null".to_string(),
        (None, Value::Bool(true)) => "enabled".to_string(),
        (None, Value::Bool(false)) => "disabled".to_string(),
        (None, v) if v.is_collection() && v.is_empty() => "empty".to_string(),
        (None, v) if v.is_collection() => "populated".to_string(),
        (None, Value::Number(n)) => format!("is_{}", number_slug(*n)),
        (None, Value::String(s)) => format!("is_{}", non_empty(slug(s))),
        (None, _) => "set".to_string(),
    };
    format!("{}_{}", input, suffix)
}

/// Join the fragments of a scenario.
pub fn join(fragments: &[String]) -> String {
    fragments.join("_and_")
}

/// Append `_2`, `_3`, ... to repeated names, keeping the first as is.
pub fn make_unique(names: &mut [String]) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut taken: Vec<String> = names.to_vec();
    for name in names.iter_mut() {
        let count = seen.entry(name.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            continue;
        }
        let mut n = *count;
        let mut candidate = format!("{}_{}", name, n);
        while taken.contains(&candidate) {
            n += 1;
            candidate = format!("{}_{}", name, n);
        }
        *count = n;
        taken.push(candidate.clone());
        *name = candidate;
    }
}

/// Lowercase ASCII alphanumerics, everything else collapsed to single underscores.
pub fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

fn non_empty(s: String) -> String {
    if s.is_empty() { "empty".to_string() } else { s }
}

fn number_slug(n: f64) -> String {
    let text = format_number(n.abs()).replace('.', "_");
    if n < 0.0 { format!("minus_{}", text) } else { text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_fragments() {
        assert_eq!(fragment("environment", &Value::string("prod"), None), "environment_is_prod");
        assert_eq!(fragment("enable_logging", &Value::Bool(false), None), "enable_logging_disabled");
        assert_eq!(fragment("access_list_ips", &Value::Map(BTreeMap::new()), None), "access_list_ips_empty");
        assert_eq!(
            fragment("access_list_ips", &Value::List(vec![Value::Number(1.0)]), None),
            "access_list_ips_populated"
        );
        assert_eq!(fragment("name", &Value::Null, None), "name_null");
        assert_eq!(fragment("name", &Value::string(""), None), "name_is_empty");
        assert_eq!(fragment("region", &Value::string("eu-west-1"), None), "region_is_eu_west_1");
        assert_eq!(fragment("ratio", &Value::Number(-0.5), None), "ratio_is_minus_0_5");
        assert_eq!(fragment("days", &Value::Number(1.0), Some(EdgeIntent::Minimum)), "days_minimum");
        assert_eq!(fragment("kms-key", &Value::string("x"), Some(EdgeIntent::Set)), "kms_key_set");
    }

    #[test]
    fn test_make_unique() {
        let mut names = vec![
            "a".to_string(),
            "a".to_string(),
            "a_2".to_string(),
            "b".to_string(),
            "a".to_string(),
        ];
        make_unique(&mut names);
        assert_eq!(names, vec!["a", "a_3", "a_2", "b", "a_4"]);
    }

    #[test]
    fn test_join() {
        assert_eq!(
            join(&["environment_is_prod".to_string(), "enable_logging_enabled".to_string()]),
            "environment_is_prod_and_enable_logging_enabled"
        );
    }
}
