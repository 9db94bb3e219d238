//! Built-in Terraform functions supported by the evaluator.
//!
//! Only strict functions live here: every argument has already been evaluated.
//! `can` and `try` inspect evaluation failures and are handled by the evaluator.

use std::collections::BTreeMap;

use super::{EvalResult, Unknown, Value};
use crate::ast::format_number;

/// Names accepted by [`call`], plus the two lazy functions.
pub const SUPPORTED: &[&str] = &[
    "abs", "alltrue", "anytrue", "can", "ceil", "coalesce", "coalescelist", "compact", "concat", "contains",
    "distinct", "element", "endswith", "flatten", "floor", "format", "join", "jsonencode", "keys", "length",
    "lookup", "lower", "max", "merge", "min", "one", "range", "replace", "reverse", "setunion", "sort", "split",
    "startswith", "substr", "sum", "title", "tobool", "tolist", "tomap", "tonumber", "toset", "tostring", "trim",
    "trimprefix", "trimspace", "trimsuffix", "try", "upper", "values", "zipmap",
];

pub fn is_supported(name: &str) -> bool {
    SUPPORTED.contains(&name)
}

/// Call a strict built-in function.
pub fn call(name: &str, args: Vec<Value>) -> EvalResult {
    let f = Args { name, args };
    match name {
        // ---- numeric ----
        "abs" => Ok(Value::Number(f.number(0)?.abs())),
        "ceil" => Ok(Value::Number(f.number(0)?.ceil())),
        "floor" => Ok(Value::Number(f.number(0)?.floor())),
        "max" | "min" => {
            let nums = f.numbers()?;
            if nums.is_empty() {
                return Err(f.invalid("requires at least one argument"));
            }
            let pick = if name == "max" { f64::max } else { f64::min };
            Ok(Value::Number(nums.into_iter().fold(if name == "max" { f64::MIN } else { f64::MAX }, pick)))
        }
        "sum" => {
            let items = f.list(0)?;
            if items.is_empty() {
                return Err(f.invalid("cannot sum an empty list"));
            }
            let mut total = 0.0;
            for item in items {
                total += item.as_number().ok_or_else(|| f.invalid("elements must be numbers"))?;
            }
            Ok(Value::Number(total))
        }
        "range" => range(&f),

        // ---- logical ----
        "alltrue" | "anytrue" => {
            let mut bools = Vec::new();
            for item in f.list(0)? {
                bools.push(item.as_bool().ok_or_else(|| f.invalid("elements must be bools"))?);
            }
            Ok(Value::Bool(if name == "alltrue" {
                bools.iter().all(|b| *b)
            } else {
                bools.iter().any(|b| *b)
            }))
        }

        // ---- strings ----
        "lower" => Ok(Value::String(f.string(0)?.to_lowercase())),
        "upper" => Ok(Value::String(f.string(0)?.to_uppercase())),
        "title" => Ok(Value::String(title(&f.string(0)?))),
        "trimspace" => Ok(Value::String(f.string(0)?.trim().to_string())),
        "trim" => {
            let cutset: Vec<char> = f.string(1)?.chars().collect();
            Ok(Value::String(f.string(0)?.trim_matches(|c| cutset.contains(&c)).to_string()))
        }
        "trimprefix" => {
            let s = f.string(0)?;
            let prefix = f.string(1)?;
            Ok(Value::String(s.strip_prefix(prefix.as_str()).unwrap_or(&s).to_string()))
        }
        "trimsuffix" => {
            let s = f.string(0)?;
            let suffix = f.string(1)?;
            Ok(Value::String(s.strip_suffix(suffix.as_str()).unwrap_or(&s).to_string()))
        }
        "startswith" => Ok(Value::Bool(f.string(0)?.starts_with(f.string(1)?.as_str()))),
        "endswith" => Ok(Value::Bool(f.string(0)?.ends_with(f.string(1)?.as_str()))),
        "split" => {
            let sep = f.string(0)?;
            let s = f.string(1)?;
            if s.is_empty() {
                return Ok(Value::List(vec![Value::string("")]));
            }
            Ok(Value::List(s.split(sep.as_str()).map(Value::string).collect()))
        }
        "join" => {
            let sep = f.string(0)?;
            let mut parts = Vec::new();
            for i in 1..f.args.len() {
                for item in f.list(i)? {
                    parts.push(item.as_string().ok_or_else(|| f.invalid("elements must be strings"))?);
                }
            }
            Ok(Value::String(parts.join(&sep)))
        }
        "replace" => {
            let s = f.string(0)?;
            let search = f.string(1)?;
            let with = f.string(2)?;
            if search.len() > 1 && search.starts_with('/') && search.ends_with('/') {
                return Err(Unknown::not_derivable("replace() with a regular expression"));
            }
            Ok(Value::String(s.replace(search.as_str(), &with)))
        }
        "substr" => {
            let chars: Vec<char> = f.string(0)?.chars().collect();
            let offset = f.integer(1)?;
            let length = f.integer(2)?;
            let len = chars.len() as i64;
            let start = if offset < 0 { len.saturating_add(offset).max(0) } else { offset.min(len) };
            let end = if length < 0 { len } else { start.saturating_add(length).min(len) };
            Ok(Value::String(chars[start as usize..end as usize].iter().collect()))
        }
        "format" => format(&f),
        "jsonencode" => {
            let v = f.arg(0)?;
            serde_json::to_string(&v.to_json())
                .map(Value::String)
                .map_err(|e| f.invalid(&e.to_string()))
        }

        // ---- collections ----
        "length" => match f.arg(0)? {
            Value::Null => Err(f.invalid("argument must not be null")),
            v => v
                .len()
                .map(|n| Value::Number(n as f64))
                .ok_or_else(|| f.invalid(&format!("cannot take the length of a {}", v.type_name()))),
        },
        "contains" => {
            let needle = f.arg(1)?;
            Ok(Value::Bool(f.list(0)?.iter().any(|v| v == needle)))
        }
        "concat" => {
            let mut out = Vec::new();
            for i in 0..f.args.len() {
                out.extend(f.list(i)?);
            }
            Ok(Value::List(out))
        }
        "coalesce" => f
            .args
            .iter()
            .find(|v| !v.is_null() && !matches!(v, Value::String(s) if s.is_empty()))
            .cloned()
            .ok_or_else(|| f.invalid("no non-null, non-empty-string arguments")),
        "coalescelist" => {
            for i in 0..f.args.len() {
                let items = f.list(i)?;
                if !items.is_empty() {
                    return Ok(Value::List(items));
                }
            }
            Err(f.invalid("no non-empty list arguments"))
        }
        "compact" => Ok(Value::List(
            f.list(0)?
                .into_iter()
                .filter(|v| !v.is_null() && !matches!(v, Value::String(s) if s.is_empty()))
                .collect(),
        )),
        "distinct" => Ok(Value::List(distinct(f.list(0)?))),
        "element" => {
            let items = f.list(0)?;
            if items.is_empty() {
                return Err(f.invalid("cannot use element() with an empty list"));
            }
            let idx = f.integer(1)?;
            if idx < 0 {
                return Err(f.invalid("index must not be negative"));
            }
            Ok(items[idx as usize % items.len()].clone())
        }
        "flatten" => {
            let mut out = Vec::new();
            flatten_into(f.list(0)?, &mut out);
            Ok(Value::List(out))
        }
        "keys" => Ok(Value::List(f.map(0)?.into_keys().map(Value::String).collect())),
        "values" => Ok(Value::List(f.map(0)?.into_values().collect())),
        "lookup" => {
            let map = f.map(0)?;
            let key = f.string(1)?;
            match map.get(&key) {
                Some(v) => Ok(v.clone()),
                None if f.args.len() > 2 => Ok(f.args[2].clone()),
                None => Err(f.invalid(&format!("key \"{}\" not found", key))),
            }
        }
        "merge" => {
            let mut out = BTreeMap::new();
            for arg in &f.args {
                match arg {
                    Value::Null => {}
                    Value::Map(entries) => out.extend(entries.clone()),
                    other => return Err(f.invalid(&format!("arguments must be maps, got {}", other.type_name()))),
                }
            }
            Ok(Value::Map(out))
        }
        "one" => {
            let items = f.list(0)?;
            match items.len() {
                0 => Ok(Value::Null),
                1 => Ok(items[0].clone()),
                n => Err(f.invalid(&format!("list has {} elements; must have zero or one", n))),
            }
        }
        "reverse" => {
            let mut items = f.list(0)?;
            items.reverse();
            Ok(Value::List(items))
        }
        "setunion" => {
            let mut out = Vec::new();
            for i in 0..f.args.len() {
                out.extend(f.list(i)?);
            }
            Ok(Value::List(sorted_set(out)))
        }
        "sort" => {
            let mut items = Vec::new();
            for item in f.list(0)? {
                items.push(item.as_string().ok_or_else(|| f.invalid("elements must be strings"))?);
            }
            items.sort();
            Ok(Value::List(items.into_iter().map(Value::String).collect()))
        }
        "zipmap" => {
            let keys = f.list(0)?;
            let values = f.list(1)?;
            if keys.len() != values.len() {
                return Err(f.invalid("keys and values must have the same length"));
            }
            let mut out = BTreeMap::new();
            for (k, v) in keys.into_iter().zip(values) {
                let k = k.as_string().ok_or_else(|| f.invalid("keys must be strings"))?;
                out.insert(k, v);
            }
            Ok(Value::Map(out))
        }

        // ---- conversions ----
        "tostring" => match f.arg(0)? {
            Value::Null => Ok(Value::Null),
            v => v
                .as_string()
                .map(Value::String)
                .ok_or_else(|| f.invalid(&format!("cannot convert {} to string", v.type_name()))),
        },
        "tonumber" => match f.arg(0)? {
            Value::Null => Ok(Value::Null),
            v => v
                .as_number()
                .map(Value::Number)
                .ok_or_else(|| f.invalid(&format!("cannot convert {} to number", v))),
        },
        "tobool" => match f.arg(0)? {
            Value::Null => Ok(Value::Null),
            v => v
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| f.invalid(&format!("cannot convert {} to bool", v))),
        },
        "tolist" => match f.arg(0)? {
            Value::Null => Ok(Value::Null),
            _ => Ok(Value::List(f.list(0)?)),
        },
        "toset" => match f.arg(0)? {
            Value::Null => Ok(Value::Null),
            _ => Ok(Value::List(sorted_set(f.list(0)?))),
        },
        "tomap" => match f.arg(0)? {
            Value::Null => Ok(Value::Null),
            _ => Ok(Value::Map(f.map(0)?)),
        },

        _ => Err(Unknown::not_derivable(format!("function {}() is not supported", name))),
    }
}

// ============================================================================
// Argument access
// ============================================================================

struct Args<'a> {
    name: &'a str,
    args: Vec<Value>,
}

impl Args<'_> {
    fn invalid(&self, msg: &str) -> Unknown {
        Unknown::invalid(format!("{}(): {}", self.name, msg))
    }

    fn arg(&self, i: usize) -> Result<&Value, Unknown> {
        self.args
            .get(i)
            .ok_or_else(|| self.invalid(&format!("missing argument {}", i + 1)))
    }

    fn number(&self, i: usize) -> Result<f64, Unknown> {
        let v = self.arg(i)?;
        v.as_number()
            .ok_or_else(|| self.invalid(&format!("argument {} must be a number, got {}", i + 1, v.type_name())))
    }

    fn integer(&self, i: usize) -> Result<i64, Unknown> {
        let n = self.number(i)?;
        if n.fract() != 0.0 {
            return Err(self.invalid(&format!("argument {} must be a whole number", i + 1)));
        }
        Ok(n as i64)
    }

    fn numbers(&self) -> Result<Vec<f64>, Unknown> {
        (0..self.args.len()).map(|i| self.number(i)).collect()
    }

    fn string(&self, i: usize) -> Result<String, Unknown> {
        let v = self.arg(i)?;
        v.as_string()
            .ok_or_else(|| self.invalid(&format!("argument {} must be a string, got {}", i + 1, v.type_name())))
    }

    fn list(&self, i: usize) -> Result<Vec<Value>, Unknown> {
        match self.arg(i)? {
            Value::List(items) => Ok(items.clone()),
            other => Err(self.invalid(&format!("argument {} must be a list, got {}", i + 1, other.type_name()))),
        }
    }

    fn map(&self, i: usize) -> Result<BTreeMap<String, Value>, Unknown> {
        match self.arg(i)? {
            Value::Map(entries) => Ok(entries.clone()),
            other => Err(self.invalid(&format!("argument {} must be a map, got {}", i + 1, other.type_name()))),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn distinct(items: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Sets have no order in Terraform; keep them sorted so output is stable.
pub(crate) fn sorted_set(items: Vec<Value>) -> Vec<Value> {
    let mut out = distinct(items);
    out.sort_by_key(|v| v.sort_key());
    out
}

fn flatten_into(items: Vec<Value>, out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::List(inner) => flatten_into(inner, out),
            other => out.push(other),
        }
    }
}

fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphanumeric();
    }
    out
}

fn range(f: &Args<'_>) -> EvalResult {
    let (start, limit, step) = match f.args.len() {
        1 => (0.0, f.number(0)?, 1.0),
        2 => {
            let (s, l) = (f.number(0)?, f.number(1)?);
            (s, l, if l < s { -1.0 } else { 1.0 })
        }
        3 => (f.number(0)?, f.number(1)?, f.number(2)?),
        _ => return Err(f.invalid("expects one to three arguments")),
    };
    if step == 0.0 {
        return Err(f.invalid("step must not be zero"));
    }
    let mut out = Vec::new();
    let mut n = start;
    while (step > 0.0 && n < limit) || (step < 0.0 && n > limit) {
        out.push(Value::Number(n));
        if out.len() > 1024 {
            return Err(f.invalid("more than 1024 elements"));
        }
        n += step;
    }
    Ok(Value::List(out))
}

/// `format` with the common verbs: `%s %d %f %.Nf %t %v %q %%`.
fn format(f: &Args<'_>) -> EvalResult {
    let spec = f.string(0)?;
    let mut out = String::new();
    let mut next = 1;
    let mut chars = spec.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut precision: Option<usize> = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut digits = String::new();
            while let Some(d) = chars.peek().copied().filter(|d| d.is_ascii_digit()) {
                digits.push(d);
                chars.next();
            }
            precision = digits.parse().ok();
        }
        let verb = chars.next().ok_or_else(|| f.invalid("format string ends with '%'"))?;
        if verb == '%' {
            out.push('%');
            continue;
        }
        let arg = f.arg(next)?.clone();
        next += 1;
        match verb {
            's' | 'v' => out.push_str(&match &arg {
                Value::String(s) => s.clone(),
                v if v.is_scalar() => v.as_string().unwrap_or_default(),
                v => v.to_hcl(),
            }),
            'q' => out.push_str(&serde_json::Value::String(arg.as_string().unwrap_or_default()).to_string()),
            't' => out.push_str(&arg.as_bool().ok_or_else(|| f.invalid("%t needs a bool"))?.to_string()),
            'd' => {
                let n = arg.as_number().ok_or_else(|| f.invalid("%d needs a number"))?;
                out.push_str(&format_number(n.trunc()));
            }
            'f' => {
                let n = arg.as_number().ok_or_else(|| f.invalid("%f needs a number"))?;
                out.push_str(&format!("{:.*}", precision.unwrap_or(6), n));
            }
            other => return Err(Unknown::not_derivable(format!("format verb %{}", other))),
        }
    }
    Ok(Value::String(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::string(v)
    }

    fn list(items: &[&str]) -> Value {
        Value::List(items.iter().map(|v| s(v)).collect())
    }

    fn map(entries: &[(&str, &str)]) -> Value {
        Value::Map(entries.iter().map(|(k, v)| (k.to_string(), s(v))).collect())
    }

    #[test]
    fn test_merge_later_wins_and_counts() {
        let a = map(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let b = map(&[("c", "x"), ("d", "4"), ("e", "5")]);
        let merged = call("merge", vec![a, b]).unwrap();
        assert_eq!(merged.len(), Some(5));
        assert_eq!(call("length", vec![merged.clone()]).unwrap(), Value::Number(5.0));
        match merged {
            Value::Map(m) => assert_eq!(m.get("c"), Some(&s("x"))),
            other => panic!("Expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(call("upper", vec![s("dev")]).unwrap(), s("DEV"));
        assert_eq!(call("title", vec![s("hello wide-world")]).unwrap(), s("Hello Wide-World"));
        assert_eq!(call("trimspace", vec![s("  x ")]).unwrap(), s("x"));
        assert_eq!(call("trimprefix", vec![s("prod-app"), s("prod-")]).unwrap(), s("app"));
        assert_eq!(call("join", vec![s(","), list(&["a", "b"])]).unwrap(), s("a,b"));
        assert_eq!(call("split", vec![s(","), s("a,b")]).unwrap(), list(&["a", "b"]));
        assert_eq!(call("substr", vec![s("hello"), Value::Number(1.0), Value::Number(3.0)]).unwrap(), s("ell"));
        assert_eq!(call("substr", vec![s("hello"), Value::Number(-3.0), Value::Number(-1.0)]).unwrap(), s("llo"));
    }

    #[test]
    fn test_format() {
        let out = call("format", vec![s("%s-%d-%.1f%%"), s("app"), Value::Number(3.0), Value::Number(2.25)]).unwrap();
        assert_eq!(out, s("app-3-2.2%"));
        assert_eq!(call("format", vec![s("%q"), s("x")]).unwrap(), s("\"x\""));
    }

    #[test]
    fn test_collections() {
        assert_eq!(call("contains", vec![list(&["dev", "prod"]), s("prod")]).unwrap(), Value::Bool(true));
        assert_eq!(call("concat", vec![list(&["a"]), list(&["b"])]).unwrap(), list(&["a", "b"]));
        assert_eq!(call("distinct", vec![list(&["a", "b", "a"])]).unwrap(), list(&["a", "b"]));
        assert_eq!(call("toset", vec![list(&["b", "a", "b"])]).unwrap(), list(&["a", "b"]));
        assert_eq!(call("compact", vec![list(&["a", "", "b"])]).unwrap(), list(&["a", "b"]));
        assert_eq!(call("element", vec![list(&["a", "b"]), Value::Number(3.0)]).unwrap(), s("b"));
        assert_eq!(call("keys", vec![map(&[("b", "1"), ("a", "2")])]).unwrap(), list(&["a", "b"]));
        assert_eq!(call("lookup", vec![map(&[]), s("k"), s("d")]).unwrap(), s("d"));
        assert_eq!(call("one", vec![Value::List(vec![])]).unwrap(), Value::Null);
        assert_eq!(call("coalesce", vec![Value::Null, s(""), s("x")]).unwrap(), s("x"));
        assert_eq!(
            call("range", vec![Value::Number(3.0)]).unwrap(),
            Value::List(vec![Value::Number(0.0), Value::Number(1.0), Value::Number(2.0)])
        );
    }

    #[test]
    fn test_numeric() {
        assert_eq!(call("max", vec![Value::Number(1.0), Value::Number(5.0)]).unwrap(), Value::Number(5.0));
        assert_eq!(call("min", vec![Value::Number(1.0), Value::Number(5.0)]).unwrap(), Value::Number(1.0));
        assert_eq!(call("abs", vec![Value::Number(-2.0)]).unwrap(), Value::Number(2.0));
        assert!(call("max", vec![]).is_err());
    }

    #[test]
    fn test_jsonencode_sorted_keys() {
        let v = map(&[("b", "2"), ("a", "1")]);
        assert_eq!(call("jsonencode", vec![v]).unwrap(), s(r#"{"a":"1","b":"2"}"#));
    }

    #[test]
    fn test_unsupported_is_not_derivable() {
        let err = call("cidrsubnet", vec![]).unwrap_err();
        assert_eq!(err.reason, super::super::UnknownReason::NotDerivable);
        assert!(!is_supported("cidrsubnet"));
        assert!(is_supported("merge"));
    }

    #[test]
    fn test_regex_replace_not_derivable() {
        let err = call("replace", vec![s("a1"), s("/[0-9]/"), s("")]).unwrap_err();
        assert_eq!(err.reason, super::super::UnknownReason::NotDerivable);
    }
}
