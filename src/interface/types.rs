//! Declared input types and conversion of values to them.

use std::collections::BTreeMap;
use std::fmt;

use crate::ast::{Expr, Literal, ObjectKey, Spanned, TemplatePart};
use crate::eval::{self, Value};
use crate::eval::value::hcl_key;

/// A variable's `type` constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredType {
    Any,
    String,
    Number,
    Bool,
    List(Box<DeclaredType>),
    Set(Box<DeclaredType>),
    Map(Box<DeclaredType>),
    Tuple(Vec<DeclaredType>),
    Object(Vec<ObjectAttr>),
    /// A type expression we could not resolve, kept as written.
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectAttr {
    pub name: String,
    pub ty: DeclaredType,
    pub optional: bool,
    /// Default of an `optional(T, default)` attribute.
    pub default: Option<Value>,
}

impl DeclaredType {
    /// Resolve a type expression.
    pub fn from_expr(expr: &Spanned<Expr>) -> Self {
        match expr.node.unparen() {
            Expr::Variable(name) => match name.as_str() {
                "any" => DeclaredType::Any,
                "string" => DeclaredType::String,
                "number" => DeclaredType::Number,
                "bool" => DeclaredType::Bool,
                "list" => DeclaredType::List(Box::new(DeclaredType::Any)),
                "set" => DeclaredType::Set(Box::new(DeclaredType::Any)),
                "map" => DeclaredType::Map(Box::new(DeclaredType::Any)),
                _ => DeclaredType::Unknown(name.clone()),
            },
            // Terraform 0.11 quoted type names
            Expr::Literal(Literal::String(name)) => match name.as_str() {
                "string" => DeclaredType::String,
                "list" => DeclaredType::List(Box::new(DeclaredType::Any)),
                "map" => DeclaredType::Map(Box::new(DeclaredType::Any)),
                _ => DeclaredType::Unknown(format!("\"{}\"", name)),
            },
            Expr::Call { name, args, .. } => Self::from_call(name, args).unwrap_or_else(|| {
                DeclaredType::Unknown(expr.node.to_string())
            }),
            other => DeclaredType::Unknown(other.to_string()),
        }
    }

    fn from_call(name: &str, args: &[Spanned<Expr>]) -> Option<Self> {
        let single = || match args {
            [inner] => Some(Box::new(Self::from_expr(inner))),
            _ => None,
        };
        let ty = match name {
            "list" => DeclaredType::List(single()?),
            "set" => DeclaredType::Set(single()?),
            "map" => DeclaredType::Map(single()?),
            "tuple" => match args {
                [Spanned { node: Expr::Tuple(items), .. }] => {
                    DeclaredType::Tuple(items.iter().map(Self::from_expr).collect())
                }
                _ => return None,
            },
            "object" => match args {
                [Spanned { node: Expr::Object(items), .. }] => {
                    let mut attrs = Vec::with_capacity(items.len());
                    for item in items {
                        let name = match &item.key {
                            ObjectKey::Ident(name) => name.clone(),
                            ObjectKey::Expr(k) => match &k.node {
                                Expr::Literal(Literal::String(s)) => s.clone(),
                                _ => return None,
                            },
                        };
                        attrs.push(Self::object_attr(name, &item.value));
                    }
                    DeclaredType::Object(attrs)
                }
                _ => return None,
            },
            _ => return None,
        };
        Some(ty)
    }

    fn object_attr(name: String, value: &Spanned<Expr>) -> ObjectAttr {
        if let Expr::Call { name: call, args, .. } = &value.node {
            if call == "optional" && !args.is_empty() {
                let default = args.get(1).and_then(|d| eval::constant(d).ok());
                return ObjectAttr {
                    name,
                    ty: Self::from_expr(&args[0]),
                    optional: true,
                    default,
                };
            }
        }
        ObjectAttr {
            name,
            ty: Self::from_expr(value),
            optional: false,
            default: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        match self {
            DeclaredType::Unknown(_) => true,
            DeclaredType::List(t) | DeclaredType::Set(t) | DeclaredType::Map(t) => t.is_unknown(),
            DeclaredType::Tuple(items) => items.iter().any(Self::is_unknown),
            DeclaredType::Object(attrs) => attrs.iter().any(|a| a.ty.is_unknown()),
            _ => false,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            DeclaredType::List(_) | DeclaredType::Set(_) | DeclaredType::Map(_) | DeclaredType::Tuple(_)
        )
    }

    /// A value of this type that is as plain as possible.
    ///
    /// Objects get every required attribute; optional ones are left to their defaults.
    pub fn placeholder(&self) -> Option<Value> {
        Some(match self {
            DeclaredType::Any | DeclaredType::String => Value::string("example"),
            DeclaredType::Number => Value::Number(1.0),
            DeclaredType::Bool => Value::Bool(false),
            DeclaredType::List(_) | DeclaredType::Set(_) => Value::List(Vec::new()),
            DeclaredType::Map(_) => Value::Map(BTreeMap::new()),
            DeclaredType::Tuple(items) => {
                Value::List(items.iter().map(Self::placeholder).collect::<Option<Vec<_>>>()?)
            }
            DeclaredType::Object(attrs) => {
                let mut out = BTreeMap::new();
                for attr in attrs.iter().filter(|a| !a.optional) {
                    out.insert(attr.name.clone(), attr.ty.placeholder()?);
                }
                Value::Map(out)
            }
            DeclaredType::Unknown(_) => return None,
        })
    }

    /// A non-empty collection of this type with two distinct entries.
    pub fn populated_sample(&self) -> Option<Value> {
        match self {
            DeclaredType::List(elem) | DeclaredType::Set(elem) => {
                Some(Value::List(vec![elem.element_sample(1)?, elem.element_sample(2)?]))
            }
            DeclaredType::Map(elem) => {
                let mut out = BTreeMap::new();
                out.insert("key1".to_string(), elem.element_sample(1)?);
                out.insert("key2".to_string(), elem.element_sample(2)?);
                Some(Value::Map(out))
            }
            _ => None,
        }
    }

    fn element_sample(&self, n: usize) -> Option<Value> {
        Some(match self {
            DeclaredType::Any | DeclaredType::String => Value::String(format!("example-{}", n)),
            DeclaredType::Number => Value::Number(n as f64),
            DeclaredType::Bool => Value::Bool(n % 2 == 1),
            other => other.placeholder()?,
        })
    }

    /// Convert a value to this type, the way Terraform converts variable values.
    ///
    /// ## Errors
    /// Returns a message describing the first mismatch.
    pub fn convert(&self, value: Value) -> Result<Value, String> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            DeclaredType::Any | DeclaredType::Unknown(_) => Ok(value),
            DeclaredType::String => match value {
                Value::String(_) => Ok(value),
                ref v if v.is_scalar() => Ok(Value::String(v.as_string().unwrap_or_default())),
                v => Err(format!("string required, got {}", v.type_name())),
            },
            DeclaredType::Number => value
                .as_number()
                .map(Value::Number)
                .ok_or_else(|| format!("number required, got {}", value)),
            DeclaredType::Bool => value
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| format!("bool required, got {}", value)),
            DeclaredType::List(elem) | DeclaredType::Set(elem) => {
                let Value::List(items) = value else {
                    return Err(format!("list required, got {}", value.type_name()));
                };
                let items = items.into_iter().map(|v| elem.convert(v)).collect::<Result<Vec<_>, _>>()?;
                if matches!(self, DeclaredType::Set(_)) {
                    Ok(Value::List(eval::functions::sorted_set(items)))
                } else {
                    Ok(Value::List(items))
                }
            }
            DeclaredType::Map(elem) => {
                let Value::Map(entries) = value else {
                    return Err(format!("map required, got {}", value.type_name()));
                };
                let mut out = BTreeMap::new();
                for (k, v) in entries {
                    let v = elem.convert(v).map_err(|e| format!("element \"{}\": {}", k, e))?;
                    out.insert(k, v);
                }
                Ok(Value::Map(out))
            }
            DeclaredType::Tuple(types) => {
                let Value::List(items) = value else {
                    return Err(format!("tuple required, got {}", value.type_name()));
                };
                if items.len() != types.len() {
                    return Err(format!("tuple of {} elements required, got {}", types.len(), items.len()));
                }
                let items = types
                    .iter()
                    .zip(items)
                    .map(|(t, v)| t.convert(v))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(items))
            }
            DeclaredType::Object(attrs) => {
                let Value::Map(mut entries) = value else {
                    return Err(format!("object required, got {}", value.type_name()));
                };
                let mut out = BTreeMap::new();
                for attr in attrs {
                    match entries.remove(&attr.name) {
                        Some(v) if !v.is_null() => {
                            let v = attr.ty.convert(v).map_err(|e| format!("attribute \"{}\": {}", attr.name, e))?;
                            out.insert(attr.name.clone(), v);
                        }
                        _ if attr.optional => {
                            let fill = match &attr.default {
                                Some(d) => attr.ty.convert(d.clone())?,
                                None => Value::Null,
                            };
                            out.insert(attr.name.clone(), fill);
                        }
                        Some(v) => {
                            out.insert(attr.name.clone(), v);
                        }
                        None => return Err(format!("attribute \"{}\" is required", attr.name)),
                    }
                }
                Ok(Value::Map(out))
            }
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Any => write!(f, "any"),
            DeclaredType::String => write!(f, "string"),
            DeclaredType::Number => write!(f, "number"),
            DeclaredType::Bool => write!(f, "bool"),
            DeclaredType::List(t) => write!(f, "list({})", t),
            DeclaredType::Set(t) => write!(f, "set({})", t),
            DeclaredType::Map(t) => write!(f, "map({})", t),
            DeclaredType::Tuple(items) => {
                let items: Vec<String> = items.iter().map(|t| t.to_string()).collect();
                write!(f, "tuple([{}])", items.join(", "))
            }
            DeclaredType::Object(attrs) => {
                let attrs: Vec<String> = attrs
                    .iter()
                    .map(|a| match (a.optional, &a.default) {
                        (true, Some(d)) => format!("{} = optional({}, {})", hcl_key(&a.name), a.ty, d),
                        (true, None) => format!("{} = optional({})", hcl_key(&a.name), a.ty),
                        _ => format!("{} = {}", hcl_key(&a.name), a.ty),
                    })
                    .collect();
                write!(f, "object({{ {} }})", attrs.join(", "))
            }
            DeclaredType::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

/// Whether an expression is a plain string literal (no interpolation).
pub(crate) fn literal_string(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Literal(Literal::String(s)) => Some(s),
        Expr::Template(parts) if parts.len() == 1 => match &parts[0] {
            TemplatePart::Literal(s) => Some(s),
            TemplatePart::Interp(_) => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression_source;

    fn ty(source: &str) -> DeclaredType {
        DeclaredType::from_expr(&parse_expression_source(source).unwrap())
    }

    #[test]
    fn test_resolve_types() {
        assert_eq!(ty("string"), DeclaredType::String);
        assert_eq!(ty("map(string)"), DeclaredType::Map(Box::new(DeclaredType::String)));
        assert_eq!(ty("\"list\""), DeclaredType::List(Box::new(DeclaredType::Any)));
        assert_eq!(ty("list(object({ name = string, port = optional(number, 80) }))").to_string(),
            "list(object({ name = string, port = optional(number, 80) }))");
        assert!(ty("stringg").is_unknown());
        assert!(ty("list(frob)").is_unknown());
        assert!(ty("map(string, number)").is_unknown());
    }

    #[test]
    fn test_convert_object_fills_optional_defaults() {
        let t = ty("object({ name = string, port = optional(number, 80), tag = optional(string) })");
        let mut v = BTreeMap::new();
        v.insert("name".to_string(), Value::string("web"));
        let out = t.convert(Value::Map(v)).unwrap();
        assert_eq!(out.to_hcl(), r#"{ name = "web", port = 80, tag = null }"#);
        assert!(t.convert(Value::Map(BTreeMap::new())).is_err());
    }

    #[test]
    fn test_convert_scalars_and_sets() {
        assert_eq!(DeclaredType::Number.convert(Value::string("5")), Ok(Value::Number(5.0)));
        assert_eq!(DeclaredType::String.convert(Value::Bool(true)), Ok(Value::string("true")));
        assert!(DeclaredType::Bool.convert(Value::string("yes")).is_err());
        let set = ty("set(string)");
        let out = set.convert(Value::List(vec![Value::string("b"), Value::string("a"), Value::string("b")]));
        assert_eq!(out.unwrap().to_hcl(), r#"["a", "b"]"#);
    }

    #[test]
    fn test_samples() {
        assert_eq!(ty("map(string)").populated_sample().unwrap().to_hcl(), r#"{ key1 = "example-1", key2 = "example-2" }"#);
        assert_eq!(ty("list(number)").populated_sample().unwrap().to_hcl(), "[1, 2]");
        assert_eq!(ty("object({ a = string, b = optional(bool) })").placeholder().unwrap().to_hcl(), r#"{ a = "example" }"#);
        assert_eq!(ty("frob").placeholder(), None);
    }
}
