//! Candidate values tried for an input while searching for a branch outcome.

use crate::eval::Value;
use crate::interface::{DeclaredType, InputDecl, ModuleInterface};

/// Ordered, de-duplicated candidate values for one input.
///
/// The current value comes first so that the search prefers leaving inputs alone;
/// then literals the module compares the input against, documented allowed values,
/// bound neighbours and finally plain edge values of the type.
pub(super) fn candidates(module: &ModuleInterface, input: &InputDecl, current: Option<&Value>) -> Vec<Value> {
    let mut raw: Vec<Value> = Vec::new();
    raw.extend(current.cloned());

    if let Some(facts) = module.facts(&input.name) {
        for v in &facts.compared {
            raw.push(v.clone());
            if let Some(n) = v.as_number() {
                raw.push(Value::Number(n - 1.0));
                raw.push(Value::Number(n + 1.0));
            }
        }
        if let Some(allowed) = &facts.allowed {
            raw.extend(allowed.iter().cloned());
        }
        if let Some(min) = facts.minimum() {
            raw.push(Value::Number(min));
            raw.push(Value::Number(min - 1.0));
        }
        if let Some(max) = facts.maximum() {
            raw.push(Value::Number(max));
            raw.push(Value::Number(max + 1.0));
        }
    }

    raw.extend(type_edges(&input.ty));
    if input.nullable {
        raw.push(Value::Null);
    }

    let mut out: Vec<Value> = Vec::new();
    for v in raw {
        let Ok(v) = input.ty.convert(v) else {
            continue;
        };
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// Values that exercise a type's obvious edges.
pub(super) fn type_edges(ty: &DeclaredType) -> Vec<Value> {
    match ty {
        DeclaredType::Bool => vec![Value::Bool(true), Value::Bool(false)],
        DeclaredType::Number => vec![Value::Number(0.0), Value::Number(1.0)],
        DeclaredType::String => vec![Value::string(""), Value::string("example")],
        DeclaredType::List(_) | DeclaredType::Set(_) | DeclaredType::Map(_) => {
            ty.placeholder().into_iter().chain(ty.populated_sample()).collect()
        }
        DeclaredType::Tuple(_) | DeclaredType::Object(_) => ty.placeholder().into_iter().collect(),
        DeclaredType::Any | DeclaredType::Unknown(_) => Vec::new(),
    }
}

/// Odometer over candidate lists: every combination, first list slowest.
pub(super) struct Odometer<'a> {
    lists: &'a [Vec<Value>],
    indices: Vec<usize>,
    done: bool,
}

impl<'a> Odometer<'a> {
    pub(super) fn new(lists: &'a [Vec<Value>]) -> Self {
        Self {
            lists,
            indices: vec![0; lists.len()],
            done: lists.is_empty() || lists.iter().any(Vec::is_empty),
        }
    }
}

impl<'a> Iterator for Odometer<'a> {
    type Item = Vec<&'a Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self
            .indices
            .iter()
            .zip(self.lists)
            .map(|(i, list)| &list[*i])
            .collect();

        // Advance, last position fastest.
        let mut pos = self.indices.len();
        loop {
            if pos == 0 {
                self.done = true;
                break;
            }
            pos -= 1;
            self.indices[pos] += 1;
            if self.indices[pos] < self.lists[pos].len() {
                break;
            }
            self.indices[pos] = 0;
        }
        Some(item)
    }
}
