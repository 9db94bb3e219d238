//! Interface extraction: what a module declares and which of its expressions branch on inputs.
//!
//! [`extract`] turns a parsed [`ModuleSource`] into a [`ModuleInterface`]:
//! - inputs (`variable` blocks) with resolved types, evaluated defaults and validations
//! - outputs, locals and resources with their expressions kept for evaluation
//! - branches: input-dependent conditions found in outputs, locals and resource arguments
//! - per-input constraint facts used to pick interesting values
//!
//! ## Notes
//! - An input whose type cannot be resolved is kept and flagged (`type_unknown`); it never
//!   stops extraction.
//! - A default that cannot be evaluated is treated as absent and reported as a warning.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::ast::{Block, Body, Expr, Span, Spanned};
use crate::diagnostics::{CompileError, format_error};
use crate::eval::{self, Value};
use crate::frontend::module::{ModuleError, ModuleSource, SourceFile};

mod branches;
mod facts;
pub mod types;

pub use branches::Branch;
pub use facts::{Bound, InputFacts};
pub use types::DeclaredType;

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone)]
pub struct Validation {
    pub condition: Spanned<Expr>,
    pub error_message: String,
}

#[derive(Debug, Clone)]
pub struct InputDecl {
    pub name: String,
    pub ty: DeclaredType,
    /// `None` when the input is required; `Some(Value::Null)` for `default = null`.
    pub default: Option<Value>,
    /// Effective nullability (Terraform's default is `true`).
    pub nullable: bool,
    /// `nullable = true` was written out, i.e. null is documented behavior.
    pub nullable_declared: bool,
    pub sensitive: bool,
    pub description: Option<String>,
    pub validations: Vec<Validation>,
    pub file: PathBuf,
    pub span: Span,
}

impl InputDecl {
    pub fn type_unknown(&self) -> bool {
        self.ty.is_unknown()
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct OutputDecl {
    pub name: String,
    pub value: Spanned<Expr>,
    pub description: Option<String>,
    pub sensitive: bool,
    pub file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LocalDecl {
    pub name: String,
    pub value: Spanned<Expr>,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceMode {
    Managed,
    Data,
}

#[derive(Debug, Clone)]
pub struct ResourceDecl {
    pub mode: ResourceMode,
    pub ty: String,
    pub name: String,
    pub count: Option<Spanned<Expr>>,
    pub for_each: Option<Spanned<Expr>>,
    /// Top-level arguments; nested blocks are not modeled.
    pub args: BTreeMap<String, Spanned<Expr>>,
    pub file: PathBuf,
}

impl ResourceDecl {
    pub fn address(&self) -> String {
        match self.mode {
            ResourceMode::Managed => format!("{}.{}", self.ty, self.name),
            ResourceMode::Data => format!("data.{}.{}", self.ty, self.name),
        }
    }

    /// Declared with `count` or `for_each`.
    pub fn is_multi(&self) -> bool {
        self.count.is_some() || self.for_each.is_some()
    }
}

/// Everything a module declares, plus the branches and facts derived from it.
#[derive(Debug, Clone)]
pub struct ModuleInterface {
    pub name: String,
    pub inputs: Vec<InputDecl>,
    pub outputs: Vec<OutputDecl>,
    pub locals: Vec<LocalDecl>,
    pub resources: Vec<ResourceDecl>,
    pub branches: Vec<Branch>,
    pub facts: BTreeMap<String, InputFacts>,
    /// Formatted warning diagnostics.
    pub warnings: Vec<String>,
}

impl ModuleInterface {
    /// Parse and extract in one step, e.g. for tests.
    pub fn from_sources(name: &str, sources: &[(&str, &str)]) -> Result<Self, ModuleError> {
        extract(&ModuleSource::from_sources(name, sources)?)
    }

    pub fn input(&self, name: &str) -> Option<&InputDecl> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputDecl> {
        self.outputs.iter().find(|o| o.name == name)
    }

    pub fn local(&self, name: &str) -> Option<&LocalDecl> {
        self.locals.iter().find(|l| l.name == name)
    }

    /// A managed resource by type and name.
    pub fn resource(&self, ty: &str, name: &str) -> Option<&ResourceDecl> {
        self.resources
            .iter()
            .find(|r| r.mode == ResourceMode::Managed && r.ty == ty && r.name == name)
    }

    pub fn facts(&self, input: &str) -> Option<&InputFacts> {
        self.facts.get(input)
    }

    /// Position of an input in declaration order.
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|i| i.name == name)
    }

    /// A flat, serializable record of the interface.
    pub fn summary(&self) -> InterfaceSummary {
        InterfaceSummary {
            module: self.name.clone(),
            inputs: self
                .inputs
                .iter()
                .map(|i| InputSummary {
                    name: i.name.clone(),
                    ty: i.ty.to_string(),
                    default: i.default.clone(),
                    required: i.is_required(),
                    nullable: i.nullable,
                    sensitive: i.sensitive,
                    type_unknown: i.type_unknown(),
                    validations: i.validations.len(),
                    description: i.description.clone(),
                })
                .collect(),
            outputs: self
                .outputs
                .iter()
                .map(|o| OutputSummary {
                    name: o.name.clone(),
                    expression: o.value.node.to_string(),
                    sensitive: o.sensitive,
                    description: o.description.clone(),
                })
                .collect(),
            branches: self
                .branches
                .iter()
                .map(|b| BranchSummary {
                    id: b.id,
                    condition: b.key.clone(),
                    origins: b.origins.clone(),
                    drivers: b.drivers.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InterfaceSummary {
    pub module: String,
    pub inputs: Vec<InputSummary>,
    pub outputs: Vec<OutputSummary>,
    pub branches: Vec<BranchSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub default: Option<Value>,
    pub required: bool,
    pub nullable: bool,
    pub sensitive: bool,
    pub type_unknown: bool,
    pub validations: usize,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputSummary {
    pub name: String,
    pub expression: String,
    pub sensitive: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchSummary {
    pub id: usize,
    pub condition: String,
    pub origins: Vec<String>,
    pub drivers: Vec<String>,
}

// ============================================================================
// Extraction
// ============================================================================

/// Extract the interface of a parsed module.
///
/// ## Errors
/// Returns [`ModuleError::Interface`] for duplicate declarations and malformed blocks.
#[tracing::instrument(skip_all, fields(module = %source.name))]
pub fn extract(source: &ModuleSource) -> Result<ModuleInterface, ModuleError> {
    let mut ex = Extractor::default();
    for file in &source.files {
        ex.file(file);
    }

    if !ex.errors.is_empty() {
        return Err(ModuleError::Interface(ex.errors));
    }

    let mut interface = ModuleInterface {
        name: source.name.clone(),
        inputs: ex.inputs,
        outputs: ex.outputs,
        locals: ex.locals,
        resources: ex.resources,
        branches: Vec::new(),
        facts: BTreeMap::new(),
        warnings: ex.warnings,
    };
    interface.branches = branches::discover(&interface);
    interface.facts = facts::collect(&interface);

    for input in interface.inputs.iter().filter(|i| i.type_unknown()) {
        tracing::warn!(input = %input.name, ty = %input.ty, "input type could not be resolved");
    }
    tracing::debug!(
        inputs = interface.inputs.len(),
        outputs = interface.outputs.len(),
        branches = interface.branches.len(),
        "extracted interface"
    );
    Ok(interface)
}

#[derive(Default)]
struct Extractor {
    inputs: Vec<InputDecl>,
    outputs: Vec<OutputDecl>,
    locals: Vec<LocalDecl>,
    resources: Vec<ResourceDecl>,
    seen: HashSet<String>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Extractor {
    fn file(&mut self, file: &SourceFile) {
        for block in file.body.blocks() {
            match block.node.kind.as_str() {
                "variable" => self.variable(file, block),
                "output" => self.output(file, block),
                "locals" => self.locals(file, block.node),
                "resource" => self.resource(file, block, ResourceMode::Managed),
                "data" => self.resource(file, block, ResourceMode::Data),
                _ => {}
            }
        }
    }

    fn error(&mut self, file: &SourceFile, err: CompileError) {
        self.errors.push(format_error(&file.path.display().to_string(), &file.source, &err));
    }

    fn warn(&mut self, file: &SourceFile, err: CompileError) {
        self.warnings.push(format_error(&file.path.display().to_string(), &file.source, &err));
    }

    /// Require exactly `n` labels and register the declaration key; `None` on error.
    fn declare(&mut self, file: &SourceFile, block: Spanned<&Block>, n: usize, key: String) -> Option<()> {
        if block.node.labels.len() != n {
            self.error(
                file,
                CompileError::interface(
                    format!(
                        "'{}' block needs {} label{}, found {}",
                        block.node.kind,
                        n,
                        if n == 1 { "" } else { "s" },
                        block.node.labels.len()
                    ),
                    block.span,
                ),
            );
            return None;
        }
        if !self.seen.insert(key.clone()) {
            self.error(file, CompileError::interface(format!("Duplicate declaration of {}", key), block.span));
            return None;
        }
        Some(())
    }

    fn variable(&mut self, file: &SourceFile, block: Spanned<&Block>) {
        let name = block.node.labels.first().cloned().unwrap_or_default();
        if self.declare(file, block, 1, format!("var.{}", name)).is_none() {
            return;
        }
        let body = &block.node.body;

        let ty = match body.attribute("type") {
            Some(attr) => DeclaredType::from_expr(&attr.value),
            None => DeclaredType::Any,
        };
        if ty.is_unknown() {
            let span = body.attribute("type").map(|a| a.value.span).unwrap_or(block.span);
            self.warn(
                file,
                CompileError::warning(format!("Type of input '{}' cannot be resolved: {}", name, ty), span)
                    .with_note("the input is marked type-unknown; scenarios use its default if it has one"),
            );
        }

        let default = match body.attribute("default") {
            None => None,
            Some(attr) => match eval::constant(&attr.value).and_then(|v| {
                ty.convert(v).map_err(eval::Unknown::invalid)
            }) {
                Ok(v) => Some(v),
                Err(u) => {
                    self.warn(
                        file,
                        CompileError::warning(
                            format!("Default of input '{}' cannot be evaluated: {}", name, u.detail),
                            attr.value.span,
                        )
                        .with_note("the input is treated as required"),
                    );
                    None
                }
            },
        };

        let nullable_attr = self.bool_attr(file, body, "nullable");
        let validations = body
            .blocks_of("validation")
            .filter_map(|v| {
                let condition = v.node.body.attribute("condition")?.value.clone();
                let error_message = v
                    .node
                    .body
                    .attribute("error_message")
                    .map(|a| match eval::constant(&a.value) {
                        Ok(Value::String(s)) => s,
                        _ => a.value.node.to_string(),
                    })
                    .unwrap_or_default();
                Some(Validation {
                    condition,
                    error_message,
                })
            })
            .collect();

        let sensitive = self.bool_attr(file, body, "sensitive").unwrap_or(false);
        let description = string_attr(body, "description");
        self.inputs.push(InputDecl {
            name,
            ty,
            default,
            nullable: nullable_attr.unwrap_or(true),
            nullable_declared: nullable_attr == Some(true),
            sensitive,
            description,
            validations,
            file: file.path.clone(),
            span: block.span,
        });
    }

    fn output(&mut self, file: &SourceFile, block: Spanned<&Block>) {
        let name = block.node.labels.first().cloned().unwrap_or_default();
        if self.declare(file, block, 1, format!("output.{}", name)).is_none() {
            return;
        }
        let body = &block.node.body;
        let Some(value) = body.attribute("value") else {
            self.error(
                file,
                CompileError::interface(format!("Output '{}' has no 'value' argument", name), block.span),
            );
            return;
        };
        let sensitive = self.bool_attr(file, body, "sensitive").unwrap_or(false);
        self.outputs.push(OutputDecl {
            name,
            value: value.value.clone(),
            description: string_attr(body, "description"),
            sensitive,
            file: file.path.clone(),
        });
    }

    fn locals(&mut self, file: &SourceFile, block: &Block) {
        for attr in block.body.attributes() {
            if !self.seen.insert(format!("local.{}", attr.name)) {
                self.error(
                    file,
                    CompileError::interface(format!("Duplicate declaration of local.{}", attr.name), attr.value.span),
                );
                continue;
            }
            self.locals.push(LocalDecl {
                name: attr.name.clone(),
                value: attr.value.clone(),
                file: file.path.clone(),
            });
        }
    }

    fn resource(&mut self, file: &SourceFile, block: Spanned<&Block>, mode: ResourceMode) {
        let (ty, name) = match block.node.labels.as_slice() {
            [ty, name] => (ty.clone(), name.clone()),
            _ => (String::new(), String::new()),
        };
        let prefix = if mode == ResourceMode::Data { "data." } else { "" };
        if self.declare(file, block, 2, format!("{}{}.{}", prefix, ty, name)).is_none() {
            return;
        }
        let body = &block.node.body;
        let count = body.attribute("count").map(|a| a.value.clone());
        let for_each = body.attribute("for_each").map(|a| a.value.clone());
        if count.is_some() && for_each.is_some() {
            self.error(
                file,
                CompileError::interface(
                    format!("{}{}.{} sets both 'count' and 'for_each'", prefix, ty, name),
                    block.span,
                ),
            );
            return;
        }
        let args = body
            .attributes()
            .filter(|a| !matches!(a.name.as_str(), "count" | "for_each" | "depends_on" | "provider"))
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();
        self.resources.push(ResourceDecl {
            mode,
            ty,
            name,
            count,
            for_each,
            args,
            file: file.path.clone(),
        });
    }

    /// A literal boolean argument; anything else is reported and ignored.
    fn bool_attr(&mut self, file: &SourceFile, body: &Body, name: &str) -> Option<bool> {
        let attr = body.attribute(name)?;
        match eval::constant(&attr.value).ok().and_then(|v| v.as_bool()) {
            Some(b) => Some(b),
            None => {
                self.warn(
                    file,
                    CompileError::warning(format!("'{}' must be a literal bool; ignored", name), attr.value.span),
                );
                None
            }
        }
    }
}

fn string_attr(body: &Body, name: &str) -> Option<String> {
    let attr = body.attribute(name)?;
    match eval::constant(&attr.value) {
        Ok(Value::String(s)) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
