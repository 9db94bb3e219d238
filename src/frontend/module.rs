//! Loading a Terraform module directory.
//!
//! A module is every `*.tf` file directly inside one directory. Files are read in
//! sorted order so that everything downstream sees declarations in a stable order.

use std::fs;
use std::path::{Path, PathBuf};

use super::ast::Body;
use super::diagnostics::format_error;
use super::parser;

/// Largest `.tf` file we are willing to read.
pub const MAX_SOURCE_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// One parsed `.tf` file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the module directory (just the file name).
    pub path: PathBuf,
    pub source: String,
    pub body: Body,
}

/// All parsed files of one module directory.
#[derive(Debug, Clone)]
pub struct ModuleSource {
    /// Directory name, used in generated file headers.
    pub name: String,
    pub dir: PathBuf,
    pub files: Vec<SourceFile>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("{path} is {size} bytes; files over {limit} bytes are not read")]
    TooLarge { path: PathBuf, size: u64, limit: u64 },
    #[error("no .tf files found in {0}")]
    NoFiles(PathBuf),
    /// Formatted diagnostics, one per error, ready to print.
    #[error("{}", .0.join("\n"))]
    Syntax(Vec<String>),
    /// Parsed fine but declares something invalid (duplicates, missing labels).
    #[error("{}", .0.join("\n"))]
    Interface(Vec<String>),
}

impl ModuleSource {
    /// Build a module from in-memory sources, e.g. for tests.
    pub fn from_sources(name: &str, sources: &[(&str, &str)]) -> Result<Self, ModuleError> {
        let mut files = Vec::new();
        let mut diagnostics = Vec::new();
        for (path, source) in sources {
            match parser::parse_source(source) {
                Ok(body) => files.push(SourceFile {
                    path: PathBuf::from(path),
                    source: source.to_string(),
                    body,
                }),
                Err(errors) => diagnostics.extend(errors.iter().map(|e| format_error(path, source, e))),
            }
        }
        if !diagnostics.is_empty() {
            return Err(ModuleError::Syntax(diagnostics));
        }
        Ok(Self {
            name: name.to_string(),
            dir: PathBuf::from("."),
            files,
        })
    }

    /// Find a file by its relative path.
    pub fn file(&self, path: &Path) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

/// Read and parse every `.tf` file in `dir`.
///
/// ## Errors
/// - [`ModuleError::NoFiles`] when the directory has no `.tf` files.
/// - [`ModuleError::Syntax`] with every diagnostic from every file when any file fails to parse.
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_module(dir: &Path) -> Result<ModuleSource, ModuleError> {
    let io_err = |path: &Path, e: std::io::Error| ModuleError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "tf"))
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(ModuleError::NoFiles(dir.to_path_buf()));
    }

    let mut files = Vec::with_capacity(paths.len());
    let mut diagnostics = Vec::new();
    for path in paths {
        let size = fs::metadata(&path).map_err(|e| io_err(&path, e))?.len();
        if size > MAX_SOURCE_FILE_SIZE {
            return Err(ModuleError::TooLarge {
                path,
                size,
                limit: MAX_SOURCE_FILE_SIZE,
            });
        }
        let source = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let rel = path.file_name().map(PathBuf::from).unwrap_or_else(|| path.clone());
        let shown = rel.display().to_string();
        match parser::parse_source(&source) {
            Ok(body) => {
                tracing::debug!(file = %shown, items = body.items.len(), "parsed");
                files.push(SourceFile { path: rel, source, body });
            }
            Err(errors) => diagnostics.extend(errors.iter().map(|e| format_error(&shown, &source, e))),
        }
    }

    if !diagnostics.is_empty() {
        return Err(ModuleError::Syntax(diagnostics));
    }

    let name = dir
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "module".to_string());

    Ok(ModuleSource {
        name,
        dir: dir.to_path_buf(),
        files,
    })
}
