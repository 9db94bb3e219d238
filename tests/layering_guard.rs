//! Layering guardrails for the pipeline.
//!
//! Only the CLI layer may spawn processes or exit: extraction, enumeration,
//! synthesis and emission must stay pure so they can be tested without Terraform.
//! These tests scan the library sources outside `src/cli/` and fail on either.

use std::fs;
use std::path::{Path, PathBuf};

fn library_sources(dir: &Path, out: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).expect("src/ is readable") {
        let path = entry.expect("directory entry").path();
        if path.is_dir() {
            if path.file_name().is_some_and(|n| n == "cli") {
                continue;
            }
            library_sources(&path, out);
        } else if path.extension().is_some_and(|e| e == "rs") {
            out.push(path);
        }
    }
}

fn offending_lines(needle: &str) -> Vec<String> {
    let mut files = Vec::new();
    library_sources(Path::new("src"), &mut files);
    let mut hits = Vec::new();
    for path in files {
        // The binary entry point hands straight over to the CLI.
        if path.ends_with("main.rs") {
            continue;
        }
        let source = fs::read_to_string(&path).expect("source is readable");
        for (i, line) in source.lines().enumerate() {
            let code = line.split("//").next().unwrap_or("");
            if code.contains(needle) {
                hits.push(format!("{}:{}: {}", path.display(), i + 1, line.trim()));
            }
        }
    }
    hits
}

#[test]
fn library_never_spawns_processes() {
    let hits = offending_lines("process::Command");
    assert!(hits.is_empty(), "process spawning outside src/cli:\n{}", hits.join("\n"));
}

#[test]
fn library_never_exits() {
    let hits = offending_lines("process::exit");
    assert!(hits.is_empty(), "process::exit outside src/cli:\n{}", hits.join("\n"));
}

#[test]
fn syntax_crate_is_a_regular_dependency() {
    let manifest = include_str!("../Cargo.toml");
    let mut in_dependencies = false;
    let mut found = false;

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }
        if in_dependencies && line.starts_with("tfscenario_syntax") {
            found = true;
        }
    }
    assert!(found, "`tfscenario_syntax` must be a regular dependency of the root crate");
}
