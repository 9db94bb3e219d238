//! Integration tests for the full pipeline over module fixtures

use std::fs;
use std::path::Path;

use tfscenario::Config;
use tfscenario::coverage::GapKind;
use tfscenario::emit::{FileStatus, check_files, write_files};
use tfscenario::frontend::module::ModuleError;
use tfscenario::generate_dir;

const FIXTURES: &str = "tests/fixtures/modules";

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(FIXTURES).join(name)
}

fn scenario_names(generated: &tfscenario::Generated) -> Vec<&str> {
    generated.scenarios.scenarios.iter().map(|s| s.name.as_str()).collect()
}

#[test]
fn test_backup_fixture_scenarios() {
    let generated = generate_dir(&fixture("backup"), &Config::new()).unwrap();

    assert_eq!(generated.interface.name, "backup");
    assert_eq!(
        scenario_names(&generated),
        vec![
            "defaults",
            "environment_is_prod",
            "environment_is_staging",
            "retention_days_minimum",
            "retention_days_maximum",
            "access_list_ips_populated",
        ]
    );
    assert!(generated.gaps.is_empty(), "{:?}", generated.gaps);
}

#[test]
fn test_backup_fixture_assertions_follow_the_branch() {
    let generated = generate_dir(&fixture("backup"), &Config::new()).unwrap();
    let synthesis = &generated.synthesis;

    let defaults: Vec<&str> = synthesis
        .assertions_for("defaults")
        .iter()
        .map(|a| a.condition.as_str())
        .collect();
    assert_eq!(defaults, vec!["output.backup_enabled == false"]);

    let prod: Vec<&str> = synthesis
        .assertions_for("environment_is_prod")
        .iter()
        .map(|a| a.condition.as_str())
        .collect();
    assert_eq!(prod, vec!["output.backup_enabled == true"]);
}

#[test]
fn test_backup_fixture_files_are_plan_only() {
    let generated = generate_dir(&fixture("backup"), &Config::new()).unwrap();
    assert_eq!(generated.files.len(), 1);
    let file = &generated.files[0];
    assert_eq!(file.file_name, "main.tftest.hcl");
    assert_eq!(file.runs, generated.scenarios.scenarios.len());
    assert_eq!(file.contents.matches("command = plan").count(), file.runs);
    assert!(file.contents.contains("\nvariables {\n  environment = \"dev\"\n}\n"));
}

#[test]
fn test_web_fixture_counts_and_gaps() {
    let generated = generate_dir(&fixture("web"), &Config::new()).unwrap();
    let names = scenario_names(&generated);
    assert!(names.contains(&"enable_logging_enabled"), "{:?}", names);
    assert!(names.contains(&"instance_count_maximum"), "{:?}", names);

    let conditions: Vec<&str> = generated
        .synthesis
        .assertions_for("instance_count_maximum")
        .iter()
        .map(|a| a.condition.as_str())
        .collect();
    assert!(conditions.contains(&"length(aws_instance.web) == 4"), "{:?}", conditions);

    let sensitive = generated
        .gaps
        .iter()
        .find(|g| g.kind == GapKind::Sensitive)
        .expect("sensitive output should be a gap");
    assert_eq!(sensitive.subject, "output.password");

    let after_apply = generated
        .gaps
        .iter()
        .find(|g| g.subject == "output.instance_ids")
        .expect("splat over computed ids should be a gap");
    assert_eq!(after_apply.kind, GapKind::AfterApply);
    assert_eq!(after_apply.scenario, None);
}

#[test]
fn test_web_fixture_areas() {
    let config = Config::new().with_area("logging", &["enable_logging"]);
    let generated = generate_dir(&fixture("web"), &config).unwrap();
    let names: Vec<&str> = generated.files.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, vec!["main.tftest.hcl", "logging.tftest.hcl"]);
    assert!(generated.files[1].contents.contains("run \"enable_logging_enabled\""));
    assert!(!generated.files[0].contents.contains("run \"enable_logging_enabled\""));
}

#[test]
fn test_acknowledged_gaps_are_not_reported() {
    let config = Config::new()
        .with_acknowledged_gap("output.password")
        .with_acknowledged_gap("output.instance_ids");
    let generated = generate_dir(&fixture("web"), &config).unwrap();
    let open: Vec<String> = generated
        .unacknowledged_gaps(&config)
        .iter()
        .map(|g| g.subject.clone())
        .collect();
    assert!(!open.contains(&"output.password".to_string()));
    assert!(!open.contains(&"output.instance_ids".to_string()));
}

#[test]
fn test_broken_fixture_reports_syntax_errors() {
    let err = generate_dir(&fixture("broken"), &Config::new()).unwrap_err();
    match err {
        ModuleError::Syntax(diagnostics) => {
            assert!(!diagnostics.is_empty());
            assert!(diagnostics.iter().all(|d| d.contains("main.tf")), "{:?}", diagnostics);
        }
        other => panic!("expected syntax error, got {:?}", other),
    }
}

#[test]
fn test_missing_directory() {
    let err = generate_dir(&fixture("does_not_exist"), &Config::new()).unwrap_err();
    assert!(matches!(err, ModuleError::Io { .. }), "{:?}", err);
}

#[test]
fn test_write_then_check_round_trip() {
    let generated = generate_dir(&fixture("backup"), &Config::new()).unwrap();
    let dir = tempfile::tempdir().unwrap();

    write_files(&generated.files, dir.path()).unwrap();
    let statuses = check_files(&generated.files, dir.path());
    assert!(statuses.iter().all(|(_, s)| *s == FileStatus::UpToDate));

    let path = dir.path().join("main.tftest.hcl");
    let edited = fs::read_to_string(&path).unwrap().replace("command = plan", "command = apply");
    fs::write(&path, edited).unwrap();
    match &check_files(&generated.files, dir.path())[0].1 {
        FileStatus::Stale(diff) => {
            assert!(diff.contains("command = apply"));
            assert!(diff.contains("command = plan"));
        }
        other => panic!("expected stale file, got {:?}", other),
    }
}

#[test]
fn test_generation_is_deterministic() {
    let first = generate_dir(&fixture("web"), &Config::new()).unwrap();
    let second = generate_dir(&fixture("web"), &Config::new()).unwrap();
    let a: Vec<&str> = first.files.iter().map(|f| f.contents.as_str()).collect();
    let b: Vec<&str> = second.files.iter().map(|f| f.contents.as_str()).collect();
    assert_eq!(a, b);
}
