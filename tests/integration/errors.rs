//! Integration tests for fatal build conditions.

use predicates::prelude::*;

use crate::common::TestProject;
use gadash_cli::test_utils::fixtures::TemplateFixture;

#[test]
fn test_missing_password_fails_before_any_work() {
    let project = TestProject::new();

    project
        .gadash_without_password()
        .arg("build")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("DASHBOARD_PASSWORD"));

    assert!(!project.artifact_path().exists());
    assert!(!project.path(".build_cache").exists());
}

#[test]
fn test_empty_password_is_missing() {
    let project = TestProject::new();

    project
        .gadash_without_password()
        .env("DASHBOARD_PASSWORD", "")
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing or empty"));
}

#[test]
fn test_no_workbook() {
    let project = TestProject::new();
    project.remove("input/cost_detail.xlsx");
    project.write("input/~$cost_detail.xlsx", "lock");

    project
        .gadash()
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No spreadsheet (.xlsx) found"));
    assert!(!project.artifact_path().exists());
}

#[test]
fn test_wrong_sheet_name() {
    let project = TestProject::new();
    project.write("gadash.toml", "sheet_name = \"Summary\"\n\n[crypto]\niterations = 100000\n");

    project
        .gadash()
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read source spreadsheet"))
        .stderr(predicate::str::contains("extract stage"));
}

#[test]
fn test_missing_timestamp_marker() {
    let project =
        TestProject::with_templates(TemplateFixture::standard().without_file("template/js/init.js"));

    project
        .gadash()
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<!-- DATA_TIMESTAMP -->"))
        .stderr(predicate::str::contains("embed stage"));
    assert!(!project.artifact_path().exists());
}

#[test]
fn test_duplicate_timestamp_marker() {
    let project = TestProject::new();
    project.write("template/js/state.js", "const stamp = '<!-- DATA_TIMESTAMP -->';");

    project
        .gadash()
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("appears 2 times"));
    assert!(!project.artifact_path().exists());
}

#[test]
fn test_failed_build_keeps_previous_artifact() {
    let project = TestProject::new();
    project.gadash().arg("build").assert().success();
    let previous = project.artifact();

    project.remove("template/js/init.js");
    project.gadash().arg("build").assert().failure();

    assert_eq!(project.artifact(), previous);
}

#[test]
fn test_low_iteration_count_rejected() {
    let project = TestProject::new();
    project.write("gadash.toml", "[crypto]\niterations = 1000\n");

    project
        .gadash()
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_unknown_config_key_rejected() {
    let project = TestProject::new();
    project.write("gadash.toml", "password = \"hunter2\"\n");

    project.gadash().arg("build").assert().failure().stderr(predicate::str::contains("gadash.toml"));
}
