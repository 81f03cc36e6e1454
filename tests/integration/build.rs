//! Integration tests for `gadash build`.

use predicates::prelude::*;

use crate::common::TestProject;
use gadash_cli::assemble::inline::KNOWN_LIBRARIES;
use gadash_cli::constants::{PAYLOAD_MARKER, TIMESTAMP_MARKER};
use gadash_cli::test_utils::fixtures::TemplateFixture;

#[test]
fn test_build_produces_self_contained_artifact() {
    let project = TestProject::new();

    project
        .gadash()
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dashboard built"))
        .stdout(predicate::str::contains("Records:").and(predicate::str::contains("4")))
        .stdout(predicate::str::contains("miss"));

    let artifact = project.artifact();
    assert!(artifact.starts_with("<!DOCTYPE html>"));
    assert!(artifact.contains("const encryptedPayload = {\"v\":1,\"alg\":\"AES-256-GCM\""));
    assert!(!artifact.contains(PAYLOAD_MARKER));
    assert!(!artifact.contains(TIMESTAMP_MARKER));
    for library in KNOWN_LIBRARIES {
        assert!(!artifact.contains(library.tag), "{} was not inlined", library.name);
        assert!(artifact.contains(&format!("/* {} stub */", library.name)));
    }

    let dataset = project.decrypted_dataset();
    let lines: Vec<&str> = dataset.lines().collect();
    assert_eq!(
        lines[0],
        "Document Type,Cost Type,Job,G/L Date,Amount,Category,Is_Allocation,Department,Dept_Category"
    );
    assert_eq!(lines.len(), 5);
    assert_eq!(
        lines[1],
        "JE,611000 - Regular Time,4021110,2025-01-15,1250.5,Labor Costs,false,110 - Exec,G&A"
    );
    // job and G/L date stored as number and date cells in the workbook
    assert_eq!(
        lines[2],
        "AP,641000 - Fuel,4021711,2025-01-16,310.25,Fleet & Materials,false,711 - Fuel,Equipment"
    );
    assert!(lines[3].contains("Allocation Credits,true,720 - Eqp Mech,Equipment"));
    assert!(lines[4].contains("Unknown (999),Other"));
}

#[test]
fn test_second_build_reuses_cache() {
    let project = TestProject::new();

    project.gadash().arg("build").assert().success().stdout(predicate::str::contains("miss"));
    let first = project.decrypted_dataset();
    let first_artifact = project.artifact();

    project.gadash().arg("build").assert().success().stdout(predicate::str::contains("hit"));
    let second = project.decrypted_dataset();

    assert_eq!(first, second);
    // fresh salt and IV on every build
    assert_ne!(first_artifact, project.artifact());
}

#[test]
fn test_changed_workbook_is_reextracted() {
    let project = TestProject::new();
    project.gadash().arg("build").assert().success();

    let workbook = project.path("input/cost_detail.xlsx");
    let mut bytes = std::fs::read(&workbook).unwrap();
    // any byte-level change must invalidate the cache, even one calamine ignores
    bytes.extend_from_slice(b"\0");
    std::fs::write(&workbook, bytes).unwrap();

    // the appended byte may make the file unreadable; either way it is not a hit
    project.gadash().arg("build").assert().stdout(predicate::str::contains("hit").not());
}

#[test]
fn test_no_cache_flag() {
    let project = TestProject::new();

    project
        .gadash()
        .args(["build", "--no-cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disabled"));

    assert!(!project.path(".build_cache").exists());
}

#[test]
fn test_clear_cache_flag() {
    let project = TestProject::new();
    project.gadash().arg("build").assert().success();

    project
        .gadash()
        .args(["build", "--clear-cache"])
        .assert()
        .success()
        .stdout(predicate::str::contains("miss"));
}

#[test]
fn test_output_override() {
    let project = TestProject::new();

    project.gadash().args(["build", "--output", "dist/dashboard.html"]).assert().success();

    assert!(project.path("dist/dashboard.html").exists());
    assert!(!project.artifact_path().exists());
}

#[test]
fn test_quiet_build_prints_nothing() {
    let project = TestProject::new();

    project.gadash().args(["--quiet", "build"]).assert().success().stdout("");
    assert!(project.artifact_path().exists());
}

#[test]
fn test_project_dir_flag() {
    let project = TestProject::new();
    let elsewhere = tempfile::TempDir::new().unwrap();

    project
        .gadash()
        .current_dir(elsewhere.path())
        .arg("--project-dir")
        .arg(project.root())
        .arg("build")
        .assert()
        .success();

    assert!(project.artifact_path().exists());
}

#[test]
fn test_missing_fragments_are_tolerated() {
    let project = TestProject::with_templates(
        TemplateFixture::standard().without_file("template/html/header.html"),
    );

    project
        .gadash()
        .arg("build")
        .assert()
        .success()
        .stderr(predicate::str::contains("Missing markup fragment 'header'"))
        .stdout(predicate::str::contains("template fragment(s) missing"));
}

#[test]
fn test_missing_library_keeps_network_reference() {
    let project =
        TestProject::with_templates(TemplateFixture::standard().without_file("lib/papaparse.min.js"));

    project
        .gadash()
        .arg("build")
        .assert()
        .success()
        .stderr(predicate::str::contains("papaparse.min.js not found"));

    let artifact = project.artifact();
    assert!(artifact.contains(KNOWN_LIBRARIES[1].tag));
    assert!(!artifact.contains(KNOWN_LIBRARIES[0].tag));
}
