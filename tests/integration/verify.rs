//! Integration tests for `gadash verify`.

use predicates::prelude::*;

use crate::common::TestProject;

#[test]
fn test_verify_built_artifact() {
    let project = TestProject::new();
    project.gadash().arg("build").assert().success();

    project
        .gadash()
        .arg("verify")
        .assert()
        .success()
        .stdout(predicate::str::contains("decrypts: 4 records"));
}

#[test]
fn test_verify_wrong_password() {
    let project = TestProject::new();
    project.gadash().arg("build").assert().success();

    project
        .gadash()
        .env("DASHBOARD_PASSWORD", "not-the-password")
        .arg("verify")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Decryption failed"));
}

#[test]
fn test_verify_tampered_ciphertext() {
    let project = TestProject::new();
    project.gadash().arg("build").assert().success();

    let mut artifact = project.artifact();
    let at = artifact.find("\"ct\":\"").unwrap() + "\"ct\":\"".len();
    let replacement = if artifact[at..].starts_with('A') { "B" } else { "A" };
    artifact.replace_range(at..at + 1, replacement);
    std::fs::write(project.artifact_path(), artifact).unwrap();

    project
        .gadash()
        .arg("verify")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Decryption failed"));
}

#[test]
fn test_verify_explicit_path_without_payload() {
    let project = TestProject::new();
    project.write("other.html", "<html><body></body></html>");

    project
        .gadash()
        .args(["verify", "other.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No encrypted payload found"));
}
