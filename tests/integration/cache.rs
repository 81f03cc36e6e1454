//! Integration tests for `gadash cache`.

use predicates::prelude::*;

use crate::common::TestProject;

#[test]
fn test_cache_info_and_clear() {
    let project = TestProject::new();

    project.gadash().args(["cache", "info"]).assert().success().stdout(predicate::str::contains("Empty"));

    project.gadash().arg("build").assert().success();

    project
        .gadash()
        .arg("cache")
        .assert()
        .success()
        .stdout(predicate::str::contains("sha256:"))
        .stdout(predicate::str::contains("Records:"));

    project
        .gadash()
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared"));
    assert!(!project.path(".build_cache").exists());

    project
        .gadash()
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already empty"));
}

#[test]
fn test_corrupt_cache_entry_is_rebuilt() {
    let project = TestProject::new();
    project.write(".build_cache/transform.json", "{ truncated");

    project
        .gadash()
        .args(["cache", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unreadable"));

    project
        .gadash()
        .arg("build")
        .assert()
        .success()
        .stderr(predicate::str::contains("Build cache entry is unreadable"))
        .stdout(predicate::str::contains("miss"));

    project.gadash().arg("build").assert().success().stdout(predicate::str::contains("hit"));
}

#[test]
fn test_cache_commands_need_no_password() {
    let project = TestProject::new();
    project.gadash_without_password().args(["cache", "info"]).assert().success();
}
