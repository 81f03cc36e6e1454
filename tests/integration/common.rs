//! Shared project scaffolding for the integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use gadash_cli::constants::PASSWORD_ENV_VAR;
use gadash_cli::crypto::decrypt;
use gadash_cli::embed::extract_payload;
use gadash_cli::test_utils::fixtures::{TemplateFixture, write_sample_workbook};

pub const PASSWORD: &str = "integration-secret";

/// Lowest accepted iteration count, so builds stay fast.
const CONFIG: &str = "[crypto]\niterations = 100000\n";

/// A scratch project directory with a complete set of inputs.
pub struct TestProject {
    _temp_dir: TempDir, // Keep alive for RAII cleanup
    root: PathBuf,
}

impl TestProject {
    /// Project with the sample workbook, the standard template tree and a
    /// `gadash.toml`.
    pub fn new() -> Self {
        Self::with_templates(TemplateFixture::standard())
    }

    /// Project with the sample workbook, the given template tree and a
    /// `gadash.toml`.
    pub fn with_templates(templates: TemplateFixture) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("project");
        fs::create_dir_all(&root).unwrap();

        write_sample_workbook(&root.join("input/cost_detail.xlsx"));
        templates.write_to(&root);
        fs::write(root.join("gadash.toml"), CONFIG).unwrap();

        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) {
        gadash_cli::test_utils::write_fragment(&self.root, relative, content);
    }

    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.path(relative)).unwrap();
    }

    /// Default artifact location.
    pub fn artifact_path(&self) -> PathBuf {
        self.path("outputs/Indirect G&A Dashboard.html")
    }

    pub fn artifact(&self) -> String {
        fs::read_to_string(self.artifact_path()).unwrap()
    }

    /// `gadash` in the project directory with the password set.
    pub fn gadash(&self) -> Command {
        let mut cmd = self.gadash_without_password();
        cmd.env(PASSWORD_ENV_VAR, PASSWORD);
        cmd
    }

    /// `gadash` in the project directory with no password in the environment.
    pub fn gadash_without_password(&self) -> Command {
        let mut cmd = Command::cargo_bin("gadash").unwrap();
        cmd.current_dir(&self.root)
            .env_remove(PASSWORD_ENV_VAR)
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }

    /// Decrypt the dataset embedded in the default artifact.
    pub fn decrypted_dataset(&self) -> String {
        let payload = extract_payload(&self.artifact(), "artifact").unwrap();
        decrypt(&payload, PASSWORD).unwrap()
    }
}
