//! Build configuration and the encryption secret.
//!
//! Configuration comes from three places, later ones winning:
//!
//! 1. Built-in defaults (see [`crate::constants`])
//! 2. An optional `gadash.toml` in the project directory (or `--config <path>`)
//! 3. Command-line flags, applied by the CLI layer
//!
//! Relative paths in the file are resolved against the project directory.
//!
//! ```toml
//! input_dir = "input"
//! template_dir = "template"
//! lib_dir = "lib"
//! cache_dir = ".build_cache"
//! output_file = "outputs/Indirect G&A Dashboard.html"
//! sheet_name = "Cost Code Detail Report"
//! max_parallel = 16
//! timestamp_format = "%m/%d/%Y %I:%M %p UTC%:z"
//!
//! [crypto]
//! iterations = 200000
//!
//! [fragments]
//! scripts = ["config", "state", "utils", "crypto", "init"]
//!
//! [departments."999"]
//! name = "Special Projects"
//! category = "G&A"
//! ```
//!
//! # Secret
//!
//! The password is read from `DASHBOARD_PASSWORD` only. There is no default and no
//! configuration-file key for it; an absent or empty variable is a
//! [`GadashError::MissingPassword`] error raised before any work starts.

use anyhow::{Context, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::assemble::FragmentManifest;
use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_CACHE_DIR, DEFAULT_INPUT_DIR, DEFAULT_KDF_ITERATIONS,
    DEFAULT_LIB_DIR, DEFAULT_OUTPUT_FILE, DEFAULT_SHEET_NAME, DEFAULT_TEMPLATE_DIR,
    DEFAULT_TIMESTAMP_FORMAT, MIN_KDF_ITERATIONS, PASSWORD_ENV_VAR, default_max_parallel,
};
use crate::core::GadashError;
use crate::rules::{DerivationRules, Department};

/// Key derivation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CryptoConfig {
    /// PBKDF2 iteration count
    pub iterations: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_KDF_ITERATIONS,
        }
    }
}

/// Contents of `gadash.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Directory searched for the source workbook
    pub input_dir: PathBuf,
    /// Fragment root with `css/`, `html/` and `js/`
    pub template_dir: PathBuf,
    /// Directory of pre-fetched third-party scripts
    pub lib_dir: PathBuf,
    /// Build cache directory
    pub cache_dir: PathBuf,
    /// Artifact path
    pub output_file: PathBuf,
    /// Sheet holding the cost detail rows
    pub sheet_name: String,
    /// Upper bound on concurrent fragment reads
    pub max_parallel: usize,
    /// `strftime` pattern for the build timestamp
    pub timestamp_format: String,
    /// Key derivation settings
    pub crypto: CryptoConfig,
    /// Fragment load order
    pub fragments: FragmentManifest,
    /// Additional or replacement department entries, keyed by 3-digit code
    pub departments: BTreeMap<String, Department>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            template_dir: PathBuf::from(DEFAULT_TEMPLATE_DIR),
            lib_dir: PathBuf::from(DEFAULT_LIB_DIR),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            max_parallel: default_max_parallel(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            crypto: CryptoConfig::default(),
            fragments: FragmentManifest::default(),
            departments: BTreeMap::new(),
        }
    }
}

impl BuildConfig {
    /// Load configuration for a project.
    ///
    /// With `explicit = Some(path)` the file must exist. Otherwise
    /// `<project_dir>/gadash.toml` is used when present and defaults apply when it
    /// is not. Relative paths are resolved against `project_dir` and the result
    /// is validated.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or fails
    /// [`validate`](Self::validate).
    pub async fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default = project_dir.join(CONFIG_FILE_NAME);
                default.exists().then_some(default)
            }
        };

        let config = match path {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::load_from(&path).await?
            }
            None => Self::default(),
        };

        let config = config.resolved(project_dir);
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file without resolving or validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for this
    /// structure.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .map_err(GadashError::from)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Return a copy with every relative path joined onto `project_dir`.
    #[must_use]
    pub fn resolved(mut self, project_dir: &Path) -> Self {
        for path in [
            &mut self.input_dir,
            &mut self.template_dir,
            &mut self.lib_dir,
            &mut self.cache_dir,
            &mut self.output_file,
        ] {
            if path.is_relative() {
                *path = project_dir.join(&*path);
            }
        }
        self
    }

    /// Check invariants the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns [`GadashError::ConfigError`] describing the first violation.
    pub fn validate(&self) -> Result<(), GadashError> {
        let invalid = |message: String| GadashError::ConfigError {
            message,
        };

        if self.crypto.iterations < MIN_KDF_ITERATIONS {
            return Err(invalid(format!(
                "crypto.iterations = {} is below the minimum of {MIN_KDF_ITERATIONS}",
                self.crypto.iterations
            )));
        }
        if self.max_parallel == 0 {
            return Err(invalid("max_parallel must be at least 1".to_string()));
        }
        if self.sheet_name.trim().is_empty() {
            return Err(invalid("sheet_name must not be empty".to_string()));
        }
        if StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(invalid(format!(
                "timestamp_format '{}' is not a valid strftime pattern",
                self.timestamp_format
            )));
        }
        if let Some(code) = self.departments.keys().find(|code| code.trim().is_empty()) {
            return Err(invalid(format!("department code '{code}' must not be empty")));
        }
        self.fragments.validate()
    }

    /// Derivation rules with this configuration's department overrides applied.
    #[must_use]
    pub fn rules(&self) -> DerivationRules {
        DerivationRules::standard().with_departments(self.departments.clone())
    }
}

/// The dashboard password. `Debug` and `Display` never reveal it.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Read the password from [`PASSWORD_ENV_VAR`].
    ///
    /// # Errors
    ///
    /// Returns [`GadashError::MissingPassword`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self, GadashError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the password through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`GadashError::MissingPassword`] if the lookup yields nothing or an
    /// empty string.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GadashError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        match lookup(PASSWORD_ENV_VAR) {
            Some(value) if !value.is_empty() => Ok(Self(value)),
            _ => Err(GadashError::MissingPassword {
                variable: PASSWORD_ENV_VAR.to_string(),
            }),
        }
    }

    /// The secret text.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}
