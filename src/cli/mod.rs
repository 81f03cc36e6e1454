//! Command-line interface for gadash.
//!
//! # Commands
//!
//! - `build` - Extract, encrypt and embed the cost data into the dashboard artifact
//! - `cache` - Inspect or clear the extraction cache
//! - `verify` - Decrypt the payload embedded in a built artifact
//!
//! # Global Options
//!
//! - `--verbose` - Debug-level logging
//! - `--quiet` - Errors only, no summary output
//! - `--project-dir` - Project root (default: current directory)
//! - `--config` - Configuration file (default: `<project-dir>/gadash.toml`)
//!
//! Logs go to stderr; `RUST_LOG` takes precedence over the flags when set.
//!
//! ```bash
//! DASHBOARD_PASSWORD=... gadash build
//! gadash --verbose build --no-cache --output dist/dashboard.html
//! gadash cache info
//! DASHBOARD_PASSWORD=... gadash verify
//! ```

mod build;
mod cache;
mod verify;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::BuildConfig;

/// Settings derived from the global flags, shared by every command.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive, e.g. `"debug"`
    pub log_level: String,
    /// Suppress human-readable output
    pub quiet: bool,
    /// Project root
    pub project_dir: PathBuf,
    /// Explicit configuration file
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Install the global tracing subscriber (stderr). `RUST_LOG` wins over the
    /// configured level. Calling this twice is harmless.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Load and validate the project configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or is invalid.
    pub async fn load_build_config(&self) -> Result<BuildConfig> {
        BuildConfig::load(&self.project_dir, self.config_path.as_deref()).await
    }
}

#[derive(Parser)]
#[command(
    name = "gadash",
    about = "Build the encrypted Indirect G&A cost dashboard",
    version,
    long_about = "gadash turns the period's cost-code detail workbook into a single self-contained, \
                  password-protected HTML dashboard."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Project directory holding input/, template/, lib/ and gadash.toml
    #[arg(long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Path to a configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the dashboard artifact.
    ///
    /// Reads the source workbook (through the cache when it is unchanged),
    /// encrypts the dataset with DASHBOARD_PASSWORD, assembles the template
    /// fragments, inlines the chart libraries and writes a single HTML file.
    Build(build::BuildCommand),

    /// Inspect or clear the build cache.
    Cache(cache::CacheCommand),

    /// Check that a built artifact decrypts with DASHBOARD_PASSWORD.
    Verify(verify::VerifyCommand),
}

impl Cli {
    /// Execute the parsed command.
    ///
    /// # Errors
    ///
    /// Returns the command's error for [`crate::core::user_friendly_error`] to
    /// render.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };

        CliConfig {
            log_level: log_level.to_string(),
            quiet: self.quiet,
            project_dir: self.project_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
            config_path: self.config.clone(),
        }
    }

    /// Execute with an explicit [`CliConfig`].
    ///
    /// # Errors
    ///
    /// Returns the command's error.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Build(cmd) => cmd.execute(&config).await,
            Commands::Cache(cmd) => cmd.execute(&config).await,
            Commands::Verify(cmd) => cmd.execute(&config).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        let cli = Cli::parse_from(["gadash", "--verbose", "build"]);
        assert_eq!(cli.build_config().log_level, "debug");

        let cli = Cli::parse_from(["gadash", "build", "--quiet"]);
        let config = cli.build_config();
        assert_eq!(config.log_level, "error");
        assert!(config.quiet);

        let cli = Cli::parse_from(["gadash", "cache"]);
        assert_eq!(cli.build_config().log_level, "info");
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["gadash", "-v", "-q", "build"]).is_err());
    }

    #[test]
    fn test_project_dir_and_config() {
        let cli = Cli::parse_from([
            "gadash",
            "--project-dir",
            "/srv/dash",
            "verify",
            "--config",
            "/etc/gadash.toml",
        ]);
        let config = cli.build_config();
        assert_eq!(config.project_dir, PathBuf::from("/srv/dash"));
        assert_eq!(config.config_path, Some(PathBuf::from("/etc/gadash.toml")));

        let cli = Cli::parse_from(["gadash", "build"]);
        assert_eq!(cli.build_config().project_dir, PathBuf::from("."));
    }

    #[test]
    fn test_build_flags() {
        let cli = Cli::parse_from(["gadash", "build", "--no-cache", "--clear-cache", "-o", "x.html"]);
        let Commands::Build(cmd) = cli.command else {
            panic!("expected build");
        };
        assert!(cmd.no_cache);
        assert!(cmd.clear_cache);
        assert_eq!(cmd.output, Some(PathBuf::from("x.html")));
    }
}
