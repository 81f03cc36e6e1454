//! Test utilities for gadash
//!
//! Helpers shared by unit tests and (through the `test-utils` feature) the
//! integration suite: logging setup, fragment writing and project fixtures.
//!
//! # Example
//!
//! ```rust,no_run
//! use gadash_cli::test_utils::{fixtures::TemplateFixture, init_test_logging};
//!
//! let temp = tempfile::tempdir().unwrap();
//! init_test_logging(None);
//! TemplateFixture::standard().write_to(temp.path());
//! ```

pub mod fixtures;

use std::fs;
use std::path::Path;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has any effect. With `level = None` logging is enabled
/// only when `RUST_LOG` is set.
///
/// ```bash
/// RUST_LOG=gadash_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Write `content` to `root/relative`, creating parent directories.
///
/// # Panics
///
/// Panics if the file cannot be written.
pub fn write_fragment(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("Failed to create {}: {e}", parent.display()));
    }
    fs::write(&path, content).unwrap_or_else(|e| panic!("Failed to write {}: {e}", path.display()));
}
