//! Atomic file writes using a temp-and-rename strategy.
//!
//! Both the cache entry and the dashboard artifact go through [`atomic_write`], so
//! an interrupted build never leaves a truncated file behind.

use crate::utils::fs::dirs::ensure_dir;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Path of the staging file used while `path` is being written.
///
/// The staging file sits next to the target so the final rename never crosses
/// a filesystem boundary.
#[must_use]
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Atomically writes bytes to a file.
///
/// 1. Writes content to a staging file beside the target (see [`staging_path`])
/// 2. Syncs the staging file to disk
/// 3. Renames it over the target
///
/// Parent directories are created as needed. On failure the staging file is
/// removed and any previous file at `path` is left untouched.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or any step of the
/// write or rename fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent)?;
    }

    let temp_path = staging_path(path);

    let written = (|| -> Result<()> {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        file.sync_all().with_context(|| "Failed to sync file to disk")?;

        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;
        Ok(())
    })();

    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written
}
