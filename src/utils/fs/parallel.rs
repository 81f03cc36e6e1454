//! Bounded parallel file reads.
//!
//! Fragment loading reads many small files. Each read runs on Tokio's blocking
//! pool, at most `max_parallel` at a time, and results come back in input order
//! so that assembly stays deterministic.
//!
//! # Examples
//!
//! ```rust,no_run
//! use gadash_cli::utils::fs::read_files_parallel;
//! use std::path::PathBuf;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let paths = vec![PathBuf::from("template/css/base.css"), PathBuf::from("template/css/kpi.css")];
//! for (path, content) in read_files_parallel(&paths, 8).await? {
//!     match content {
//!         Ok(text) => println!("{}: {} bytes", path.display(), text.len()),
//!         Err(e) => println!("{}: {e}", path.display()),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Reads many text files concurrently, preserving input order.
///
/// Per-file failures (missing file, invalid UTF-8) are returned alongside each
/// path so the caller decides whether they are fatal. At most `max_parallel`
/// reads are in flight at once; a value of zero is treated as one.
///
/// # Errors
///
/// Returns an error only if a blocking read task panics or is cancelled.
pub async fn read_files_parallel(
    paths: &[PathBuf],
    max_parallel: usize,
) -> Result<Vec<(PathBuf, io::Result<String>)>> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let results: Vec<_> = stream::iter(paths.iter().cloned())
        .map(|path| {
            tokio::task::spawn_blocking(move || {
                let content = fs::read_to_string(&path);
                (path, content)
            })
        })
        .buffered(max_parallel.max(1))
        .collect()
        .await;

    results
        .into_iter()
        .map(|joined| joined.context("Failed to join file read task"))
        .collect()
}
