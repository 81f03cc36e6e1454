//! Content-addressed build cache for the extraction stage.
//!
//! Extraction is the slow part of a build. The cache keeps the canonical text of
//! the most recent transform keyed by the SHA-256 of the source workbook bytes, so
//! an unchanged workbook skips extraction entirely.
//!
//! # Layout
//!
//! ```text
//! .build_cache/
//! └── transform.json   # { format, source_hash, rules_fingerprint, record_count, canonical_text }
//! ```
//!
//! Only one entry is kept. Writing a new entry replaces the old one atomically
//! (see [`crate::utils::fs::atomic_write`]), so a reader sees either the previous
//! entry or the new one.
//!
//! # Failure policy
//!
//! The cache is an optimization. Every failure degrades to a miss:
//! - no entry file: silent miss
//! - unreadable or unparseable entry: warning naming the file, then a miss
//! - entry for a different workbook or different derivation rules: miss
//! - failure to store: warning, the build continues
//!
//! Concurrent builds sharing one cache directory are not coordinated; the last
//! writer wins.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::GadashError;
use crate::extract::CanonicalTable;
use crate::utils::fs::{atomic_write, remove_dir_all};

/// File name of the single cache entry inside the cache directory.
pub const ENTRY_FILE_NAME: &str = "transform.json";

/// On-disk format revision; entries with another revision are ignored.
const ENTRY_FORMAT: u32 = 1;

/// A stored transform result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// On-disk format revision
    pub format: u32,
    /// `sha256:<hex>` digest of the source workbook bytes
    pub source_hash: String,
    /// Fingerprint of the derivation rules the transform used
    pub rules_fingerprint: String,
    /// Number of data records in `canonical_text`
    pub record_count: usize,
    /// Canonical delimited text
    pub canonical_text: String,
}

impl CacheEntry {
    /// Build an entry for a fresh transform.
    #[must_use]
    pub fn new(source_hash: String, rules_fingerprint: String, table: &CanonicalTable) -> Self {
        Self {
            format: ENTRY_FORMAT,
            source_hash,
            rules_fingerprint,
            record_count: table.record_count,
            canonical_text: table.text.clone(),
        }
    }

    /// The cached transform output.
    #[must_use]
    pub fn into_table(self) -> CanonicalTable {
        CanonicalTable {
            text: self.canonical_text,
            record_count: self.record_count,
        }
    }
}

/// Summary of the cache state for `gadash cache info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInfo {
    /// Cache directory
    pub dir: PathBuf,
    /// Entry metadata when a readable entry exists
    pub entry: Option<CacheEntrySummary>,
    /// Size of the entry file in bytes (0 when absent)
    pub size_bytes: u64,
}

/// Metadata of a stored entry, without its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntrySummary {
    /// Source workbook digest
    pub source_hash: String,
    /// Number of cached records
    pub record_count: usize,
}

/// The build cache rooted at one directory.
#[derive(Debug, Clone)]
pub struct BuildCache {
    dir: PathBuf,
}

impl BuildCache {
    /// Cache rooted at `dir`. Nothing is created until the first store.
    #[must_use]
    pub fn with_dir(dir: PathBuf) -> Self {
        Self {
            dir,
        }
    }

    /// The cache directory.
    #[must_use]
    pub fn cache_location(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry file.
    #[must_use]
    pub fn entry_path(&self) -> PathBuf {
        self.dir.join(ENTRY_FILE_NAME)
    }

    /// Look up the cached transform for a workbook digest and rules fingerprint.
    ///
    /// Returns `None` on any kind of miss; see the module docs for which misses
    /// are reported.
    #[must_use]
    pub fn lookup(&self, source_hash: &str, rules_fingerprint: &str) -> Option<CanonicalTable> {
        let entry = match self.read_entry() {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                tracing::debug!("No cache entry at {}", self.entry_path().display());
                return None;
            }
            Err(e) => {
                tracing::warn!("{e}; ignoring cached data");
                return None;
            }
        };

        if entry.format != ENTRY_FORMAT {
            tracing::debug!("Cache entry has format {}, expected {}", entry.format, ENTRY_FORMAT);
            return None;
        }
        if entry.source_hash != source_hash {
            tracing::debug!("Cache entry is for {}, source is {}", entry.source_hash, source_hash);
            return None;
        }
        if entry.rules_fingerprint != rules_fingerprint {
            tracing::debug!("Cache entry was built with different derivation rules");
            return None;
        }

        Some(entry.into_table())
    }

    /// Store a transform result, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be serialized or written.
    pub fn store(&self, entry: &CacheEntry) -> Result<()> {
        let json = serde_json::to_vec(entry).context("Failed to serialize cache entry")?;
        atomic_write(&self.entry_path(), &json)
            .with_context(|| format!("Failed to write cache entry to {}", self.dir.display()))
    }

    /// Remove the cache directory and everything in it.
    ///
    /// Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn clear(&self) -> Result<bool> {
        let existed = self.dir.exists();
        remove_dir_all(&self.dir).with_context(|| "Failed to clear build cache")?;
        Ok(existed)
    }

    /// Describe the current cache contents.
    #[must_use]
    pub fn info(&self) -> CacheInfo {
        let size_bytes = fs::metadata(self.entry_path()).map(|m| m.len()).unwrap_or(0);
        let entry = self.read_entry().ok().flatten().map(|entry| CacheEntrySummary {
            source_hash: entry.source_hash,
            record_count: entry.record_count,
        });

        CacheInfo {
            dir: self.dir.clone(),
            entry,
            size_bytes,
        }
    }

    fn read_entry(&self) -> Result<Option<CacheEntry>, GadashError> {
        let path = self.entry_path();
        let corruption = |reason: String| GadashError::CacheCorruption {
            path: path.display().to_string(),
            reason,
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(corruption(e.to_string())),
        };

        serde_json::from_str(&content).map(Some).map_err(|e| corruption(e.to_string()))
    }
}
