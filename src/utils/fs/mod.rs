//! File system helpers used by the build pipeline.
//!
//! - [`atomic`]: temp-and-rename writes for the cache entry and the artifact
//! - [`checksum`]: SHA-256 content hashing for cache keys
//! - [`dirs`]: directory creation and removal
//! - [`discovery`]: locating the source workbook
//! - [`parallel`]: bounded, order-preserving concurrent reads

pub mod atomic;
pub mod checksum;
pub mod dirs;
pub mod discovery;
pub mod parallel;

pub use atomic::{atomic_write, staging_path};
pub use checksum::content_checksum;
pub use dirs::{ensure_dir, remove_dir_all};
pub use discovery::find_files_with_extension;
pub use parallel::read_files_parallel;
