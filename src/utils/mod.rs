//! Shared utilities.
//!
//! - [`fs`] - File system operations with atomic writes, hashing and bounded parallel reads

pub mod fs;

pub use fs::{atomic_write, ensure_dir};
