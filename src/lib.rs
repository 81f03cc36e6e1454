//! gadash - Indirect G&A cost dashboard builder
//!
//! Turns the period's cost-code detail workbook into a single self-contained HTML
//! dashboard whose data is encrypted with a password. The artifact can be shared
//! as one file and opened offline; the browser decrypts the data after the viewer
//! enters the password.
//!
//! # Architecture Overview
//!
//! ```text
//! input/*.xlsx ──► extract ──► cache ──► crypto ─┐
//!                                                 ├─► embed ──► outputs/*.html
//! template/**  ──► assemble ──► inline ──────────┘
//! ```
//!
//! - The data path classifies every cost record with [`rules`], serializes the
//!   result as canonical delimited text and encrypts it (AES-256-GCM, PBKDF2).
//! - The document path concatenates template fragments in a declared order and
//!   replaces CDN script references with local copies.
//! - [`embed`] fills the two insertion points of the document, and [`build`]
//!   writes the artifact atomically.
//!
//! # Core Modules
//!
//! - [`build`] - Pipeline orchestration and the build report
//! - [`config`] - `gadash.toml` and the `DASHBOARD_PASSWORD` secret
//! - [`core`] - Error taxonomy and user-facing error rendering
//! - [`cli`] - Command-line interface
//!
//! ## Pipeline Stages
//! - [`extract`] - Workbook reading, header detection, canonical text
//! - [`rules`] - Cost-type and department classification tables
//! - [`cache`] - Content-addressed reuse of the extraction result
//! - [`assemble`] - Fragment loading, layout rendering, library inlining
//! - [`crypto`] - Payload encryption and decryption
//! - [`embed`] - Insertion-point substitution
//!
//! ## Supporting Modules
//! - [`constants`] - Defaults and wire identifiers
//! - [`utils`] - Atomic writes, hashing, discovery and bounded parallel reads

pub mod assemble;
pub mod build;
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod crypto;
pub mod embed;
pub mod extract;
pub mod rules;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
