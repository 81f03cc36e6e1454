//! Integration test suite for gadash
//!
//! End-to-end tests that run the compiled `gadash` binary against a scratch
//! project (fixture workbook, template tree, library stubs).
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **build**: Full builds, cache reuse, cache flags, output override
//! - **cache**: `gadash cache info` / `gadash cache clear`
//! - **errors**: Fatal conditions and their exit status and messages
//! - **verify**: Decrypting the payload of a built artifact

mod common;

mod build;
mod cache;
mod errors;
mod verify;
