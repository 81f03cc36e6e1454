//! SHA-256 content hashing.

use sha2::{Digest, Sha256};

/// Hashes bytes and returns the digest as `sha256:<hex>`.
#[must_use]
pub fn content_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}
