//! Password-based authenticated encryption of the dataset.
//!
//! A fresh 128-bit salt and 96-bit IV are drawn from the OS random source on every
//! call. The key is derived with PBKDF2-HMAC-SHA256 and the canonical text is
//! sealed with AES-256-GCM (no associated data). The resulting
//! [`EncryptedPayload`] is self-describing: the password is the only other input
//! needed to decrypt it.
//!
//! # Wire format
//!
//! ```json
//! {"v":1,"alg":"AES-256-GCM","kdf":"PBKDF2-SHA256","iter":200000,
//!  "salt":"<base64>","iv":"<base64>","ct":"<base64 ciphertext||tag>"}
//! ```
//!
//! These short names are what the in-page decryptor reads. Decoding also accepts
//! `version`, `cipher`, `iterations` and `ciphertext`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::constants::{
    CIPHER_ID, IV_LENGTH, KDF_ID, KEY_LENGTH, MIN_KDF_ITERATIONS, PAYLOAD_VERSION, SALT_LENGTH,
};
use crate::core::GadashError;

/// Self-describing encrypted dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Format version
    #[serde(rename = "v", alias = "version")]
    pub version: u32,
    /// Cipher identifier
    #[serde(rename = "alg", alias = "cipher")]
    pub cipher: String,
    /// Key derivation identifier
    pub kdf: String,
    /// PBKDF2 iteration count
    #[serde(rename = "iter", alias = "iterations")]
    pub iterations: u32,
    /// Base64 salt
    pub salt: String,
    /// Base64 nonce
    pub iv: String,
    /// Base64 ciphertext with the 16-byte tag appended
    #[serde(rename = "ct", alias = "ciphertext")]
    pub ciphertext: String,
}

impl EncryptedPayload {
    /// Serialize to compact JSON for embedding.
    ///
    /// # Errors
    ///
    /// Returns [`GadashError::Encryption`] if serialization fails.
    pub fn to_json(&self) -> Result<String, GadashError> {
        serde_json::to_string(self).map_err(|e| GadashError::Encryption {
            reason: format!("failed to serialize payload: {e}"),
        })
    }

    /// Parse a payload from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GadashError::Decryption`] if the JSON is malformed or lacks a field.
    pub fn from_json(json: &str) -> Result<Self, GadashError> {
        serde_json::from_str(json).map_err(|e| GadashError::Decryption {
            reason: format!("malformed payload: {e}"),
        })
    }
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

/// Encrypt `plaintext` under a key derived from `password`.
///
/// `iterations` below the accepted minimum is rejected so a misconfigured build
/// can never ship a weakly protected artifact.
///
/// # Errors
///
/// Returns [`GadashError::Encryption`] for an unacceptable iteration count or any
/// cipher failure.
///
/// # Examples
///
/// ```rust,no_run
/// use gadash_cli::crypto::{decrypt, encrypt};
///
/// # fn example() -> anyhow::Result<()> {
/// let payload = encrypt("a,b\n1,2\n", "p", 200_000)?;
/// assert_eq!(decrypt(&payload, "p")?, "a,b\n1,2\n");
/// # Ok(())
/// # }
/// ```
pub fn encrypt(
    plaintext: &str,
    password: &str,
    iterations: u32,
) -> Result<EncryptedPayload, GadashError> {
    encrypt_with_min_iterations(plaintext, password, iterations, MIN_KDF_ITERATIONS)
}

fn encrypt_with_min_iterations(
    plaintext: &str,
    password: &str,
    iterations: u32,
    min_iterations: u32,
) -> Result<EncryptedPayload, GadashError> {
    if iterations < min_iterations.max(1) {
        return Err(GadashError::Encryption {
            reason: format!("iteration count {iterations} is below the minimum {min_iterations}"),
        });
    }

    let mut salt = [0u8; SALT_LENGTH];
    let mut iv = [0u8; IV_LENGTH];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let key = derive_key(password, &salt, iterations);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| GadashError::Encryption {
        reason: format!("invalid key: {e}"),
    })?;

    let ciphertext = cipher.encrypt(Nonce::from_slice(&iv), plaintext.as_bytes()).map_err(|e| {
        GadashError::Encryption {
            reason: format!("cipher failure: {e}"),
        }
    })?;

    tracing::debug!(
        "Encrypted {} bytes ({} iterations, {} byte ciphertext)",
        plaintext.len(),
        iterations,
        ciphertext.len()
    );

    Ok(EncryptedPayload {
        version: PAYLOAD_VERSION,
        cipher: CIPHER_ID.to_string(),
        kdf: KDF_ID.to_string(),
        iterations,
        salt: BASE64.encode(salt),
        iv: BASE64.encode(iv),
        ciphertext: BASE64.encode(ciphertext),
    })
}

/// Decrypt a payload with `password`.
///
/// # Errors
///
/// Returns [`GadashError::Decryption`] if the payload names an unsupported format,
/// a field is not valid base64, or authentication fails (wrong password or
/// tampered data).
pub fn decrypt(payload: &EncryptedPayload, password: &str) -> Result<String, GadashError> {
    let fail = |reason: String| GadashError::Decryption {
        reason,
    };

    if payload.version != PAYLOAD_VERSION {
        return Err(fail(format!("unsupported payload version {}", payload.version)));
    }
    if payload.cipher != CIPHER_ID || payload.kdf != KDF_ID {
        return Err(fail(format!("unsupported algorithms {}/{}", payload.cipher, payload.kdf)));
    }
    if payload.iterations == 0 {
        return Err(fail("iteration count is zero".to_string()));
    }

    let decode = |field: &str, value: &str| {
        BASE64.decode(value).map_err(|e| fail(format!("field '{field}' is not valid base64: {e}")))
    };
    let salt = decode("salt", &payload.salt)?;
    let iv = decode("iv", &payload.iv)?;
    let ciphertext = decode("ct", &payload.ciphertext)?;

    if iv.len() != IV_LENGTH {
        return Err(fail(format!("iv must be {IV_LENGTH} bytes, got {}", iv.len())));
    }

    let key = derive_key(password, &salt, payload.iterations);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| fail(format!("invalid key: {e}")))?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
        .map_err(|_| fail("authentication failed (wrong password or corrupted data)".to_string()))?;

    String::from_utf8(plaintext).map_err(|e| fail(format!("plaintext is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_ITERATIONS: u32 = 1_000;

    fn seal(plaintext: &str, password: &str) -> EncryptedPayload {
        encrypt_with_min_iterations(plaintext, password, TEST_ITERATIONS, 1).unwrap()
    }

    #[test]
    fn test_round_trip() {
        for (text, password) in
            [("", "p"), ("a,b\n1,2\n", "correct horse"), ("ünïcødé,✓\n", "pässwörd")]
        {
            let payload = seal(text, password);
            assert_eq!(decrypt(&payload, password).unwrap(), text);
        }
    }

    #[test]
    fn test_same_plaintext_twice_differs_and_wrong_password_fails() {
        let plaintext = "a,b\n1,2\n";
        let first = seal(plaintext, "p");
        let second = seal(plaintext, "p");

        assert_ne!(first, second);
        assert_ne!(first.salt, second.salt);
        assert_ne!(first.iv, second.iv);
        assert_ne!(first.ciphertext, second.ciphertext);

        assert_eq!(decrypt(&first, "p").unwrap(), plaintext);
        assert_eq!(decrypt(&second, "p").unwrap(), plaintext);

        for wrong in ["q", "P", "p ", ""] {
            assert!(matches!(decrypt(&first, wrong), Err(GadashError::Decryption { .. })));
        }
    }

    #[test]
    fn test_tampering_is_detected() {
        let payload = seal("Document Type,Job\nJE,4021711\n", "p");
        let bytes = BASE64.decode(&payload.ciphertext).unwrap();

        // every byte of ciphertext and tag, one bit each
        for index in 0..bytes.len() {
            let mut tampered_bytes = bytes.clone();
            tampered_bytes[index] ^= 0x01;
            let tampered = EncryptedPayload {
                ciphertext: BASE64.encode(&tampered_bytes),
                ..payload.clone()
            };
            assert!(decrypt(&tampered, "p").is_err(), "bit flip at byte {index} was accepted");
        }

        let mut iv = BASE64.decode(&payload.iv).unwrap();
        iv[0] ^= 0x80;
        let tampered = EncryptedPayload {
            iv: BASE64.encode(&iv),
            ..payload
        };
        assert!(decrypt(&tampered, "p").is_err());
    }

    #[test]
    fn test_payload_parameters() {
        let payload = seal("x", "p");
        assert_eq!(payload.version, 1);
        assert_eq!(payload.cipher, "AES-256-GCM");
        assert_eq!(payload.kdf, "PBKDF2-SHA256");
        assert_eq!(BASE64.decode(&payload.salt).unwrap().len(), 16);
        assert_eq!(BASE64.decode(&payload.iv).unwrap().len(), 12);
        // one byte of plaintext plus a 16-byte tag
        assert_eq!(BASE64.decode(&payload.ciphertext).unwrap().len(), 17);
    }

    #[test]
    fn test_wire_names() {
        let json = seal("x", "p").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        for key in ["v", "alg", "kdf", "iter", "salt", "iv", "ct"] {
            assert!(keys.contains(&key), "missing key {key} in {json}");
        }
        assert_eq!(keys.len(), 7);
    }

    #[test]
    fn test_long_field_names_accepted() {
        let payload = seal("hello", "p");
        let json = serde_json::json!({
            "version": payload.version,
            "cipher": payload.cipher,
            "kdf": payload.kdf,
            "iterations": payload.iterations,
            "salt": payload.salt,
            "iv": payload.iv,
            "ciphertext": payload.ciphertext,
        })
        .to_string();

        let parsed = EncryptedPayload::from_json(&json).unwrap();
        assert_eq!(decrypt(&parsed, "p").unwrap(), "hello");
    }

    #[test]
    fn test_low_iteration_count_rejected() {
        let err = encrypt("x", "p", MIN_KDF_ITERATIONS - 1).unwrap_err();
        assert!(matches!(err, GadashError::Encryption { .. }));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let payload = EncryptedPayload {
            version: 2,
            ..seal("x", "p")
        };
        assert!(decrypt(&payload, "p").is_err());
    }
}
