//! Payload embedding into the assembled document.
//!
//! The document carries two reserved insertion points, each of which must occur
//! exactly once:
//!
//! | [`InsertionPoint`] | Marker text | Replacement |
//! |--------------------|-------------|-------------|
//! | `Payload` | `<!-- EMBEDDED_ENCRYPTED_PAYLOAD_JSON -->` | `const encryptedPayload = {json};` |
//! | `Timestamp` | `<!-- DATA_TIMESTAMP -->` | the build timestamp |
//!
//! [`ArtifactBuilder`] validates every marker count against the unmodified document
//! before substituting anything, so a replacement value can never be mistaken for
//! a marker and a broken fragment set fails before any output is produced.

use regex::Regex;
use std::fmt;

use crate::constants::{PAYLOAD_MARKER, PAYLOAD_VARIABLE, TIMESTAMP_MARKER};
use crate::core::GadashError;
use crate::crypto::EncryptedPayload;

/// A named, single-use place in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertionPoint {
    /// Where the payload assignment goes
    Payload,
    /// Where the build timestamp goes
    Timestamp,
}

impl InsertionPoint {
    /// Every insertion point a complete artifact fills.
    pub const ALL: [InsertionPoint; 2] = [InsertionPoint::Payload, InsertionPoint::Timestamp];

    /// Literal marker text in the document.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            InsertionPoint::Payload => PAYLOAD_MARKER,
            InsertionPoint::Timestamp => TIMESTAMP_MARKER,
        }
    }
}

impl fmt::Display for InsertionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertionPoint::Payload => write!(f, "payload"),
            InsertionPoint::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// Check that `marker` occurs exactly once in `document`.
///
/// # Errors
///
/// [`GadashError::MarkerNotFound`] for zero occurrences,
/// [`GadashError::DuplicateMarker`] for more than one.
pub fn require_single(document: &str, marker: &str) -> Result<(), GadashError> {
    match document.matches(marker).count() {
        1 => Ok(()),
        0 => Err(GadashError::MarkerNotFound {
            marker: marker.to_string(),
        }),
        count => Err(GadashError::DuplicateMarker {
            marker: marker.to_string(),
            count,
        }),
    }
}

/// Fills the insertion points of a document.
///
/// ```rust,no_run
/// use gadash_cli::embed::{ArtifactBuilder, InsertionPoint};
///
/// # fn example(document: String) -> Result<(), gadash_cli::core::GadashError> {
/// let artifact = ArtifactBuilder::new(document)?
///     .fill(InsertionPoint::Payload, "const encryptedPayload = {};".to_string())
///     .fill(InsertionPoint::Timestamp, "01/15/2025 09:30 AM PST".to_string())
///     .finish()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ArtifactBuilder {
    document: String,
    values: Vec<(InsertionPoint, String)>,
}

impl ArtifactBuilder {
    /// Start from a document, validating that every insertion point occurs once.
    ///
    /// # Errors
    ///
    /// Returns the first marker-count violation found.
    pub fn new(document: String) -> Result<Self, GadashError> {
        for point in InsertionPoint::ALL {
            require_single(&document, point.marker())?;
        }
        Ok(Self {
            document,
            values: Vec::with_capacity(InsertionPoint::ALL.len()),
        })
    }

    /// Provide the value for an insertion point. A later value for the same point
    /// replaces an earlier one.
    #[must_use]
    pub fn fill(mut self, point: InsertionPoint, value: String) -> Self {
        self.values.retain(|(existing, _)| *existing != point);
        self.values.push((point, value));
        self
    }

    /// Produce the final document.
    ///
    /// # Errors
    ///
    /// Returns [`GadashError::Other`] naming an insertion point that was never filled.
    pub fn finish(self) -> Result<String, GadashError> {
        if let Some(missing) =
            InsertionPoint::ALL.iter().find(|point| !self.values.iter().any(|(p, _)| p == *point))
        {
            return Err(GadashError::Other {
                message: format!("no value supplied for the {missing} insertion point"),
            });
        }

        // Split on every marker first so inserted values are never rescanned.
        let mut output = self.document;
        let mut spans: Vec<(usize, &str, &str)> = self
            .values
            .iter()
            .filter_map(|(point, value)| {
                output.find(point.marker()).map(|at| (at, point.marker(), value.as_str()))
            })
            .collect();
        spans.sort_by_key(|(at, _, _)| std::cmp::Reverse(*at));
        for (at, marker, value) in spans {
            output.replace_range(at..at + marker.len(), value);
        }

        Ok(output)
    }
}

/// Script statement assigning the payload.
///
/// # Errors
///
/// Propagates payload serialization failure.
pub fn payload_assignment(payload: &EncryptedPayload) -> Result<String, GadashError> {
    Ok(format!("const {PAYLOAD_VARIABLE} = {};", payload.to_json()?))
}

/// Replace both markers, producing the final artifact text.
///
/// # Errors
///
/// Fails if either marker is absent or duplicated, or the payload cannot be
/// serialized.
pub fn embed(
    document: String,
    payload: &EncryptedPayload,
    timestamp: &str,
) -> Result<String, GadashError> {
    ArtifactBuilder::new(document)?
        .fill(InsertionPoint::Payload, payload_assignment(payload)?)
        .fill(InsertionPoint::Timestamp, timestamp.to_string())
        .finish()
}

/// Locate and parse the payload embedded in a built artifact.
///
/// # Errors
///
/// Returns [`GadashError::PayloadNotFound`] when no payload assignment exists and
/// [`GadashError::Decryption`] when it is not a valid payload record.
pub fn extract_payload(artifact: &str, origin: &str) -> Result<EncryptedPayload, GadashError> {
    let pattern = Regex::new(&format!(r"const\s+{PAYLOAD_VARIABLE}\s*=\s*(\{{[^;]*\}})\s*;"))
        .map_err(|e| GadashError::Other {
            message: format!("invalid payload pattern: {e}"),
        })?;
    let captures = pattern.captures(artifact).ok_or_else(|| GadashError::PayloadNotFound {
        path: origin.to_string(),
    })?;
    EncryptedPayload::from_json(&captures[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> EncryptedPayload {
        EncryptedPayload {
            version: 1,
            cipher: "AES-256-GCM".into(),
            kdf: "PBKDF2-SHA256".into(),
            iterations: 200_000,
            salt: "c2FsdA==".into(),
            iv: "aXY=".into(),
            ciphertext: "Y3Q=".into(),
        }
    }

    fn document() -> String {
        format!(
            "<script>\n    {PAYLOAD_MARKER}\nconst ts = '{TIMESTAMP_MARKER}';\n</script>"
        )
    }

    #[test]
    fn test_embed_replaces_both_markers() {
        let artifact = embed(document(), &payload(), "01/15/2025 09:30 AM PST").unwrap();

        assert!(!artifact.contains(PAYLOAD_MARKER));
        assert!(!artifact.contains(TIMESTAMP_MARKER));
        assert!(artifact.contains("const encryptedPayload = {\"v\":1,"));
        assert!(artifact.contains("const ts = '01/15/2025 09:30 AM PST';"));
    }

    #[test]
    fn test_missing_timestamp_marker() {
        let doc = format!("<script>{PAYLOAD_MARKER}</script>");
        let err = embed(doc, &payload(), "now").unwrap_err();
        assert!(matches!(err, GadashError::MarkerNotFound { marker } if marker == TIMESTAMP_MARKER));
    }

    #[test]
    fn test_missing_payload_marker() {
        let doc = format!("<script>{TIMESTAMP_MARKER}</script>");
        let err = embed(doc, &payload(), "now").unwrap_err();
        assert!(matches!(err, GadashError::MarkerNotFound { marker } if marker == PAYLOAD_MARKER));
    }

    #[test]
    fn test_duplicate_marker() {
        let doc = format!("{}{TIMESTAMP_MARKER}", document());
        let err = embed(doc, &payload(), "now").unwrap_err();
        assert!(matches!(err, GadashError::DuplicateMarker { count: 2, .. }));
    }

    #[test]
    fn test_value_containing_marker_text_is_not_rescanned() {
        let artifact = ArtifactBuilder::new(document())
            .unwrap()
            .fill(InsertionPoint::Payload, TIMESTAMP_MARKER.to_string())
            .fill(InsertionPoint::Timestamp, "T".to_string())
            .finish()
            .unwrap();
        assert_eq!(artifact.matches(TIMESTAMP_MARKER).count(), 1);
        assert!(artifact.contains("const ts = 'T';"));
    }

    #[test]
    fn test_unfilled_point_is_an_error() {
        let err = ArtifactBuilder::new(document())
            .unwrap()
            .fill(InsertionPoint::Payload, String::new())
            .finish()
            .unwrap_err();
        assert!(err.to_string().contains("timestamp"));
    }

    #[test]
    fn test_extract_payload_from_artifact() {
        let artifact = embed(document(), &payload(), "now").unwrap();
        assert_eq!(extract_payload(&artifact, "dashboard.html").unwrap(), payload());

        let err = extract_payload("<html></html>", "dashboard.html").unwrap_err();
        assert!(matches!(err, GadashError::PayloadNotFound { .. }));
    }
}
