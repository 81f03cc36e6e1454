//! Error handling for gadash
//!
//! This module provides the error taxonomy for the dashboard build pipeline and the
//! user-facing error reporting used by the CLI. The error system follows two rules:
//! 1. **Strongly-typed errors** so each pipeline stage can decide what is fatal
//! 2. **User-friendly messages** with actionable suggestions for whoever runs the build
//!
//! # Architecture
//!
//! - [`GadashError`] - Enumerated failure cases of the build
//! - [`ErrorContext`] - Wrapper that adds details and suggestions for display
//!
//! # Fatal vs. recoverable
//!
//! | Variant | Policy |
//! |---------|--------|
//! | [`GadashError::SourceNotFound`], [`GadashError::SourceRead`] | fatal |
//! | [`GadashError::CacheCorruption`] | logged, degrades to a full transform |
//! | [`GadashError::FragmentMissing`] | logged, degrades to empty content |
//! | [`GadashError::Encryption`] | fatal, no artifact is written |
//! | [`GadashError::MarkerNotFound`], [`GadashError::DuplicateMarker`] | fatal |
//! | [`GadashError::MissingPassword`], [`GadashError::ConfigError`] | fatal, before any work |
//!
//! Recoverable variants are still constructed so that the warning text is the same
//! wherever the condition is reported.
//!
//! # Examples
//!
//! ```rust,no_run
//! use gadash_cli::core::{GadashError, ErrorContext, user_friendly_error};
//!
//! let err = GadashError::MissingPassword {
//!     variable: "DASHBOARD_PASSWORD".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(err));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for gadash operations.
///
/// Each variant names one failure mode of the build pipeline and carries enough
/// context (paths, marker text, section names) to produce an actionable message.
#[derive(Error, Debug)]
pub enum GadashError {
    /// No usable spreadsheet was found in the input directory
    #[error("No spreadsheet (.xlsx) found in input directory: {dir}")]
    SourceNotFound {
        /// Directory that was searched
        dir: String,
    },

    /// The source spreadsheet could not be opened or lacks the expected sheet/columns
    #[error("Failed to read source spreadsheet {path}: {reason}")]
    SourceRead {
        /// Spreadsheet path
        path: String,
        /// What was wrong with it
        reason: String,
    },

    /// A stored cache entry could not be read or parsed
    #[error("Build cache entry is unreadable: {path}")]
    CacheCorruption {
        /// Cache file path
        path: String,
        /// Underlying read or parse failure
        reason: String,
    },

    /// A fragment listed in the manifest is absent on disk
    #[error("Missing {section} fragment '{name}': {path}")]
    FragmentMissing {
        /// Section the fragment belongs to (style, markup, script)
        section: String,
        /// Fragment name as listed in the manifest
        name: String,
        /// Resolved path that was probed
        path: String,
    },

    /// Key derivation or authenticated encryption failed
    #[error("Encryption failed: {reason}")]
    Encryption {
        /// Failure reported by the KDF or cipher
        reason: String,
    },

    /// A payload could not be decrypted (wrong password, tampering, bad encoding)
    #[error("Decryption failed: {reason}")]
    Decryption {
        /// Failure reported while decoding or decrypting
        reason: String,
    },

    /// A reserved insertion marker is absent from the document
    #[error("Insertion marker not found in document: {marker}")]
    MarkerNotFound {
        /// Marker text that was expected
        marker: String,
    },

    /// A reserved insertion marker appears more than once
    #[error("Insertion marker appears {count} times in document (expected once): {marker}")]
    DuplicateMarker {
        /// Marker text
        marker: String,
        /// Number of occurrences found
        count: usize,
    },

    /// A built artifact does not contain an embedded payload
    #[error("No encrypted payload found in artifact: {path}")]
    PayloadNotFound {
        /// Artifact path
        path: String,
    },

    /// The encryption password was not supplied
    #[error("Encryption password not set: {variable} is missing or empty")]
    MissingPassword {
        /// Environment variable that should carry the secret
        variable: String,
    },

    /// Configuration file or flag combination is invalid
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Catch-all
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl Clone for GadashError {
    fn clone(&self) -> Self {
        match self {
            Self::SourceNotFound {
                dir,
            } => Self::SourceNotFound {
                dir: dir.clone(),
            },
            Self::SourceRead {
                path,
                reason,
            } => Self::SourceRead {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::CacheCorruption {
                path,
                reason,
            } => Self::CacheCorruption {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::FragmentMissing {
                section,
                name,
                path,
            } => Self::FragmentMissing {
                section: section.clone(),
                name: name.clone(),
                path: path.clone(),
            },
            Self::Encryption {
                reason,
            } => Self::Encryption {
                reason: reason.clone(),
            },
            Self::Decryption {
                reason,
            } => Self::Decryption {
                reason: reason.clone(),
            },
            Self::MarkerNotFound {
                marker,
            } => Self::MarkerNotFound {
                marker: marker.clone(),
            },
            Self::DuplicateMarker {
                marker,
                count,
            } => Self::DuplicateMarker {
                marker: marker.clone(),
                count: *count,
            },
            Self::PayloadNotFound {
                path,
            } => Self::PayloadNotFound {
                path: path.clone(),
            },
            Self::MissingPassword {
                variable,
            } => Self::MissingPassword {
                variable: variable.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // io and toml errors are not Clone
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// When displayed, errors show:
/// 1. **error**: the main message in red
/// 2. **details**: additional context in yellow (optional)
/// 3. **suggestion**: what to do about it in green (optional)
///
/// # Examples
///
/// ```rust,no_run
/// use gadash_cli::core::{GadashError, ErrorContext};
///
/// let context = ErrorContext::new(GadashError::SourceNotFound {
///     dir: "input".to_string(),
/// })
/// .with_suggestion("Copy this period's extract into input/")
/// .with_details("Only .xlsx files directly under the input directory are considered");
///
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: GadashError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: GadashError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// The error chain is searched for a [`GadashError`]; when one is found it gets
/// tailored suggestions. The outermost message (which names the failing build
/// stage when the error came out of the pipeline) is kept in the details so the
/// operator can see where the build stopped.
///
/// # Examples
///
/// ```rust,no_run
/// use gadash_cli::core::user_friendly_error;
///
/// let error = anyhow::anyhow!("Something went wrong");
/// user_friendly_error(error).display();
/// ```
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let typed = error.chain().find_map(|cause| cause.downcast_ref::<GadashError>());

    if let Some(gadash_error) = typed {
        let mut ctx = create_error_context(gadash_error.clone());
        let outer = error.to_string();
        if outer != gadash_error.to_string() {
            ctx.details = Some(match ctx.details.take() {
                Some(details) => format!("{outer}. {details}"),
                None => outer,
            });
        }
        return ctx;
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(GadashError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion("Check ownership and permissions of the project, cache and output directories");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(GadashError::Other {
                    message: format!("File not found: {io_error}"),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(GadashError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in gadash.toml");
    }

    // Generic error - include the full chain
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(GadashError::Other {
        message,
    })
}

/// Attach suggestions and details to a specific [`GadashError`].
fn create_error_context(error: GadashError) -> ErrorContext {
    match &error {
        GadashError::SourceNotFound { dir } => ErrorContext::new(error.clone())
            .with_suggestion(format!("Place the period's cost extract (.xlsx) in {dir}"))
            .with_details("Office lock files (~$*.xlsx) are ignored; files in subdirectories are not searched"),

        GadashError::SourceRead { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Check that the workbook opens in a spreadsheet application and that the configured sheet_name matches")
            .with_details("The sheet needs a header row with Document Type, Cost Type, Job and G/L Date columns"),

        GadashError::MissingPassword { variable } => ErrorContext::new(error.clone())
            .with_suggestion(format!("Export {variable} before building, e.g. '{variable}=... gadash build'"))
            .with_details("The dashboard password has no built-in default and must be supplied for every build"),

        GadashError::Encryption { .. } => ErrorContext::new(error.clone())
            .with_details("No artifact was written: the dashboard is never produced without an encrypted payload"),

        GadashError::Decryption { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Check that DASHBOARD_PASSWORD matches the password used for the build")
            .with_details("Authenticated decryption fails on a wrong password or any modification of the payload"),

        GadashError::MarkerNotFound { marker } | GadashError::DuplicateMarker { marker, .. } => {
            ErrorContext::new(error.clone())
                .with_suggestion(format!(
                    "Make sure exactly one fragment contains {marker}"
                ))
                .with_details("The payload marker is emitted by the document layout; the timestamp marker lives in a script fragment")
        }

        GadashError::ConfigError { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Fix gadash.toml or the command-line flags and rerun"),

        GadashError::CacheCorruption { .. } => ErrorContext::new(error.clone())
            .with_suggestion("Run 'gadash cache clear' to discard the entry"),

        _ => ErrorContext::new(error.clone()),
    }
}
