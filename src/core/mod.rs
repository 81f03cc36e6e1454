//! Core types shared by every stage of the build.
//!
//! Currently this is the error taxonomy and its user-facing rendering; see
//! [`error`] for which conditions are fatal and which are absorbed with a warning.

pub mod error;

pub use error::{ErrorContext, GadashError, user_friendly_error};
