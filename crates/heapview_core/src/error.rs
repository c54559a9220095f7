//! Error types for heapview_core operations.

use crate::token::ObjectToken;
use thiserror::Error;

/// Core error type for heapview_core operations.
#[derive(Error, Debug)]
pub enum ProfilerError {
    /// Token does not resolve to a live object.
    ///
    /// The object was collected, the token was mistyped, or its registry
    /// slot was purged by a collection pass.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectToken),

    /// Kind has no cohort in the most recent delta.
    #[error("kind not present in the last delta: {0}")]
    KindNotInDelta(String),

    /// Token string could not be parsed.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Panel request is missing a parameter or names an unknown action.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProfilerError {
    /// Returns true for the errors a caller recovers from by falling back to
    /// the overview page.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound(_) | Self::KindNotInDelta(_))
    }

    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ObjectNotFound(_) => {
                Some("The object is gone. Pick a fresh token from the overview or a type listing.")
            }
            Self::KindNotInDelta(_) => {
                Some("Run a leak capture first; only kinds that grew since the previous capture have cohorts.")
            }
            Self::InvalidToken(_) => Some("Tokens are the decimal numbers shown in listings."),
            Self::ConfigError(_) => Some("Check heapview.toml against the documented sections."),
            _ => None,
        }
    }
}

/// Failure raised by a summary formatter.
///
/// Never leaves the classifier: it is rendered into the summary text instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct FormatError(pub String);

impl FormatError {
    /// Creates a new formatting error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Convenience Result type for heapview_core operations.
pub type Result<T> = std::result::Result<T, ProfilerError>;
