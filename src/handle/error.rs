//! Content handle parsing errors

use thiserror::Error;

/// Errors produced while parsing or building a content handle
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// The input is not a valid `scheme://authority/path` handle
    #[error("Malformed content handle '{input}': {reason}")]
    Malformed { input: String, reason: String },

    /// A `content://` handle without an authority segment
    #[error("Content handle '{0}' has no authority")]
    MissingAuthority(String),

    /// A filesystem path that cannot be expressed as a `file://` handle
    #[error("Path is not absolute: {0}")]
    RelativePath(String),
}

impl HandleError {
    #[must_use]
    pub fn malformed(input: &str, reason: impl ToString) -> Self {
        Self::Malformed {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}
