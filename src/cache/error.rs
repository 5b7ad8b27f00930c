//! Result cache error types
//!
//! # Error Types
//!
//! - **`SledError`**: Errors from the underlying sled embedded database
//! - **`DecodeError`** / **`EncodeError`**: bincode failures on stored values
//! - **`CorruptRecord`**: A stored record whose keys contradict each other
//! - **`HandleError`**: A persisted handle that no longer parses

use crate::handle::HandleError;
use thiserror::Error;

/// Result cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// Represents a sled database error
    #[error("Database error: {0}")]
    SledError(#[from] sled::Error),

    /// Represents a bincode decoding error
    #[error("Error while decoding data: {0}")]
    DecodeError(#[from] bincode::error::DecodeError),

    /// Represents a bincode encoding error
    #[error("Error while encoding data: {0}")]
    EncodeError(#[from] bincode::error::EncodeError),

    /// The stored record is inconsistent
    #[error("Corrupt persisted record: {0}")]
    CorruptRecord(String),

    /// A persisted handle failed to parse
    #[error("Invalid persisted handle: {0}")]
    HandleError(#[from] HandleError),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
