//! Materialization errors

use crate::platform::ProviderError;
use std::io;
use thiserror::Error;

/// Errors raised while turning a handle into a local artifact
///
/// Each one is terminal for its item and reported as `io_failure`.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// The handle could not be opened for reading
    #[error("Failed to open {handle}: {source}")]
    Open {
        handle: String,
        #[source]
        source: ProviderError,
    },

    /// Copying into the cache failed; the cache entry may be partial
    #[error("Failed to copy into {path}: {source}")]
    Copy {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A local artifact exists in name only
    #[error("Failed to read metadata of {path}: {source}")]
    Stat {
        path: String,
        #[source]
        source: io::Error,
    },
}
