//! Pickr - content selection with process-death recovery
//!
//! This library coordinates a single outstanding content selection at a
//! time: it gates the request on a permission, hands off to an external
//! picker, resolves the returned content handles to local files (directly or
//! by copying them into a cache), and persists enough state in an embedded
//! database to recover the result if the process dies while the picker is in
//! front.

use thiserror::Error;

pub mod cache;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod handle;
pub mod logging;
pub mod materializer;
pub mod outcome;
pub mod output;
pub mod permission;
pub mod platform;
pub mod request;
pub mod resolver;

#[cfg(test)]
pub mod testing;

/// Error enum, contains all failure states of the program
#[derive(Debug, Error)]
pub enum PickrError {
    /// Result cache error
    #[error("Cache error: {0}")]
    CacheError(#[from] cache::CacheError),
    /// Content handle error
    #[error("Handle error: {0}")]
    HandleError(#[from] handle::HandleError),
    /// Platform capability error
    #[error("Provider error: {0}")]
    ProviderError(#[from] platform::ProviderError),
    /// Copying picked content failed
    #[error("Materialize error: {0}")]
    MaterializeError(#[from] materializer::MaterializeError),
    /// Represents a configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ::config::ConfigError),
    /// Represents an I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A selection is already outstanding
    #[error("Selection already active")]
    AlreadyActive,
    /// The coordinator dropped the request without an outcome
    #[error("Selection was abandoned before an outcome was produced")]
    Disconnected,
    /// The tracing subscriber could not be installed
    #[error("Logging error: {0}")]
    LoggingError(String),
}
