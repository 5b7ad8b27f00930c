//! Tracing subscriber setup for the pickr binary
//!
//! Logs go to stderr so stdout stays clean for results. With a log
//! directory configured they go to a daily file instead, written through a
//! non-blocking appender whose guard must outlive the program.

use crate::PickrError;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "pickr.log";

/// Filter directives used when `RUST_LOG` is not set
#[must_use]
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose { "pickr=debug" } else { "pickr=info" }
}

/// Install the global subscriber
///
/// Returns the appender guard when logging to a file.
///
/// # Errors
///
/// Returns `PickrError::LoggingError` if a subscriber is already installed,
/// or an I/O error if the log directory cannot be created.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, PickrError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            builder
                .with_ansi(false)
                .with_writer(writer)
                .try_init()
                .map_err(|e| PickrError::LoggingError(e.to_string()))?;
            Ok(Some(guard))
        }
        None => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| PickrError::LoggingError(e.to_string()))?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives(false), "pickr=info");
        assert_eq!(default_directives(true), "pickr=debug");
    }

    #[test]
    fn test_directives_parse() {
        for verbose in [false, true] {
            assert!(EnvFilter::try_new(default_directives(verbose)).is_ok());
        }
    }
}
