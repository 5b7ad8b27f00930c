//! Resolved items and terminal selection outcomes

use crate::handle::ContentHandle;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

/// A picked item made usable by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedItem {
    pub handle: ContentHandle,
    /// Readable local path, direct or materialized
    pub local_path: Option<PathBuf>,
    pub display_name: String,
    pub size_bytes: u64,
    pub last_modified: Option<DateTime<Utc>>,
    /// Item bytes, present only when the request asked for them and they fit in memory
    #[serde(skip)]
    pub bytes: Option<Vec<u8>>,
    pub is_directory: bool,
}

/// Success payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Picked {
    Files(Vec<ResolvedItem>),
    Directory(PathBuf),
}

/// Stable error codes reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCode {
    AlreadyActive,
    PermissionDenied,
    UnknownActivity,
    UnresolvablePath,
    IoFailure,
    InvalidFormatType,
}

impl FailureCode {
    pub const ALL: [Self; 6] = [
        Self::AlreadyActive,
        Self::PermissionDenied,
        Self::UnknownActivity,
        Self::UnresolvablePath,
        Self::IoFailure,
        Self::InvalidFormatType,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyActive => "already_active",
            Self::PermissionDenied => "read_external_storage_denied",
            Self::UnknownActivity => "unknown_activity",
            Self::UnresolvablePath => "unknown_path",
            Self::IoFailure => "io_failure",
            Self::InvalidFormatType => "invalid_format_type",
        }
    }

    /// Parse a wire code back into its variant
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }
}

impl Serialize for FailureCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-level failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionFailure {
    pub code: FailureCode,
    pub message: String,
}

impl SelectionFailure {
    pub fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn permission_denied() -> Self {
        Self::new(FailureCode::PermissionDenied, "User did not allow reading external storage")
    }

    #[must_use]
    pub fn unknown_activity() -> Self {
        Self::new(FailureCode::UnknownActivity, "Unknown activity error, please fill an issue.")
    }

    #[must_use]
    pub fn unknown_path() -> Self {
        Self::new(FailureCode::UnresolvablePath, "Failed to retrieve path.")
    }

    #[must_use]
    pub fn unknown_directory() -> Self {
        Self::new(FailureCode::UnresolvablePath, "Failed to retrieve directory path.")
    }

    #[must_use]
    pub fn invalid_format_type() -> Self {
        Self::new(FailureCode::InvalidFormatType, "Can't handle the provided file type.")
    }
}

impl fmt::Display for SelectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Terminal result of one request, produced exactly once
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum SelectionOutcome {
    Success { picked: Picked },
    Cancelled,
    Failure { failure: SelectionFailure },
}

impl SelectionOutcome {
    #[must_use]
    pub const fn files(items: Vec<ResolvedItem>) -> Self {
        Self::Success {
            picked: Picked::Files(items),
        }
    }

    #[must_use]
    pub const fn directory(path: PathBuf) -> Self {
        Self::Success {
            picked: Picked::Directory(path),
        }
    }

    #[must_use]
    pub const fn failure(failure: SelectionFailure) -> Self {
        Self::Failure { failure }
    }

    #[must_use]
    pub const fn failure_code(&self) -> Option<FailureCode> {
        match self {
            Self::Failure { failure } => Some(failure.code),
            _ => None,
        }
    }

    /// Resolved items of a file selection
    #[must_use]
    pub fn items(&self) -> &[ResolvedItem] {
        match self {
            Self::Success {
                picked: Picked::Files(items),
            } => items,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_codes_round_trip() {
        for code in FailureCode::ALL {
            assert_eq!(FailureCode::from_code(code.as_str()), Some(code));
        }
        assert_eq!(FailureCode::from_code("nope"), None);
    }

    #[test]
    fn test_failure_display() {
        let failure = SelectionFailure::permission_denied();
        assert_eq!(
            failure.to_string(),
            "read_external_storage_denied: User did not allow reading external storage"
        );
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let json = serde_json::to_value(SelectionOutcome::Cancelled).unwrap();
        assert_eq!(json["outcome"], "cancelled");

        let json =
            serde_json::to_value(SelectionOutcome::failure(SelectionFailure::unknown_path())).unwrap();
        assert_eq!(json["failure"]["code"], "unknown_path");
    }

    #[test]
    fn test_items_of_non_file_outcome_is_empty() {
        assert!(SelectionOutcome::Cancelled.items().is_empty());
        assert!(SelectionOutcome::directory(PathBuf::from("/x")).items().is_empty());
    }
}
