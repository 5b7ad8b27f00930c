//! Persisted record shapes
//!
//! The record moves through three durable states:
//!
//! - **pending**: the request was dispatched to the picker
//! - **returned**: the picker answered with raw handles, resolution not finished
//! - **completed**: the outcome is known but was not delivered
//!
//! Values are stored with bincode; `PersistedItem` is the storable form of a
//! [`ResolvedItem`] (bytes are never persisted).

use super::error::CacheError;
use crate::handle::ContentHandle;
use crate::outcome::{ResolvedItem, SelectionOutcome};
use crate::request::SelectionRequest;
use bincode::{Decode, Encode};
use chrono::DateTime;
use std::fmt;
use std::path::PathBuf;

/// Durable state of the single slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Pending,
    Returned,
    Completed,
}

impl RecordState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Returned => "returned",
            Self::Completed => "completed",
        }
    }

    /// # Errors
    ///
    /// Returns `CacheError::CorruptRecord` for an unknown state name.
    pub fn parse(raw: &str) -> Result<Self, CacheError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "returned" => Ok(Self::Returned),
            "completed" => Ok(Self::Completed),
            other => Err(CacheError::CorruptRecord(format!("unknown state '{other}'"))),
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storable form of a resolved item
#[derive(Encode, Decode, Clone, Debug, PartialEq, Eq)]
pub struct PersistedItem {
    pub handle: String,
    pub local_path: Option<PathBuf>,
    pub display_name: String,
    pub size_bytes: u64,
    pub last_modified_millis: Option<i64>,
    pub is_directory: bool,
}

impl From<&ResolvedItem> for PersistedItem {
    fn from(item: &ResolvedItem) -> Self {
        Self {
            handle: item.handle.to_string(),
            local_path: item.local_path.clone(),
            display_name: item.display_name.clone(),
            size_bytes: item.size_bytes,
            last_modified_millis: item.last_modified.map(|t| t.timestamp_millis()),
            is_directory: item.is_directory,
        }
    }
}

impl TryFrom<PersistedItem> for ResolvedItem {
    type Error = CacheError;

    fn try_from(item: PersistedItem) -> Result<Self, Self::Error> {
        Ok(Self {
            handle: ContentHandle::parse(&item.handle)?,
            local_path: item.local_path,
            display_name: item.display_name,
            size_bytes: item.size_bytes,
            last_modified: item.last_modified_millis.and_then(DateTime::from_timestamp_millis),
            bytes: None,
            is_directory: item.is_directory,
        })
    }
}

/// Everything the cache holds for the slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistedState {
    Empty,
    /// Dispatched to the picker, no answer recorded
    Pending { request: SelectionRequest },
    /// The picker answered; resolution did not finish
    Returned {
        request: SelectionRequest,
        handles: Vec<ContentHandle>,
    },
    /// An undelivered outcome
    Completed {
        request: SelectionRequest,
        outcome: SelectionOutcome,
    },
}
