//! Capabilities provided by the hosting platform
//!
//! The coordinator never talks to an OS directly. Everything outside the
//! selection engine is reached through the traits in this module:
//!
//! ```text
//!   PermissionPrompt ── grant/deny ──┐
//!   PickerLauncher ─── picker result ─┼──> HostEvent ──> SelectionCoordinator
//!   ContentProvider <── open/query ───┤
//!   VolumeCatalog  <── volume roots ──┘
//! ```
//!
//! Prompt and picker answers are asynchronous: `request`/`launch` only start
//! the interaction, and the host later feeds the answer back as a
//! [`HostEvent`].
//!
//! Two implementations ship with the crate: [`local`] backs content handles
//! with directories on disk, and [`terminal`] asks the user on a terminal.

pub mod local;
pub mod terminal;

use crate::handle::ContentHandle;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Column holding a row's filesystem path
pub const DATA_COLUMN: &str = "_data";
/// Column holding a row's user-visible name
pub const DISPLAY_NAME_COLUMN: &str = "_display_name";
/// Column holding a row's size in bytes
pub const SIZE_COLUMN: &str = "_size";
/// Column holding a row's modification time, epoch milliseconds
pub const LAST_MODIFIED_COLUMN: &str = "last_modified";
/// Row id column used by media queries
pub const ID_COLUMN: &str = "_id";

/// Errors reported by platform capabilities
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No content behind the handle
    #[error("Content not found: {0}")]
    NotFound(String),

    /// The provider refused or failed a query
    #[error("Query failed: {0}")]
    Query(String),

    /// The capability does not serve this handle
    #[error("Unsupported handle: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Equality filter applied to a column query (`column = value`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

impl RowFilter {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Read side of the content-access subsystem
pub trait ContentProvider: Send + Sync {
    /// Open the handle's bytes for reading
    ///
    /// # Errors
    ///
    /// `ProviderError::NotFound` when nothing backs the handle.
    fn open_read(&self, handle: &ContentHandle) -> Result<Box<dyn Read + Send>, ProviderError>;

    /// Read a single column of the first row matching the handle
    ///
    /// `Ok(None)` means no row (or a null value).
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` when the query itself fails.
    fn query_column(
        &self,
        handle: &ContentHandle,
        column: &str,
        filter: Option<&RowFilter>,
    ) -> Result<Option<String>, ProviderError>;
}

/// A mounted storage volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageVolume {
    /// Filesystem UUID, absent for the primary volume on most devices
    pub uuid: Option<String>,
    pub primary: bool,
    pub root: PathBuf,
}

impl StorageVolume {
    pub fn primary(root: impl Into<PathBuf>) -> Self {
        Self {
            uuid: None,
            primary: true,
            root: root.into(),
        }
    }

    pub fn secondary(uuid: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            uuid: Some(uuid.into()),
            primary: false,
            root: root.into(),
        }
    }
}

/// Volume enumeration
pub trait VolumeCatalog: Send + Sync {
    /// All currently mounted volumes
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the volume list cannot be read.
    fn volumes(&self) -> Result<Vec<StorageVolume>, ProviderError>;

    /// Root of the primary volume
    fn primary_root(&self) -> Option<PathBuf> {
        self.volumes()
            .ok()?
            .into_iter()
            .find(|v| v.primary)
            .map(|v| v.root)
    }

    /// The public downloads directory
    fn downloads_dir(&self) -> Option<PathBuf> {
        self.primary_root().map(|root| root.join("Download"))
    }
}

/// Permission prompt
pub trait PermissionPrompt: Send {
    /// Whether the permission is already held
    fn is_granted(&self, permission: &str) -> bool;

    /// Start an asynchronous prompt
    ///
    /// The answer arrives later as [`HostEvent::Permission`].
    fn request(&mut self, permission: &str);
}

/// How the picker should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerAction {
    /// Document picker for openable files
    OpenDocument,
    /// Gallery-style image picker
    PickImage,
    /// Directory tree picker
    OpenDocumentTree,
}

/// Description of the picker to launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerIntent {
    pub action: PickerAction,
    pub mime_types: Vec<String>,
    pub allow_multiple: bool,
}

/// The launcher could not present a picker
#[derive(Debug, Error)]
#[error("No picker can handle the request: {0}")]
pub struct LaunchError(pub String);

/// External picker
pub trait PickerLauncher: Send {
    /// Present the picker
    ///
    /// The answer arrives later as [`HostEvent::Picker`].
    ///
    /// # Errors
    ///
    /// Returns `LaunchError` if no picker can handle the intent.
    fn launch(&mut self, intent: &PickerIntent) -> Result<(), LaunchError>;
}

/// Content returned by the picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickedContent {
    Single(ContentHandle),
    Multiple(Vec<ContentHandle>),
    /// The picker reported success without data
    Nothing,
}

impl PickedContent {
    /// All returned handles in order
    #[must_use]
    pub fn handles(&self) -> Vec<ContentHandle> {
        match self {
            Self::Single(handle) => vec![handle.clone()],
            Self::Multiple(handles) => handles.clone(),
            Self::Nothing => Vec::new(),
        }
    }
}

/// What the picker reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerResponse {
    Selected(PickedContent),
    Cancelled,
    /// A result code the picker contract does not define
    Unrecognized { result_code: i32 },
}

impl PickerResponse {
    #[must_use]
    pub const fn single(handle: ContentHandle) -> Self {
        Self::Selected(PickedContent::Single(handle))
    }

    #[must_use]
    pub const fn multiple(handles: Vec<ContentHandle>) -> Self {
        Self::Selected(PickedContent::Multiple(handles))
    }
}

/// Asynchronous answers delivered back into the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Permission { granted: bool },
    Picker(PickerResponse),
}

/// Receiver of picking status changes
pub trait StatusSink: Send + Sync {
    /// `true` once picked content is being resolved, `false` when done
    fn picking(&self, active: bool);
}

/// Bundle of platform capabilities handed to the coordinator
pub struct Platform {
    pub provider: Arc<dyn ContentProvider>,
    pub volumes: Arc<dyn VolumeCatalog>,
    pub permissions: Box<dyn PermissionPrompt>,
    pub launcher: Box<dyn PickerLauncher>,
    pub status: Option<Arc<dyn StatusSink>>,
}
