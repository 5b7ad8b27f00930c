//! Selection requests
//!
//! A [`SelectionRequest`] is created when the caller asks for content and is
//! consumed exactly once by the coordinator. Its type filter is either a MIME
//! pattern (`image/*`), a comma-separated list of MIME types or extensions
//! (`pdf,docx`), or the `dir` marker for directory requests.

use crate::PickrError;
use std::fmt;

/// Filter string persisted for directory requests
pub const DIRECTORY_FILTER: &str = "dir";
/// Filter string matching every type
pub const ANY_FILTER: &str = "*/*";

/// What the caller wants back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    /// One file
    File,
    /// One or more files
    Files,
    /// A directory, resolved to a single path
    Directory,
}

/// Type filter handed to the picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFilter {
    /// `*/*`
    Any,
    /// A single MIME pattern such as `image/*`
    Mime(String),
    /// Several MIME types or extensions, order preserved
    List(Vec<String>),
    /// Directory selection
    Directory,
}

impl TypeFilter {
    /// Parse the persisted/wire form of a filter
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "" | ANY_FILTER => Self::Any,
            DIRECTORY_FILTER => Self::Directory,
            _ if raw.contains(',') => Self::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            _ => Self::Mime(raw.to_string()),
        }
    }

    /// The individual MIME types or extensions the picker should offer
    #[must_use]
    pub fn mime_types(&self) -> Vec<String> {
        match self {
            Self::Any => vec![ANY_FILTER.to_string()],
            Self::Mime(mime) => vec![mime.clone()],
            Self::List(items) => items.clone(),
            Self::Directory => Vec::new(),
        }
    }
}

impl fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str(ANY_FILTER),
            Self::Mime(mime) => f.write_str(mime),
            // A trailing comma keeps a one-item list from reading back as a MIME pattern
            Self::List(items) if items.len() == 1 => write!(f, "{},", items[0]),
            Self::List(items) => f.write_str(&items.join(",")),
            Self::Directory => f.write_str(DIRECTORY_FILTER),
        }
    }
}

/// Named presets a caller can pick from instead of writing a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FileType {
    Any,
    Audio,
    Image,
    Video,
    Media,
    Custom,
    Dir,
}

impl FileType {
    /// Map the preset to a filter
    ///
    /// # Errors
    ///
    /// Returns `PickrError::InvalidInput` for `Custom` without extensions.
    pub fn to_filter(self, extensions: &[String]) -> Result<TypeFilter, PickrError> {
        let filter = match self {
            Self::Any => TypeFilter::Any,
            Self::Audio => TypeFilter::Mime("audio/*".into()),
            Self::Image => TypeFilter::Mime("image/*".into()),
            Self::Video => TypeFilter::Mime("video/*".into()),
            Self::Media => TypeFilter::List(vec!["image/*".into(), "video/*".into()]),
            Self::Dir => TypeFilter::Directory,
            Self::Custom => {
                let cleaned: Vec<String> = extensions
                    .iter()
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect();
                if cleaned.is_empty() || cleaned.iter().any(|e| e.starts_with('.')) {
                    return Err(PickrError::InvalidInput(
                        "Unsupported filter. Ensure using extension without dot (e.g., jpg, not .jpg).".into(),
                    ));
                }
                TypeFilter::List(cleaned)
            }
        };
        Ok(filter)
    }
}

/// A single selection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRequest {
    pub kind: SelectionKind,
    pub type_filter: TypeFilter,
    pub multiple: bool,
    /// Attach the picked bytes to each resolved item
    pub with_data: bool,
}

impl SelectionRequest {
    /// Request one file
    #[must_use]
    pub const fn file(type_filter: TypeFilter) -> Self {
        Self {
            kind: SelectionKind::File,
            type_filter,
            multiple: false,
            with_data: false,
        }
    }

    /// Request one or more files
    #[must_use]
    pub const fn files(type_filter: TypeFilter) -> Self {
        Self {
            kind: SelectionKind::Files,
            type_filter,
            multiple: true,
            with_data: false,
        }
    }

    /// Request a directory
    #[must_use]
    pub const fn directory() -> Self {
        Self {
            kind: SelectionKind::Directory,
            type_filter: TypeFilter::Directory,
            multiple: false,
            with_data: false,
        }
    }

    #[must_use]
    pub fn with_data(mut self, with_data: bool) -> Self {
        self.with_data = with_data;
        self
    }

    /// Rebuild a request from its persisted `type`/`multiple` pair
    #[must_use]
    pub fn from_persisted(type_filter: &str, multiple: bool, with_data: bool) -> Self {
        let type_filter = TypeFilter::parse(type_filter);
        let kind = match (&type_filter, multiple) {
            (TypeFilter::Directory, _) => SelectionKind::Directory,
            (_, true) => SelectionKind::Files,
            (_, false) => SelectionKind::File,
        };
        Self {
            kind,
            type_filter,
            multiple: multiple && kind != SelectionKind::Directory,
            with_data,
        }
    }

    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind == SelectionKind::Directory
    }
}
