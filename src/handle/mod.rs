//! Content handles issued by the external picker
//!
//! A [`ContentHandle`] is an opaque `scheme://authority/path` identifier. The
//! picker owns it; this crate only reads it. Two schemes matter:
//!
//! - `file://` handles address the local filesystem directly
//! - `content://` handles are served by a provider named by the authority
//!
//! Structured document handles carry a [`DocumentId`] of the form
//! `<type>:<opaque-id>` in their path, either as `/document/<id>` or inside a
//! tree as `/tree/<tree-id>/document/<id>`. Path segments are stored
//! percent-encoded and decoded on access, so `primary%3ADownload%2Fsub`
//! reads back as `primary:Download/sub`.

pub mod error;

pub use error::HandleError;

use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// Scheme of handles that address the local filesystem
pub const FILE_SCHEME: &str = "file";
/// Scheme of provider-served handles
pub const CONTENT_SCHEME: &str = "content";

const DOCUMENT_SEGMENT: &str = "document";
const TREE_SEGMENT: &str = "tree";

/// Opaque, provider-issued identifier of a picked item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHandle {
    url: Url,
}

impl ContentHandle {
    /// Parse a handle from its string form
    ///
    /// # Errors
    ///
    /// Returns `HandleError` if the input is not a URL or if a `content://`
    /// handle has no authority.
    pub fn parse(input: &str) -> Result<Self, HandleError> {
        let url = Url::parse(input.trim()).map_err(|e| HandleError::malformed(input, e))?;

        if url.scheme() == CONTENT_SCHEME && url.host_str().is_none_or(str::is_empty) {
            return Err(HandleError::MissingAuthority(input.to_string()));
        }

        Ok(Self { url })
    }

    /// Build a `file://` handle for an absolute path
    ///
    /// # Errors
    ///
    /// Returns `HandleError::RelativePath` if the path is not absolute.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, HandleError> {
        let path = path.as_ref();
        Url::from_file_path(path)
            .map(|url| Self { url })
            .map_err(|()| HandleError::RelativePath(path.display().to_string()))
    }

    /// Build a `content://` handle from an authority and raw path segments
    ///
    /// Segments are percent-encoded, so they may contain `:` or `/`.
    ///
    /// # Errors
    ///
    /// Returns `HandleError` if the authority is not a valid URL host.
    pub fn content(authority: &str, segments: &[&str]) -> Result<Self, HandleError> {
        let base = format!("{CONTENT_SCHEME}://{authority}");
        let mut handle = Self::parse(&base)?;
        for segment in segments {
            handle = handle.with_appended_segment(segment)?;
        }
        Ok(handle)
    }

    /// Return a copy of this handle with one more path segment
    ///
    /// # Errors
    ///
    /// Returns `HandleError` if the handle cannot carry a hierarchical path.
    pub fn with_appended_segment(&self, segment: &str) -> Result<Self, HandleError> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|()| HandleError::malformed(self.url.as_str(), "handle has no hierarchical path"))?
            .pop_if_empty()
            .push(segment);
        Ok(Self { url })
    }

    /// Return a copy of this handle addressing row `id` below it
    ///
    /// # Errors
    ///
    /// Returns `HandleError` if the handle cannot carry a hierarchical path.
    pub fn with_appended_id(&self, id: u64) -> Result<Self, HandleError> {
        self.with_appended_segment(&id.to_string())
    }

    /// The handle in its string form
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// The provider namespace, empty for `file://` handles
    #[must_use]
    pub fn authority(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.scheme().eq_ignore_ascii_case(FILE_SCHEME)
    }

    #[must_use]
    pub fn is_content(&self) -> bool {
        self.scheme().eq_ignore_ascii_case(CONTENT_SCHEME)
    }

    /// Decoded path segments, empty segments dropped
    #[must_use]
    pub fn segments(&self) -> Vec<String> {
        self.url
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .map(decode_segment)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The decoded trailing path segment
    #[must_use]
    pub fn last_path_segment(&self) -> Option<String> {
        self.segments().pop()
    }

    /// The filesystem path of a `file://` handle
    #[must_use]
    pub fn file_path(&self) -> Option<PathBuf> {
        if !self.is_file() {
            return None;
        }
        self.url.to_file_path().ok()
    }

    /// The document id of a structured document handle
    #[must_use]
    pub fn document_id(&self) -> Option<DocumentId> {
        match self.segments().as_slice() {
            [kind, id] if kind == DOCUMENT_SEGMENT => Some(DocumentId::new(id)),
            [tree, _, kind, id] if tree == TREE_SEGMENT && kind == DOCUMENT_SEGMENT => {
                Some(DocumentId::new(id))
            }
            _ => None,
        }
    }

    /// The tree id of a handle returned by a directory picker
    #[must_use]
    pub fn tree_document_id(&self) -> Option<DocumentId> {
        match self.segments().as_slice() {
            [tree, id, ..] if tree == TREE_SEGMENT => Some(DocumentId::new(id)),
            _ => None,
        }
    }
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

impl fmt::Display for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentHandle {
    type Err = HandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ContentHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Structured id of a document handle: `<type>:<opaque-id>`
///
/// The type names a volume (`primary`, a volume UUID), a media space
/// (`image`, `video`, `audio`) or a marker such as `raw` or `msf`. Ids
/// without a colon (plain numeric download ids) have no rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the first colon, or the whole id
    #[must_use]
    pub fn kind(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(kind, _)| kind)
    }

    /// The part after the first colon
    #[must_use]
    pub fn rest(&self) -> Option<&str> {
        self.0.split_once(':').map(|(_, rest)| rest)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_handle() {
        let handle =
            ContentHandle::parse("content://com.android.providers.media.documents/document/image%3A42")
                .unwrap();
        assert_eq!(handle.scheme(), "content");
        assert_eq!(handle.authority(), "com.android.providers.media.documents");
        assert_eq!(handle.segments(), vec!["document", "image:42"]);
        assert_eq!(handle.document_id().unwrap().as_str(), "image:42");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            ContentHandle::parse("not a handle"),
            Err(HandleError::Malformed { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_content_without_authority() {
        assert!(ContentHandle::parse("content:///document/1").is_err());
    }

    #[test]
    fn test_file_handle_round_trips_path() {
        let handle = ContentHandle::parse("file:///tmp/some%20dir/report.pdf").unwrap();
        assert!(handle.is_file());
        assert_eq!(handle.file_path(), Some(PathBuf::from("/tmp/some dir/report.pdf")));
        assert_eq!(handle.last_path_segment().as_deref(), Some("report.pdf"));
    }

    #[test]
    fn test_from_path_requires_absolute() {
        assert!(ContentHandle::from_path("relative/file.txt").is_err());
        let handle = ContentHandle::from_path("/var/data/file.txt").unwrap();
        assert_eq!(handle.file_path(), Some(PathBuf::from("/var/data/file.txt")));
    }

    #[test]
    fn test_tree_handle_ids() {
        let handle = ContentHandle::parse(
            "content://com.android.externalstorage.documents/tree/primary%3ADownload%2Fsub",
        )
        .unwrap();
        let tree_id = handle.tree_document_id().unwrap();
        assert_eq!(tree_id.as_str(), "primary:Download/sub");
        assert_eq!(tree_id.kind(), "primary");
        assert_eq!(tree_id.rest(), Some("Download/sub"));
        assert!(handle.document_id().is_none());

        let doc = ContentHandle::parse(
            "content://com.android.externalstorage.documents/tree/primary%3ADownload/document/primary%3ADownload%2Fa.txt",
        )
        .unwrap();
        assert_eq!(doc.document_id().unwrap().as_str(), "primary:Download/a.txt");
        assert_eq!(doc.tree_document_id().unwrap().as_str(), "primary:Download");
    }

    #[test]
    fn test_content_builder_encodes_segments() {
        let handle = ContentHandle::content("downloads", &["public_downloads"]).unwrap();
        let row = handle.with_appended_id(17).unwrap();
        assert_eq!(row.as_str(), "content://downloads/public_downloads/17");

        let doc = ContentHandle::content("auth", &["document", "raw:/sdcard/a b.txt"]).unwrap();
        assert_eq!(doc.document_id().unwrap().as_str(), "raw:/sdcard/a b.txt");
    }

    #[test]
    fn test_document_id_without_colon() {
        let id = DocumentId::new("1234");
        assert_eq!(id.kind(), "1234");
        assert_eq!(id.rest(), None);

        let raw = DocumentId::new("raw:/storage/emulated/0/a:b.txt");
        assert_eq!(raw.kind(), "raw");
        assert_eq!(raw.rest(), Some("/storage/emulated/0/a:b.txt"));
    }
}
