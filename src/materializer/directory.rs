//! Resolution of directory-tree handles to volume paths
//!
//! A tree handle carries `<volume-id>:<document path>`. The volume id is
//! either `primary` or a volume UUID; the physical root comes from the
//! [`VolumeCatalog`]. No bytes are materialized for directories.

use super::query_display_name;
use crate::handle::{ContentHandle, DocumentId};
use crate::platform::{ContentProvider, StorageVolume, VolumeCatalog};
use crate::resolver::authority::{DOWNLOADS_AUTHORITY, PRIMARY_VOLUME, RAW_PREFIX};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Tree id the downloads provider uses for its root
const DOWNLOADS_TREE: &str = "downloads";

/// Resolves directory-tree handles
pub struct DirectoryResolver {
    provider: Arc<dyn ContentProvider>,
    volumes: Arc<dyn VolumeCatalog>,
    scoped_storage: bool,
}

impl DirectoryResolver {
    pub fn new(
        provider: Arc<dyn ContentProvider>,
        volumes: Arc<dyn VolumeCatalog>,
        scoped_storage: bool,
    ) -> Self {
        Self {
            provider,
            volumes,
            scoped_storage,
        }
    }

    /// The directory behind a tree handle, or `None`
    #[must_use]
    pub fn resolve(&self, handle: &ContentHandle) -> Option<PathBuf> {
        if let Some(path) = handle.file_path() {
            return Some(path);
        }

        let tree_id = handle.tree_document_id().or_else(|| handle.document_id())?;

        if !self.scoped_storage && handle.authority() == DOWNLOADS_AUTHORITY {
            return self.legacy_downloads(handle, &tree_id);
        }

        let volume_root = self.volume_root(tree_id.kind())?;
        let document_path = tree_id.rest().unwrap_or_default();
        Some(join_normalized(&volume_root.to_string_lossy(), document_path))
    }

    fn legacy_downloads(&self, handle: &ContentHandle, tree_id: &DocumentId) -> Option<PathBuf> {
        let downloads = self.volumes.downloads_dir()?;

        if tree_id.as_str() == DOWNLOADS_TREE {
            return Some(downloads);
        }
        if matches!(tree_id.kind(), "msf" | "msd") {
            let name = query_display_name(self.provider.as_ref(), handle)
                .or_else(|| handle.last_path_segment())?;
            return Some(downloads.join(name));
        }
        if tree_id.kind() == RAW_PREFIX {
            return tree_id.rest().filter(|r| !r.is_empty()).map(PathBuf::from);
        }

        debug!(id = %tree_id, "unrecognized downloads tree id");
        None
    }

    fn volume_root(&self, volume_id: &str) -> Option<PathBuf> {
        let volumes = match self.volumes.volumes() {
            Ok(volumes) => volumes,
            Err(e) => {
                debug!(error = %e, "volume enumeration failed");
                return None;
            }
        };

        let wanted = |volume: &StorageVolume| {
            if volume_id.eq_ignore_ascii_case(PRIMARY_VOLUME) {
                volume.primary
            } else {
                volume
                    .uuid
                    .as_deref()
                    .is_some_and(|uuid| uuid.eq_ignore_ascii_case(volume_id))
            }
        };

        let found = volumes.into_iter().find(wanted).map(|v| v.root);
        if found.is_none() {
            debug!(volume_id, "no mounted volume matches");
        }
        found
    }
}

/// Join a volume root and a document path, collapsing duplicate separators
fn join_normalized(root: &str, document_path: &str) -> PathBuf {
    let joined = format!("{root}/{document_path}");
    let mut normalized = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    PathBuf::from(normalized)
}
