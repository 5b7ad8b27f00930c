//! Direct path resolution for picked handles
//!
//! [`HandleResolver::resolve`] runs an ordered cascade over the handle's
//! [`HandleAuthority`]. The first matching branch decides; no branch fails
//! loudly. Query errors, missing rows and unknown layouts all degrade to
//! [`Resolution::Unresolvable`], which hands the item to the materializer.

pub mod authority;

pub use authority::{HandleAuthority, MediaSpace};

use crate::handle::{ContentHandle, DocumentId};
use crate::platform::{ContentProvider, DATA_COLUMN, ID_COLUMN, RowFilter, VolumeCatalog};
use authority::{DOWNLOAD_PREFIXES, PRIMARY_VOLUME, RAW_PREFIX};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Result of the resolution cascade
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A readable local path
    Path(PathBuf),
    /// A best-effort id usable as a display name, not a path
    DisplayId(String),
    Unresolvable,
}

/// Resolves handles to direct local paths
pub struct HandleResolver {
    provider: Arc<dyn ContentProvider>,
    volumes: Arc<dyn VolumeCatalog>,
    document_handles: bool,
}

impl HandleResolver {
    pub fn new(
        provider: Arc<dyn ContentProvider>,
        volumes: Arc<dyn VolumeCatalog>,
        document_handles: bool,
    ) -> Self {
        Self {
            provider,
            volumes,
            document_handles,
        }
    }

    /// Run the cascade for one handle
    #[must_use]
    pub fn resolve(&self, handle: &ContentHandle) -> Resolution {
        let authority = HandleAuthority::classify(handle, self.document_handles);
        debug!(%handle, ?authority, "resolving handle");

        match authority {
            HandleAuthority::RawFile => handle
                .file_path()
                .map_or(Resolution::Unresolvable, Resolution::Path),
            HandleAuthority::ExternalStorageDocument(id) => self.external_storage(&id),
            HandleAuthority::DownloadsDocument(id) => self.downloads(&id),
            HandleAuthority::MediaDocument(id) => self.media(&id),
            HandleAuthority::PhotoCloud => handle
                .last_path_segment()
                .map_or(Resolution::Unresolvable, Resolution::DisplayId),
            HandleAuthority::Content => self.data_column(handle, None),
            HandleAuthority::OtherDocument
            | HandleAuthority::RemoteCache
            | HandleAuthority::Unsupported => Resolution::Unresolvable,
        }
    }

    fn external_storage(&self, id: &DocumentId) -> Resolution {
        if !id.kind().eq_ignore_ascii_case(PRIMARY_VOLUME) {
            return Resolution::Unresolvable;
        }
        let (Some(root), Some(rest)) = (self.volumes.primary_root(), id.rest()) else {
            return Resolution::Unresolvable;
        };
        Resolution::Path(root.join(rest.trim_start_matches('/')))
    }

    fn downloads(&self, id: &DocumentId) -> Resolution {
        if id.kind() == RAW_PREFIX {
            return id
                .rest()
                .filter(|rest| !rest.is_empty())
                .map_or(Resolution::Unresolvable, |rest| Resolution::Path(PathBuf::from(rest)));
        }

        let Ok(row) = id.as_str().parse::<u64>() else {
            debug!(id = %id, "download id is not numeric");
            return Resolution::Unresolvable;
        };

        for (authority, prefix) in DOWNLOAD_PREFIXES {
            let Ok(candidate) = ContentHandle::content(authority, &[prefix])
                .and_then(|base| base.with_appended_id(row))
            else {
                continue;
            };
            if let Resolution::Path(path) = self.data_column(&candidate, None) {
                return Resolution::Path(path);
            }
        }
        Resolution::Unresolvable
    }

    fn media(&self, id: &DocumentId) -> Resolution {
        let (Some(space), Some(row)) = (MediaSpace::from_kind(id.kind()), id.rest()) else {
            return Resolution::Unresolvable;
        };
        let Ok(base) = ContentHandle::content("media", &space.segments()) else {
            return Resolution::Unresolvable;
        };
        self.data_column(&base, Some(&RowFilter::new(ID_COLUMN, row)))
    }

    fn data_column(&self, handle: &ContentHandle, filter: Option<&RowFilter>) -> Resolution {
        match self.provider.query_column(handle, DATA_COLUMN, filter) {
            Ok(Some(path)) if !path.is_empty() => Resolution::Path(PathBuf::from(path)),
            Ok(_) => Resolution::Unresolvable,
            Err(e) => {
                debug!(%handle, error = %e, "data column query failed");
                Resolution::Unresolvable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeProvider, FakeVolumes};

    const PRIMARY: &str = "/storage/emulated/0";

    fn resolver(provider: &Arc<FakeProvider>) -> HandleResolver {
        HandleResolver::new(provider.clone(), Arc::new(FakeVolumes::primary(PRIMARY)), true)
    }

    fn handle(raw: &str) -> ContentHandle {
        ContentHandle::parse(raw).unwrap()
    }

    #[test]
    fn test_file_handle_is_returned_verbatim() {
        let provider = Arc::new(FakeProvider::default());
        let resolution = resolver(&provider).resolve(&handle("file:///data/report.pdf"));
        assert_eq!(resolution, Resolution::Path(PathBuf::from("/data/report.pdf")));
        assert_eq!(provider.query_count(), 0);
    }

    #[test]
    fn test_primary_external_document() {
        let provider = Arc::new(FakeProvider::default());
        let resolution = resolver(&provider).resolve(&handle(
            "content://com.android.externalstorage.documents/document/primary%3ADCIM%2Fa.jpg",
        ));
        assert_eq!(resolution, Resolution::Path(PathBuf::from("/storage/emulated/0/DCIM/a.jpg")));
    }

    #[test]
    fn test_secondary_external_document_is_unresolvable() {
        let provider = Arc::new(FakeProvider::default());
        let resolution = resolver(&provider).resolve(&handle(
            "content://com.android.externalstorage.documents/document/1234-ABCD%3Aa.jpg",
        ));
        assert_eq!(resolution, Resolution::Unresolvable);
    }

    #[test]
    fn test_download_id_tries_prefixes_in_order() {
        let provider = Arc::new(FakeProvider::default());
        provider.set_column(
            "content://downloads/all_downloads/42",
            DATA_COLUMN,
            "/storage/emulated/0/Download/x.zip",
        );
        provider.set_column(
            "content://downloads/my_downloads/42",
            DATA_COLUMN,
            "/storage/emulated/0/Download/mine.zip",
        );

        let resolution = resolver(&provider)
            .resolve(&handle("content://com.android.providers.downloads.documents/document/42"));
        assert_eq!(
            resolution,
            Resolution::Path(PathBuf::from("/storage/emulated/0/Download/mine.zip"))
        );
        assert_eq!(provider.query_count(), 2);
    }

    #[test]
    fn test_raw_download_id_short_circuits() {
        let provider = Arc::new(FakeProvider::default());
        let resolution = resolver(&provider).resolve(&handle(
            "content://com.android.providers.downloads.documents/document/raw%3A%2Fstorage%2Femulated%2F0%2FDownload%2Fa.pdf",
        ));
        assert_eq!(
            resolution,
            Resolution::Path(PathBuf::from("/storage/emulated/0/Download/a.pdf"))
        );
        assert_eq!(provider.query_count(), 0);
    }

    #[test]
    fn test_non_numeric_download_id_is_unresolvable() {
        let provider = Arc::new(FakeProvider::default());
        let resolution = resolver(&provider)
            .resolve(&handle("content://com.android.providers.downloads.documents/document/msf%3A12"));
        assert_eq!(resolution, Resolution::Unresolvable);
    }

    #[test]
    fn test_media_document_queries_by_row_id() {
        let provider = Arc::new(FakeProvider::default());
        provider.set_filtered_column(
            "content://media/external/images/media",
            DATA_COLUMN,
            RowFilter::new(ID_COLUMN, "7"),
            "/storage/emulated/0/DCIM/7.jpg",
        );
        let resolution = resolver(&provider)
            .resolve(&handle("content://com.android.providers.media.documents/document/image%3A7"));
        assert_eq!(resolution, Resolution::Path(PathBuf::from("/storage/emulated/0/DCIM/7.jpg")));
    }

    #[test]
    fn test_photo_cloud_yields_display_id() {
        let provider = Arc::new(FakeProvider::default());
        let resolution = resolver(&provider)
            .resolve(&handle("content://com.google.android.apps.photos.content/0/1/IMG_1.jpg"));
        assert_eq!(resolution, Resolution::DisplayId("IMG_1.jpg".into()));
    }

    #[test]
    fn test_remote_cache_never_queries() {
        let provider = Arc::new(FakeProvider::default());
        let resolution = resolver(&provider)
            .resolve(&handle("content://com.google.android.apps.docs.storage/legacy/1"));
        assert_eq!(resolution, Resolution::Unresolvable);
        assert_eq!(provider.query_count(), 0);
    }

    #[test]
    fn test_query_failure_degrades_to_unresolvable() {
        let provider = Arc::new(FakeProvider::default());
        provider.fail_queries();
        let resolution = resolver(&provider).resolve(&handle("content://com.example/files/1"));
        assert_eq!(resolution, Resolution::Unresolvable);
    }

    #[test]
    fn test_generic_content_uses_data_column() {
        let provider = Arc::new(FakeProvider::default());
        provider.set_column("content://com.example/files/1", DATA_COLUMN, "/srv/1.bin");
        let resolution = resolver(&provider).resolve(&handle("content://com.example/files/1"));
        assert_eq!(resolution, Resolution::Path(PathBuf::from("/srv/1.bin")));
    }
}
