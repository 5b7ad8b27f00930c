//! Classification of handles by issuing authority

use crate::handle::{ContentHandle, DocumentId};

pub const EXTERNAL_STORAGE_AUTHORITY: &str = "com.android.externalstorage.documents";
pub const DOWNLOADS_AUTHORITY: &str = "com.android.providers.downloads.documents";
pub const MEDIA_AUTHORITY: &str = "com.android.providers.media.documents";
pub const PHOTO_CLOUD_AUTHORITY: &str = "com.google.android.apps.photos.content";
pub const REMOTE_CACHE_AUTHORITY: &str = "com.google.android.apps.docs.storage";

/// Authority and row prefixes a numeric download id is re-addressed against, in order
pub const DOWNLOAD_PREFIXES: [(&str, &str); 3] = [
    ("downloads", "public_downloads"),
    ("downloads", "my_downloads"),
    ("downloads", "all_downloads"),
];

/// Volume id of the primary external volume
pub const PRIMARY_VOLUME: &str = "primary";
/// Document id prefix marking a raw filesystem path
pub const RAW_PREFIX: &str = "raw";

/// Media spaces addressable by a media document id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSpace {
    Image,
    Video,
    Audio,
}

impl MediaSpace {
    #[must_use]
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }

    /// Root content space rows of this kind live under
    #[must_use]
    pub const fn segments(self) -> [&'static str; 3] {
        match self {
            Self::Image => ["external", "images", "media"],
            Self::Video => ["external", "video", "media"],
            Self::Audio => ["external", "audio", "media"],
        }
    }
}

/// Closed set of handle kinds the resolver dispatches over
///
/// Variants are listed in cascade order; [`HandleAuthority::classify`]
/// returns the first that matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleAuthority {
    /// `file://` handle
    RawFile,
    ExternalStorageDocument(DocumentId),
    DownloadsDocument(DocumentId),
    MediaDocument(DocumentId),
    /// Structured document handle from a provider without a known layout
    OtherDocument,
    PhotoCloud,
    RemoteCache,
    /// Generic `content://` handle
    Content,
    Unsupported,
}

impl HandleAuthority {
    /// Classify a handle
    ///
    /// With `document_handles` off the platform predates structured document
    /// handles and such handles are treated as generic content.
    #[must_use]
    pub fn classify(handle: &ContentHandle, document_handles: bool) -> Self {
        if handle.is_file() {
            return Self::RawFile;
        }
        if !handle.is_content() {
            return Self::Unsupported;
        }

        if document_handles && let Some(id) = handle.document_id() {
            return match handle.authority() {
                EXTERNAL_STORAGE_AUTHORITY => Self::ExternalStorageDocument(id),
                DOWNLOADS_AUTHORITY => Self::DownloadsDocument(id),
                MEDIA_AUTHORITY => Self::MediaDocument(id),
                _ => Self::OtherDocument,
            };
        }

        match handle.authority() {
            PHOTO_CLOUD_AUTHORITY => Self::PhotoCloud,
            REMOTE_CACHE_AUTHORITY => Self::RemoteCache,
            _ => Self::Content,
        }
    }
}
