//! Local materialization of picked content
//!
//! Handles without a direct path are streamed into
//! `{cache_root}/picked/{display name}`. Each cache file has a hidden marker
//! recording the handle it was copied from, so a re-delivered result reuses
//! its own copy. A different handle with the same display name gets a
//! numbered name such as `photo (1).jpg`.
//!
//! Content is streamed into a `.part` file and renamed into place only once
//! it is complete and synced. A failed copy never leaves a truncated file
//! under the final name.

pub mod directory;
pub mod error;

pub use directory::DirectoryResolver;
pub use error::MaterializeError;

use crate::handle::ContentHandle;
use crate::outcome::ResolvedItem;
use crate::platform::{ContentProvider, DISPLAY_NAME_COLUMN, LAST_MODIFIED_COLUMN};
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Directory below the cache root holding materialized items
pub const PICKED_DIR: &str = "picked";

const COPY_BUFFER_SIZE: usize = 8 * 1024;

const MARKER_SUFFIX: &str = ".handle";
const PARTIAL_SUFFIX: &str = ".part";

static PARTIAL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Where a handle's content lives in the cache
struct CacheSlot {
    path: PathBuf,
    complete: bool,
}

/// Streams handle content into the local cache
pub struct ContentMaterializer {
    provider: Arc<dyn ContentProvider>,
    cache_root: PathBuf,
}

impl ContentMaterializer {
    pub fn new(provider: Arc<dyn ContentProvider>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            cache_root: cache_root.into(),
        }
    }

    /// Directory holding materialized items
    #[must_use]
    pub fn picked_dir(&self) -> PathBuf {
        self.cache_root.join(PICKED_DIR)
    }

    /// Materialize a handle
    ///
    /// # Errors
    ///
    /// Returns `MaterializeError` if the handle cannot be opened or copied.
    pub fn materialize(
        &self,
        handle: &ContentHandle,
        want_bytes: bool,
    ) -> Result<ResolvedItem, MaterializeError> {
        self.materialize_named(handle, None, want_bytes)
    }

    /// Materialize a handle, using `fallback_name` when the provider reports no name
    ///
    /// A cache file already copied from the same handle is reused without
    /// opening the handle.
    ///
    /// # Errors
    ///
    /// Returns `MaterializeError` if the handle cannot be opened or copied.
    pub fn materialize_named(
        &self,
        handle: &ContentHandle,
        fallback_name: Option<&str>,
        want_bytes: bool,
    ) -> Result<ResolvedItem, MaterializeError> {
        let display_name = self.display_name(handle, fallback_name);
        let dir = self.picked_dir();
        let slot = claim_slot(&dir, handle, &display_name).map_err(|source| {
            MaterializeError::Copy {
                path: dir.join(&display_name).display().to_string(),
                source,
            }
        })?;

        if slot.complete {
            debug!(%handle, path = %slot.path.display(), "reusing cached copy");
        } else {
            info!(%handle, path = %slot.path.display(), "caching picked content");
            self.copy_to_cache(handle, &slot.path)?;
        }

        self.describe_named(handle, &slot.path, display_name, want_bytes)
    }

    /// Describe a handle that already has a direct local path
    ///
    /// # Errors
    ///
    /// Returns `MaterializeError::Stat` if the path cannot be read.
    pub fn describe(
        &self,
        handle: &ContentHandle,
        path: &Path,
        want_bytes: bool,
    ) -> Result<ResolvedItem, MaterializeError> {
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.display_name(handle, None));
        self.describe_named(handle, path, display_name, want_bytes)
    }

    /// Remove every materialized item
    ///
    /// Returns `false` if there was nothing to remove.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory exists but cannot be removed.
    pub fn clear_cache(&self) -> io::Result<bool> {
        let dir = self.picked_dir();
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)?;
        debug!(path = %dir.display(), "cleared materialized files");
        Ok(true)
    }

    /// Name used for the cache file
    ///
    /// Provider metadata first, then `fallback`, then the handle's last path
    /// segment, then a timestamped placeholder.
    #[must_use]
    pub fn display_name(&self, handle: &ContentHandle, fallback: Option<&str>) -> String {
        let metadata = handle
            .is_content()
            .then(|| query_display_name(self.provider.as_ref(), handle))
            .flatten();

        metadata
            .or_else(|| fallback.map(String::from))
            .or_else(|| handle.last_path_segment())
            .and_then(|name| sanitize_file_name(&name))
            .unwrap_or_else(placeholder_name)
    }

    fn copy_to_cache(&self, handle: &ContentHandle, target: &Path) -> Result<(), MaterializeError> {
        let mut reader = self
            .provider
            .open_read(handle)
            .map_err(|source| MaterializeError::Open {
                handle: handle.to_string(),
                source,
            })?;

        let copy_error = |source| MaterializeError::Copy {
            path: target.display().to_string(),
            source,
        };

        copy_into(&mut reader, target).map_err(copy_error)?;
        Ok(())
    }

    fn describe_named(
        &self,
        handle: &ContentHandle,
        path: &Path,
        display_name: String,
        want_bytes: bool,
    ) -> Result<ResolvedItem, MaterializeError> {
        let metadata = fs::metadata(path).map_err(|source| MaterializeError::Stat {
            path: path.display().to_string(),
            source,
        })?;

        let last_modified = handle
            .is_content()
            .then(|| self.reported_last_modified(handle))
            .flatten()
            .or_else(|| metadata.modified().ok().map(DateTime::<Utc>::from));

        Ok(ResolvedItem {
            handle: handle.clone(),
            local_path: Some(path.to_path_buf()),
            display_name,
            size_bytes: metadata.len(),
            last_modified,
            bytes: if want_bytes { load_bytes(path) } else { None },
            is_directory: metadata.is_dir(),
        })
    }

    fn reported_last_modified(&self, handle: &ContentHandle) -> Option<DateTime<Utc>> {
        let millis = self
            .provider
            .query_column(handle, LAST_MODIFIED_COLUMN, None)
            .ok()??
            .trim()
            .parse::<i64>()
            .ok()?;
        DateTime::from_timestamp_millis(millis)
    }
}

/// Read a file fully into memory
///
/// Failures are logged and yield `None`; the caller keeps the artifact.
#[must_use]
pub fn load_bytes(path: &Path) -> Option<Vec<u8>> {
    let read = || -> io::Result<Vec<u8>> {
        let mut file = File::open(path)?;
        let len = usize::try_from(file.metadata()?.len())
            .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    };

    match read() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "failed to load bytes into memory, returning the file without them"
            );
            None
        }
    }
}

/// The provider's display name for a handle, if any
pub(crate) fn query_display_name(
    provider: &dyn ContentProvider,
    handle: &ContentHandle,
) -> Option<String> {
    match provider.query_column(handle, DISPLAY_NAME_COLUMN, None) {
        Ok(name) => name.filter(|n| !n.trim().is_empty()),
        Err(e) => {
            debug!(%handle, error = %e, "display name query failed");
            None
        }
    }
}

/// Pick the cache file for a handle
///
/// Tries `name`, then `stem (1).ext`, `stem (2).ext` and so on. A name is
/// taken by creating its marker exclusively, so parallel materializations
/// never share a file. A name whose marker already records `handle` is
/// reused, and is complete once the file itself exists.
fn claim_slot(dir: &Path, handle: &ContentHandle, name: &str) -> io::Result<CacheSlot> {
    fs::create_dir_all(dir)?;

    for n in 0u32.. {
        let file_name = numbered_name(name, n);
        let marker = dir.join(format!(".{file_name}{MARKER_SUFFIX}"));
        let path = dir.join(&file_name);

        match OpenOptions::new().write(true).create_new(true).open(&marker) {
            Ok(mut file) => {
                file.write_all(handle.as_str().as_bytes())?;
                file.sync_all()?;
                return Ok(CacheSlot {
                    path,
                    complete: false,
                });
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if fs::read_to_string(&marker)? == handle.as_str() {
                    let complete = path.is_file();
                    return Ok(CacheSlot { path, complete });
                }
                debug!(%handle, name = %file_name, "cache name taken by another handle");
            }
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::other(format!("no free cache name for {name}")))
}

/// `name` for `n == 0`, otherwise `stem (n).ext`
fn numbered_name(name: &str, n: u32) -> String {
    if n == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({n}).{ext}"),
        _ => format!("{name} ({n})"),
    }
}

/// Stream `reader` into `target` through a sibling `.part` file
///
/// The partial file is flushed and synced whether or not the copy succeeds,
/// and only a complete copy is renamed to `target`.
fn copy_into(reader: &mut dyn Read, target: &Path) -> io::Result<u64> {
    let mut partial = target.as_os_str().to_owned();
    partial.push(format!(
        ".{}{PARTIAL_SUFFIX}",
        PARTIAL_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    let partial = PathBuf::from(partial);

    let mut file = File::create(&partial)?;
    let copied = stream(reader, &mut file);
    let synced = file.flush().and_then(|()| file.sync_all());
    drop(file);

    let total = copied?;
    synced?;
    fs::rename(&partial, target)?;
    Ok(total)
}

fn stream(reader: &mut dyn Read, file: &mut File) -> io::Result<u64> {
    let mut buffer = [0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        file.write_all(&buffer[..read])?;
        total += read as u64;
    }
}

fn sanitize_file_name(name: &str) -> Option<String> {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => None,
        _ => Some(cleaned),
    }
}

fn placeholder_name() -> String {
    format!("picked_{}", Utc::now().format("%Y%m%d_%H%M%S_%3f"))
}
