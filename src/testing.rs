//! Testing utilities for pickr
//!
//! Scriptable fakes for every platform capability, plus a `TestCache`
//! wrapper that keeps a sled database in a temporary directory.
//!
//! Only available when compiled with `cfg(test)`.

use crate::cache::ResultCache;
use crate::handle::ContentHandle;
use crate::platform::{
    ContentProvider, LaunchError, PermissionPrompt, PickerIntent, PickerLauncher, Platform,
    ProviderError, RowFilter, StatusSink, StorageVolume, VolumeCatalog,
};
use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Result cache in a temporary directory, removed on drop
pub struct TestCache {
    _dir: TempDir,
    cache: Arc<ResultCache>,
}

impl TestCache {
    /// # Panics
    /// Panics if the temporary database cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let cache = ResultCache::open(dir.path().join("state")).expect("Failed to open test cache");
        Self {
            _dir: dir,
            cache: Arc::new(cache),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    #[must_use]
    pub fn shared(&self) -> Arc<ResultCache> {
        Arc::clone(&self.cache)
    }
}

type ColumnKey = (String, String, Option<(String, String)>);

/// In-memory content provider
///
/// Content and columns are keyed by the handle's string form. Unknown
/// handles are not found; unknown columns have no row.
#[derive(Default)]
pub struct FakeProvider {
    content: Mutex<HashMap<String, Vec<u8>>>,
    columns: Mutex<HashMap<ColumnKey, String>>,
    failing_queries: AtomicBool,
    failing_reads: Mutex<HashMap<String, usize>>,
    panicking_opens: AtomicBool,
    opens: AtomicUsize,
    queries: AtomicUsize,
}

impl FakeProvider {
    pub fn set_content(&self, handle: &str, bytes: Vec<u8>) {
        self.content
            .lock()
            .unwrap()
            .insert(handle.to_string(), bytes);
    }

    pub fn set_column(&self, handle: &str, column: &str, value: &str) {
        self.columns
            .lock()
            .unwrap()
            .insert((handle.to_string(), column.to_string(), None), value.to_string());
    }

    pub fn set_filtered_column(&self, handle: &str, column: &str, filter: RowFilter, value: &str) {
        self.columns.lock().unwrap().insert(
            (
                handle.to_string(),
                column.to_string(),
                Some((filter.column, filter.value)),
            ),
            value.to_string(),
        );
    }

    /// Make every later query fail
    pub fn fail_queries(&self) {
        self.failing_queries.store(true, Ordering::SeqCst);
    }

    /// Make the next read of `handle` fail after `limit` bytes
    pub fn fail_next_read_after(&self, handle: &str, limit: usize) {
        self.failing_reads
            .lock()
            .unwrap()
            .insert(handle.to_string(), limit);
    }

    /// Make every later open panic
    pub fn panic_on_open(&self) {
        self.panicking_opens.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Queries for the `_data` column only
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl ContentProvider for FakeProvider {
    fn open_read(&self, handle: &ContentHandle) -> Result<Box<dyn Read + Send>, ProviderError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        assert!(
            !self.panicking_opens.load(Ordering::SeqCst),
            "scripted panic opening {handle}"
        );
        let bytes = self
            .content
            .lock()
            .unwrap()
            .get(handle.as_str())
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(handle.to_string()))?;
        match self.failing_reads.lock().unwrap().remove(handle.as_str()) {
            Some(limit) => Ok(Box::new(Cursor::new(bytes).take(limit as u64).chain(BrokenRead))),
            None => Ok(Box::new(Cursor::new(bytes))),
        }
    }

    fn query_column(
        &self,
        handle: &ContentHandle,
        column: &str,
        filter: Option<&RowFilter>,
    ) -> Result<Option<String>, ProviderError> {
        if column == crate::platform::DATA_COLUMN {
            self.queries.fetch_add(1, Ordering::SeqCst);
        }
        if self.failing_queries.load(Ordering::SeqCst) {
            return Err(ProviderError::Query("scripted failure".into()));
        }
        let key = (
            handle.as_str().to_string(),
            column.to_string(),
            filter.map(|f| (f.column.clone(), f.value.clone())),
        );
        Ok(self.columns.lock().unwrap().get(&key).cloned())
    }
}

/// Reader that always fails, as when a remote source drops mid-transfer
struct BrokenRead;

impl Read for BrokenRead {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection dropped"))
    }
}

/// Fixed volume list
pub struct FakeVolumes {
    volumes: Vec<StorageVolume>,
}

impl FakeVolumes {
    pub fn primary(root: impl Into<PathBuf>) -> Self {
        Self {
            volumes: vec![StorageVolume::primary(root)],
        }
    }

    #[must_use]
    pub fn with_secondary(mut self, uuid: &str, root: impl Into<PathBuf>) -> Self {
        self.volumes.push(StorageVolume::secondary(uuid, root));
        self
    }
}

impl VolumeCatalog for FakeVolumes {
    fn volumes(&self) -> Result<Vec<StorageVolume>, ProviderError> {
        Ok(self.volumes.clone())
    }
}

/// Permission prompt with a fixed grant state that records requests
#[derive(Clone, Default)]
pub struct ScriptedPermissions {
    granted: bool,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPermissions {
    #[must_use]
    pub fn new(granted: bool) -> Self {
        Self {
            granted,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl PermissionPrompt for ScriptedPermissions {
    fn is_granted(&self, _permission: &str) -> bool {
        self.granted
    }

    fn request(&mut self, permission: &str) {
        self.requests.lock().unwrap().push(permission.to_string());
    }
}

/// Picker launcher that records intents
#[derive(Clone, Default)]
pub struct RecordingLauncher {
    intents: Arc<Mutex<Vec<PickerIntent>>>,
    fail_next: Arc<AtomicBool>,
}

impl RecordingLauncher {
    #[must_use]
    pub fn intents(&self) -> Vec<PickerIntent> {
        self.intents.lock().unwrap().clone()
    }

    /// Make the next launch report that no picker can handle the intent
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl PickerLauncher for RecordingLauncher {
    fn launch(&mut self, intent: &PickerIntent) -> Result<(), LaunchError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(LaunchError(format!("{:?}", intent.mime_types)));
        }
        self.intents.lock().unwrap().push(intent.clone());
        Ok(())
    }
}

/// Status sink that records every event
#[derive(Default)]
pub struct RecordingStatus {
    events: Mutex<Vec<bool>>,
}

impl RecordingStatus {
    #[must_use]
    pub fn events(&self) -> Vec<bool> {
        self.events.lock().unwrap().clone()
    }
}

impl StatusSink for RecordingStatus {
    fn picking(&self, active: bool) {
        self.events.lock().unwrap().push(active);
    }
}

/// Handles onto the fakes inside a test platform
pub struct Probes {
    pub provider: Arc<FakeProvider>,
    pub permissions: ScriptedPermissions,
    pub launcher: RecordingLauncher,
    pub status: Arc<RecordingStatus>,
}

/// A platform built from fakes, plus probes to script and inspect them
pub fn test_platform(granted: bool, primary_root: impl Into<PathBuf>) -> (Platform, Probes) {
    let provider = Arc::new(FakeProvider::default());
    let permissions = ScriptedPermissions::new(granted);
    let launcher = RecordingLauncher::default();
    let status = Arc::new(RecordingStatus::default());

    let platform = Platform {
        provider: provider.clone(),
        volumes: Arc::new(FakeVolumes::primary(primary_root)),
        permissions: Box::new(permissions.clone()),
        launcher: Box::new(launcher.clone()),
        status: Some(status.clone()),
    };

    let probes = Probes {
        provider,
        permissions,
        launcher,
        status,
    };
    (platform, probes)
}
