//! Durable single-slot result cache
//!
//! Keeps the in-flight request and, later, its raw handles or its outcome in
//! a sled tree so both survive the process being killed while the picker is
//! in front. The slot holds at most one logical request.
//!
//! Every write is a single atomic `sled::Batch` followed by a flush. The
//! explicit `state` key says which of the other keys are meaningful, so a
//! reader never has to guess from key presence.

pub mod error;
pub mod types;

pub use error::CacheError;
pub use types::{PersistedItem, PersistedState, RecordState};

use crate::handle::ContentHandle;
use crate::outcome::{FailureCode, Picked, ResolvedItem, SelectionFailure, SelectionOutcome};
use crate::request::SelectionRequest;
use sled::{Batch, Db, Tree};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the sled tree holding the slot
pub const TREE_NAME: &str = "pickr_selection";

/// Logical keys of the persisted record
pub mod keys {
    pub const STATE: &str = "state";
    pub const PENDING_TYPE: &str = "pending.type";
    pub const PENDING_MULTIPLE: &str = "pending.multiple";
    pub const PENDING_WITH_DATA: &str = "pending.with_data";
    pub const RESULT_HANDLES: &str = "result.handles";
    pub const RESULT_ITEMS: &str = "result.items";
    pub const RESULT_DIRECTORY: &str = "result.directory";
    pub const RESULT_CANCELLED: &str = "result.cancelled";
    pub const RESULT_ERROR_CODE: &str = "result.errorCode";
    pub const RESULT_ERROR_MESSAGE: &str = "result.errorMessage";

    pub const ALL: [&str; 10] = [
        STATE,
        PENDING_TYPE,
        PENDING_MULTIPLE,
        PENDING_WITH_DATA,
        RESULT_HANDLES,
        RESULT_ITEMS,
        RESULT_DIRECTORY,
        RESULT_CANCELLED,
        RESULT_ERROR_CODE,
        RESULT_ERROR_MESSAGE,
    ];
}

/// Durable record of the in-flight selection
pub struct ResultCache {
    db: Db,
    tree: Tree,
}

impl ResultCache {
    /// Opens or creates the cache database at `path`
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the database or its tree cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let db = sled::open(path)?;
        let tree = db.open_tree(TREE_NAME)?;
        Ok(Self { db, tree })
    }

    /// Write the pending record for a newly dispatched request
    ///
    /// Stale keys from any earlier request are removed in the same batch.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the write fails.
    pub fn begin(&self, request: &SelectionRequest) -> Result<(), CacheError> {
        let mut batch = Self::cleared_batch();
        Self::put_request(&mut batch, RecordState::Pending, request)?;
        self.commit(batch)
    }

    /// Record the raw handles the picker returned, before resolving them
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if encoding or the write fails.
    pub fn record_returned(
        &self,
        request: &SelectionRequest,
        handles: &[ContentHandle],
    ) -> Result<(), CacheError> {
        let mut batch = Self::cleared_batch();
        Self::put_request(&mut batch, RecordState::Returned, request)?;
        batch.insert(keys::RESULT_HANDLES, encode(&handle_strings(handles))?);
        self.commit(batch)
    }

    /// Record an outcome that could not be delivered
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if encoding or the write fails.
    pub fn record_outcome(
        &self,
        request: &SelectionRequest,
        outcome: &SelectionOutcome,
    ) -> Result<(), CacheError> {
        let mut batch = Self::cleared_batch();
        Self::put_request(&mut batch, RecordState::Completed, request)?;

        match outcome {
            SelectionOutcome::Success {
                picked: Picked::Files(items),
            } => {
                let handles: Vec<ContentHandle> = items.iter().map(|i| i.handle.clone()).collect();
                let persisted: Vec<PersistedItem> = items.iter().map(PersistedItem::from).collect();
                batch.insert(keys::RESULT_HANDLES, encode(&handle_strings(&handles))?);
                batch.insert(keys::RESULT_ITEMS, encode(&persisted)?);
            }
            SelectionOutcome::Success {
                picked: Picked::Directory(path),
            } => {
                batch.insert(keys::RESULT_DIRECTORY, encode(path)?);
            }
            SelectionOutcome::Cancelled => {
                batch.insert(keys::RESULT_CANCELLED, encode(&true)?);
            }
            SelectionOutcome::Failure { failure } => {
                batch.insert(keys::RESULT_ERROR_CODE, failure.code.as_str().as_bytes());
                batch.insert(keys::RESULT_ERROR_MESSAGE, failure.message.as_bytes());
            }
        }

        self.commit(batch)
    }

    /// Read the record without removing it
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the record cannot be read or is inconsistent.
    pub fn peek(&self) -> Result<PersistedState, CacheError> {
        let Some(state) = self.get_string(keys::STATE)? else {
            return Ok(PersistedState::Empty);
        };
        let state = RecordState::parse(&state)?;
        let request = self.read_request()?;

        Ok(match state {
            RecordState::Pending => PersistedState::Pending { request },
            RecordState::Returned => PersistedState::Returned {
                request,
                handles: self.read_handles()?,
            },
            RecordState::Completed => PersistedState::Completed {
                outcome: self.read_outcome()?,
                request,
            },
        })
    }

    /// Read and clear the record
    ///
    /// An inconsistent record is cleared too, so a bad write cannot wedge
    /// the slot.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the record cannot be read or cleared.
    pub fn take(&self) -> Result<PersistedState, CacheError> {
        let state = self.peek();
        self.clear()?;
        state
    }

    /// Remove every key of the record
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the write fails.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.commit(Self::cleared_batch())?;
        debug!("result cache cleared");
        Ok(())
    }

    /// Whether any record is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    fn cleared_batch() -> Batch {
        let mut batch = Batch::default();
        for key in keys::ALL {
            batch.remove(key);
        }
        batch
    }

    fn put_request(
        batch: &mut Batch,
        state: RecordState,
        request: &SelectionRequest,
    ) -> Result<(), CacheError> {
        batch.insert(keys::STATE, state.as_str().as_bytes());
        batch.insert(keys::PENDING_TYPE, request.type_filter.to_string().as_bytes());
        batch.insert(keys::PENDING_MULTIPLE, encode(&request.multiple)?);
        batch.insert(keys::PENDING_WITH_DATA, encode(&request.with_data)?);
        Ok(())
    }

    fn commit(&self, batch: Batch) -> Result<(), CacheError> {
        self.tree.apply_batch(batch)?;
        self.db.flush()?;
        Ok(())
    }

    fn read_request(&self) -> Result<SelectionRequest, CacheError> {
        let type_filter = self
            .get_string(keys::PENDING_TYPE)?
            .ok_or_else(|| CacheError::CorruptRecord(format!("missing {}", keys::PENDING_TYPE)))?;
        let multiple = self.get_decoded(keys::PENDING_MULTIPLE)?.unwrap_or(false);
        let with_data = self.get_decoded(keys::PENDING_WITH_DATA)?.unwrap_or(false);
        Ok(SelectionRequest::from_persisted(&type_filter, multiple, with_data))
    }

    fn read_handles(&self) -> Result<Vec<ContentHandle>, CacheError> {
        let raw: Vec<String> = self.get_decoded(keys::RESULT_HANDLES)?.unwrap_or_default();
        raw.iter()
            .map(|h| ContentHandle::parse(h).map_err(CacheError::from))
            .collect()
    }

    fn read_outcome(&self) -> Result<SelectionOutcome, CacheError> {
        if self.get_decoded::<bool>(keys::RESULT_CANCELLED)?.unwrap_or(false) {
            return Ok(SelectionOutcome::Cancelled);
        }

        if let Some(code) = self.get_string(keys::RESULT_ERROR_CODE)? {
            let code = FailureCode::from_code(&code)
                .ok_or_else(|| CacheError::CorruptRecord(format!("unknown error code '{code}'")))?;
            let message = self.get_string(keys::RESULT_ERROR_MESSAGE)?.unwrap_or_default();
            return Ok(SelectionOutcome::failure(SelectionFailure::new(code, message)));
        }

        if let Some(path) = self.get_decoded::<PathBuf>(keys::RESULT_DIRECTORY)? {
            return Ok(SelectionOutcome::directory(path));
        }

        if let Some(items) = self.get_decoded::<Vec<PersistedItem>>(keys::RESULT_ITEMS)? {
            let items = items
                .into_iter()
                .map(ResolvedItem::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(SelectionOutcome::files(items));
        }

        Err(CacheError::CorruptRecord("completed record without an outcome".into()))
    }

    fn get_string(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.tree
            .get(key)?
            .map(|value| {
                String::from_utf8(value.to_vec())
                    .map_err(|e| CacheError::CorruptRecord(format!("{key}: {e}")))
            })
            .transpose()
    }

    fn get_decoded<T: bincode::Decode<()>>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.tree.get(key)? {
            Some(value) => {
                let (decoded, _): (T, usize) =
                    bincode::decode_from_slice(&value, bincode::config::standard())?;
                Ok(Some(decoded))
            }
            None => Ok(None),
        }
    }
}

fn encode<T: bincode::Encode>(value: &T) -> Result<Vec<u8>, CacheError> {
    Ok(bincode::encode_to_vec(value, bincode::config::standard())?)
}

fn handle_strings(handles: &[ContentHandle]) -> Vec<String> {
    handles.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::TypeFilter;
    use crate::testing::TestCache;

    fn handle(raw: &str) -> ContentHandle {
        ContentHandle::parse(raw).unwrap()
    }

    fn item(raw: &str) -> ResolvedItem {
        ResolvedItem {
            handle: handle(raw),
            local_path: Some(PathBuf::from("/cache/picked/a.txt")),
            display_name: "a.txt".into(),
            size_bytes: 12,
            last_modified: None,
            bytes: Some(b"not persisted".to_vec()),
            is_directory: false,
        }
    }

    #[test]
    fn test_empty_cache_peeks_empty() {
        let cache = TestCache::new();
        assert_eq!(cache.cache().peek().unwrap(), PersistedState::Empty);
        assert!(cache.cache().is_empty());
    }

    #[test]
    fn test_begin_writes_pending_record() {
        let cache = TestCache::new();
        let request = SelectionRequest::files(TypeFilter::parse("pdf,txt")).with_data(true);
        cache.cache().begin(&request).unwrap();

        assert_eq!(
            cache.cache().peek().unwrap(),
            PersistedState::Pending {
                request: request.clone()
            }
        );
    }

    #[test]
    fn test_begin_clears_stale_outcome() {
        let cache = TestCache::new();
        let request = SelectionRequest::file(TypeFilter::Any);
        cache
            .cache()
            .record_outcome(&request, &SelectionOutcome::Cancelled)
            .unwrap();

        cache.cache().begin(&request).unwrap();
        assert!(matches!(cache.cache().peek().unwrap(), PersistedState::Pending { .. }));
        assert!(cache.cache().tree.get(keys::RESULT_CANCELLED).unwrap().is_none());
    }

    #[test]
    fn test_returned_record_keeps_handles() {
        let cache = TestCache::new();
        let request = SelectionRequest::files(TypeFilter::Any);
        let handles = vec![handle("content://a/1"), handle("file:///tmp/b.txt")];
        cache.cache().begin(&request).unwrap();
        cache.cache().record_returned(&request, &handles).unwrap();

        assert_eq!(
            cache.cache().peek().unwrap(),
            PersistedState::Returned { request, handles }
        );
    }

    #[test]
    fn test_completed_files_outcome_round_trips_without_bytes() {
        let cache = TestCache::new();
        let request = SelectionRequest::file(TypeFilter::Any).with_data(true);
        let outcome = SelectionOutcome::files(vec![item("content://a/1")]);
        cache.cache().record_outcome(&request, &outcome).unwrap();

        let PersistedState::Completed { outcome: stored, .. } = cache.cache().peek().unwrap() else {
            panic!("expected completed record");
        };
        assert_eq!(stored.items().len(), 1);
        assert_eq!(stored.items()[0].display_name, "a.txt");
        assert!(stored.items()[0].bytes.is_none());
    }

    #[test]
    fn test_completed_failure_and_directory() {
        let cache = TestCache::new();
        let request = SelectionRequest::directory();

        let failure = SelectionOutcome::failure(SelectionFailure::unknown_directory());
        cache.cache().record_outcome(&request, &failure).unwrap();
        assert_eq!(
            cache.cache().peek().unwrap(),
            PersistedState::Completed {
                request: request.clone(),
                outcome: failure
            }
        );

        let directory = SelectionOutcome::directory(PathBuf::from("/storage/emulated/0/Download"));
        cache.cache().record_outcome(&request, &directory).unwrap();
        assert_eq!(
            cache.cache().peek().unwrap(),
            PersistedState::Completed {
                request,
                outcome: directory
            }
        );
    }

    #[test]
    fn test_take_clears() {
        let cache = TestCache::new();
        let request = SelectionRequest::file(TypeFilter::Any);
        cache.cache().begin(&request).unwrap();

        assert!(matches!(cache.cache().take().unwrap(), PersistedState::Pending { .. }));
        assert_eq!(cache.cache().take().unwrap(), PersistedState::Empty);
        assert!(cache.cache().is_empty());
    }

    #[test]
    fn test_corrupt_record_is_cleared_by_take() {
        let cache = TestCache::new();
        cache.cache().tree.insert(keys::STATE, "completed").unwrap();
        cache.cache().tree.insert(keys::PENDING_TYPE, "*/*").unwrap();

        assert!(matches!(cache.cache().take(), Err(CacheError::CorruptRecord(_))));
        assert_eq!(cache.cache().peek().unwrap(), PersistedState::Empty);
    }

    #[test]
    fn test_record_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let request = SelectionRequest::files(TypeFilter::Mime("image/*".into()));
        {
            let cache = ResultCache::open(dir.path()).unwrap();
            cache.begin(&request).unwrap();
        }
        let cache = ResultCache::open(dir.path()).unwrap();
        assert_eq!(cache.peek().unwrap(), PersistedState::Pending { request });
    }
}
