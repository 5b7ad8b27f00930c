//! Resolution of returned handles into an outcome
//!
//! Runs on the coordinator's worker thread. Every handle goes through the
//! resolver first and reaches the materializer only when no direct path
//! exists. Handles of a multi-select resolve independently in parallel.

use crate::handle::ContentHandle;
use crate::materializer::{load_bytes, ContentMaterializer, DirectoryResolver, MaterializeError};
use crate::outcome::{FailureCode, Picked, ResolvedItem, SelectionFailure, SelectionOutcome};
use crate::request::SelectionRequest;
use crate::resolver::{HandleResolver, Resolution};
use rayon::prelude::*;
use tracing::{debug, warn};

pub struct ResolutionEngine {
    resolver: HandleResolver,
    materializer: ContentMaterializer,
    directories: DirectoryResolver,
}

impl ResolutionEngine {
    pub const fn new(
        resolver: HandleResolver,
        materializer: ContentMaterializer,
        directories: DirectoryResolver,
    ) -> Self {
        Self {
            resolver,
            materializer,
            directories,
        }
    }

    #[must_use]
    pub const fn materializer(&self) -> &ContentMaterializer {
        &self.materializer
    }

    /// Resolve every handle the picker returned for `request`
    #[must_use]
    pub fn resolve(&self, request: &SelectionRequest, handles: &[ContentHandle]) -> SelectionOutcome {
        if request.is_directory() {
            return self.resolve_directory(handles);
        }

        match handles {
            [] => SelectionOutcome::failure(SelectionFailure::unknown_activity()),
            [handle] if !request.multiple => match self.resolve_item(handle, request.with_data) {
                Ok(item) => SelectionOutcome::files(vec![item]),
                Err(failure) => SelectionOutcome::failure(failure),
            },
            _ => self.resolve_many(handles, request.with_data),
        }
    }

    /// Resolve one handle to an item
    ///
    /// # Errors
    ///
    /// Returns the item's `io_failure` when neither a direct path nor a
    /// materialized copy can be produced.
    pub fn resolve_item(
        &self,
        handle: &ContentHandle,
        want_bytes: bool,
    ) -> Result<ResolvedItem, SelectionFailure> {
        let result = match self.resolver.resolve(handle) {
            Resolution::Path(path) => {
                debug!(%handle, path = %path.display(), "resolved direct path");
                self.materializer.describe(handle, &path, want_bytes)
            }
            Resolution::DisplayId(id) => self.materializer.materialize_named(handle, Some(&id), want_bytes),
            Resolution::Unresolvable => self.materializer.materialize(handle, want_bytes),
        };
        result.map_err(|e| item_failure(&e))
    }

    fn resolve_many(&self, handles: &[ContentHandle], want_bytes: bool) -> SelectionOutcome {
        let results: Vec<Result<ResolvedItem, SelectionFailure>> = handles
            .par_iter()
            .map(|handle| self.resolve_item(handle, want_bytes))
            .collect();

        let mut items = Vec::with_capacity(results.len());
        for (handle, result) in handles.iter().zip(results) {
            match result {
                Ok(item) => items.push(item),
                Err(failure) => warn!(%handle, code = %failure.code, "{}", failure.message),
            }
        }

        if items.is_empty() {
            SelectionOutcome::failure(SelectionFailure::unknown_path())
        } else {
            SelectionOutcome::files(items)
        }
    }

    fn resolve_directory(&self, handles: &[ContentHandle]) -> SelectionOutcome {
        let Some(handle) = handles.first() else {
            return SelectionOutcome::failure(SelectionFailure::unknown_activity());
        };
        match self.directories.resolve(handle) {
            Some(path) => SelectionOutcome::directory(path),
            None => {
                warn!(%handle, "could not resolve directory");
                SelectionOutcome::failure(SelectionFailure::unknown_directory())
            }
        }
    }
}

/// Attach in-memory bytes to every item that has a local file
#[must_use]
pub fn reload_bytes(outcome: SelectionOutcome) -> SelectionOutcome {
    match outcome {
        SelectionOutcome::Success {
            picked: Picked::Files(items),
        } => SelectionOutcome::files(
            items
                .into_iter()
                .map(|mut item| {
                    if item.bytes.is_none() && !item.is_directory {
                        item.bytes = item.local_path.as_deref().and_then(load_bytes);
                    }
                    item
                })
                .collect(),
        ),
        other => other,
    }
}

fn item_failure(error: &MaterializeError) -> SelectionFailure {
    SelectionFailure::new(FailureCode::IoFailure, error.to_string())
}
