//! Selection coordinator
//!
//! Ties the permission gate, the external picker, resolution and the result
//! cache together for exactly one request at a time:
//!
//! ```text
//! Idle -> AwaitingPermission -> AwaitingExternalResult -> Resolving -> Delivering -> Idle
//! ```
//!
//! `select` writes the pending record before anything is shown, so a process
//! killed while the picker is in front can still recover. The picker's
//! answer re-enters through [`SelectionCoordinator::on_picker_result`]
//! (or [`SelectionCoordinator::handle_event`]), possibly in a new process
//! with no live caller. Resolution runs on a worker thread; the outcome goes
//! to the waiting [`PendingSelection`] or, when nobody is waiting, into the
//! cache for [`SelectionCoordinator::recover`].

pub mod engine;
pub mod session;

pub use engine::ResolutionEngine;
pub use session::{PendingSelection, SessionState, picker_intent};

use crate::PickrError;
use crate::cache::{PersistedState, ResultCache};
use crate::config::PickrConfig;
use crate::handle::ContentHandle;
use crate::materializer::{ContentMaterializer, DirectoryResolver};
use crate::outcome::{SelectionFailure, SelectionOutcome};
use crate::permission::{Access, PermissionGate};
use crate::platform::{
    HostEvent, PermissionPrompt, PickedContent, PickerLauncher, PickerResponse, Platform, StatusSink,
};
use crate::request::SelectionRequest;
use crate::resolver::HandleResolver;
use session::{Session, Slot};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// What the coordinator needs from the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Root of the materialization cache
    pub cache_root: PathBuf,
    /// Permission gated before the picker, `None` to skip the gate
    pub permission: Option<String>,
    /// Platform supports structured document handles
    pub document_handles: bool,
    /// Platform is at or above the scoped-storage threshold
    pub scoped_storage: bool,
}

impl From<&PickrConfig> for CoordinatorSettings {
    fn from(config: &PickrConfig) -> Self {
        Self {
            cache_root: config.cache_root.clone(),
            permission: config.effective_permission(),
            document_handles: config.document_handles,
            scoped_storage: config.scoped_storage,
        }
    }
}

/// State shared with the resolution worker
struct Shared {
    slot: Mutex<Slot>,
    cache: Arc<ResultCache>,
    engine: ResolutionEngine,
    status: Option<Arc<dyn StatusSink>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn picking(&self, request: &SelectionRequest, active: bool) {
        if request.is_directory() {
            return;
        }
        if let Some(status) = &self.status {
            status.picking(active);
        }
    }

    /// Hand the outcome to the live caller, or persist it
    ///
    /// Runs under the slot lock, so a caller woken by the outcome cannot
    /// start a new request before the slot is idle again.
    fn deliver(&self, outcome: SelectionOutcome) {
        let mut slot = self.lock();
        slot.state = SessionState::Delivering;

        let Some(mut session) = slot.session.take() else {
            warn!("outcome produced without a session, dropping it");
            slot.reset();
            return;
        };

        let undelivered = match session.reply.take() {
            Some(reply) => reply.send(outcome).err().map(|e| e.0),
            None => Some(outcome),
        };

        let written = match &undelivered {
            None => self.cache.clear(),
            Some(outcome) => {
                info!(outcome = ?outcome.failure_code(), "no live caller, persisting outcome");
                self.cache.record_outcome(&session.request, outcome)
            }
        };
        if let Err(e) = written {
            error!(error = %e, "failed to update result cache");
        }

        self.picking(&session.request, false);
        slot.reset();
    }
}

/// Single-slot selection state machine
pub struct SelectionCoordinator {
    shared: Arc<Shared>,
    permissions: Box<dyn PermissionPrompt>,
    launcher: Box<dyn PickerLauncher>,
    gate: PermissionGate,
    worker: Option<JoinHandle<()>>,
}

impl SelectionCoordinator {
    pub fn new(platform: Platform, cache: Arc<ResultCache>, settings: CoordinatorSettings) -> Self {
        let Platform {
            provider,
            volumes,
            permissions,
            launcher,
            status,
        } = platform;

        let engine = ResolutionEngine::new(
            HandleResolver::new(provider.clone(), volumes.clone(), settings.document_handles),
            ContentMaterializer::new(provider.clone(), settings.cache_root),
            DirectoryResolver::new(provider, volumes, settings.scoped_storage),
        );

        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::idle()),
                cache,
                engine,
                status,
            }),
            permissions,
            launcher,
            gate: PermissionGate::new(settings.permission),
            worker: None,
        }
    }

    /// Current state of the slot
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    /// Accept a request and start the permission/picker flow
    ///
    /// # Errors
    ///
    /// Returns `PickrError::AlreadyActive` while another request is in
    /// flight (that request is left untouched), or a cache error if the
    /// pending record cannot be written.
    pub fn select(&mut self, request: SelectionRequest) -> Result<PendingSelection, PickrError> {
        let pending = {
            let mut slot = self.shared.lock();
            if !slot.state.is_idle() {
                warn!(state = %slot.state, "rejecting request, a selection is already active");
                return Err(PickrError::AlreadyActive);
            }
            self.shared.cache.begin(&request)?;
            let (session, pending) = Session::live(request);
            slot.session = Some(session);
            slot.state = SessionState::AwaitingPermission;
            pending
        };

        match self.gate.ensure(self.permissions.as_mut()) {
            Access::Granted => self.launch(),
            Access::Prompted => debug!("waiting for the permission prompt"),
        }

        Ok(pending)
    }

    /// Feed the permission prompt's answer back in
    pub fn on_permission_result(&mut self, granted: bool) {
        let state = self.state();
        if state != SessionState::AwaitingPermission {
            warn!(%state, "ignoring unexpected permission result");
            return;
        }

        if self.gate.on_result(granted) {
            self.launch();
        } else {
            self.finish(SelectionOutcome::failure(SelectionFailure::permission_denied()));
        }
    }

    /// Feed the picker's answer back in
    ///
    /// Without a live session (a restarted process) the request is restored
    /// from the pending record and its outcome is persisted.
    pub fn on_picker_result(&mut self, response: PickerResponse) {
        let Some(request) = self.claim_picker_result() else {
            return;
        };

        let handles = match response {
            PickerResponse::Cancelled => {
                info!("picker cancelled");
                self.finish(SelectionOutcome::Cancelled);
                return;
            }
            PickerResponse::Unrecognized { result_code } => {
                error!(result_code, "picker returned an unrecognized result");
                self.finish(SelectionOutcome::failure(SelectionFailure::unknown_activity()));
                return;
            }
            PickerResponse::Selected(PickedContent::Nothing) => {
                error!("picker reported a selection without data");
                self.finish(SelectionOutcome::failure(SelectionFailure::unknown_activity()));
                return;
            }
            PickerResponse::Selected(content) => content.handles(),
        };

        self.start_resolution(request, handles);
    }

    /// Dispatch an asynchronous host answer
    pub fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Permission { granted } => self.on_permission_result(granted),
            HostEvent::Picker(response) => self.on_picker_result(response),
        }
    }

    /// Return an outcome left behind by an earlier process, once
    ///
    /// A record holding raw handles is resolved now. A record that never got
    /// past the picker yields `None`. The record is cleared either way.
    ///
    /// # Errors
    ///
    /// Returns `PickrError::AlreadyActive` while a request is in flight, or a
    /// cache error if the record cannot be read or cleared.
    pub fn recover(&mut self) -> Result<Option<SelectionOutcome>, PickrError> {
        if !self.state().is_idle() {
            return Err(PickrError::AlreadyActive);
        }

        let outcome = match self.shared.cache.take()? {
            PersistedState::Empty => None,
            PersistedState::Pending { .. } => {
                info!("picker never returned, nothing to recover");
                None
            }
            PersistedState::Returned { request, handles } => {
                info!(count = handles.len(), "resolving handles recorded before restart");
                Some(self.shared.engine.resolve(&request, &handles))
            }
            PersistedState::Completed { request, outcome } => Some(if request.with_data {
                engine::reload_bytes(outcome)
            } else {
                outcome
            }),
        };

        Ok(outcome)
    }

    /// Remove every materialized file
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the cache directory cannot be removed.
    pub fn clear_temporary_files(&self) -> Result<bool, PickrError> {
        Ok(self.shared.engine.materializer().clear_cache()?)
    }

    /// Block until the current resolution worker, if any, has finished
    pub fn wait_for_worker(&mut self) {
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            error!("resolution worker panicked");
            self.shared.lock().reset();
        }
    }

    fn claim_picker_result(&mut self) -> Option<SelectionRequest> {
        let mut slot = self.shared.lock();
        match slot.state {
            SessionState::AwaitingExternalResult => slot.session.as_ref().map(|s| s.request.clone()),
            SessionState::Idle => match self.shared.cache.peek() {
                Ok(PersistedState::Pending { request }) => {
                    info!("restoring request after restart");
                    slot.session = Some(Session::restored(request.clone()));
                    slot.state = SessionState::AwaitingExternalResult;
                    Some(request)
                }
                Ok(_) => {
                    warn!("picker result without a pending request");
                    None
                }
                Err(e) => {
                    error!(error = %e, "failed to read pending request");
                    None
                }
            },
            state => {
                warn!(%state, "ignoring unexpected picker result");
                None
            }
        }
    }

    fn launch(&mut self) {
        let intent = {
            let mut slot = self.shared.lock();
            let Some(session) = slot.session.as_ref() else {
                return;
            };
            let intent = picker_intent(&session.request);
            slot.state = SessionState::AwaitingExternalResult;
            intent
        };

        debug!(?intent, "launching picker");
        if let Err(e) = self.launcher.launch(&intent) {
            error!(error = %e, "picker launch failed");
            self.finish(SelectionOutcome::failure(SelectionFailure::invalid_format_type()));
        }
    }

    fn start_resolution(&mut self, request: SelectionRequest, handles: Vec<ContentHandle>) {
        if let Err(e) = self.shared.cache.record_returned(&request, &handles) {
            error!(error = %e, "failed to record returned handles");
        }

        self.shared.lock().state = SessionState::Resolving;
        self.shared.picking(&request, true);
        self.wait_for_worker();

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("pickr-resolver".into())
            .spawn(move || {
                let resolved = panic::catch_unwind(AssertUnwindSafe(|| {
                    shared.engine.resolve(&request, &handles)
                }));
                let outcome = resolved.unwrap_or_else(|_| {
                    error!("resolution panicked");
                    SelectionOutcome::failure(SelectionFailure::unknown_path())
                });
                shared.deliver(outcome);
            });

        match spawned {
            Ok(worker) => self.worker = Some(worker),
            Err(e) => {
                error!(error = %e, "failed to start resolution worker");
                self.finish(SelectionOutcome::failure(SelectionFailure::unknown_path()));
            }
        }
    }

    fn finish(&self, outcome: SelectionOutcome) {
        self.shared.deliver(outcome);
    }
}

impl Drop for SelectionCoordinator {
    fn drop(&mut self) {
        self.wait_for_worker();
    }
}
