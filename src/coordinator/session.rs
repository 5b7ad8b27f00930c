//! The single in-flight selection and its reply channel

use crate::PickrError;
use crate::outcome::SelectionOutcome;
use crate::platform::{PickerAction, PickerIntent};
use crate::request::{SelectionRequest, TypeFilter};
use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Where the coordinator's state machine stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingPermission,
    AwaitingExternalResult,
    Resolving,
    Delivering,
}

impl SessionState {
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingPermission => "awaiting permission",
            Self::AwaitingExternalResult => "awaiting picker result",
            Self::Resolving => "resolving",
            Self::Delivering => "delivering",
        };
        f.write_str(name)
    }
}

/// The request occupying the slot
///
/// `reply` is `None` when the request was restored from the cache after a
/// restart: nobody is waiting, so the outcome gets persisted.
pub(crate) struct Session {
    pub request: SelectionRequest,
    pub reply: Option<Sender<SelectionOutcome>>,
}

impl Session {
    pub fn live(request: SelectionRequest) -> (Self, PendingSelection) {
        let (sender, receiver) = mpsc::channel();
        let session = Self {
            request,
            reply: Some(sender),
        };
        (session, PendingSelection { receiver })
    }

    pub const fn restored(request: SelectionRequest) -> Self {
        Self {
            request,
            reply: None,
        }
    }
}

/// Single-slot guard: the state plus the session occupying it
pub(crate) struct Slot {
    pub state: SessionState,
    pub session: Option<Session>,
}

impl Slot {
    pub const fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            session: None,
        }
    }

    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.session = None;
    }
}

/// Caller's end of an accepted request
///
/// Receives exactly one outcome. Dropping it before the outcome arrives
/// makes the coordinator persist the outcome for later recovery.
#[derive(Debug)]
pub struct PendingSelection {
    receiver: Receiver<SelectionOutcome>,
}

impl PendingSelection {
    /// Block until the outcome arrives
    ///
    /// # Errors
    ///
    /// Returns `PickrError::Disconnected` if the coordinator went away first.
    pub fn wait(self) -> Result<SelectionOutcome, PickrError> {
        self.receiver.recv().map_err(|_| PickrError::Disconnected)
    }

    /// Wait up to `timeout`; `Ok(None)` if nothing arrived yet
    ///
    /// # Errors
    ///
    /// Returns `PickrError::Disconnected` if the coordinator went away first.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<SelectionOutcome>, PickrError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(PickrError::Disconnected),
        }
    }

    /// Poll without blocking
    ///
    /// # Errors
    ///
    /// Returns `PickrError::Disconnected` if the coordinator went away first.
    pub fn try_outcome(&self) -> Result<Option<SelectionOutcome>, PickrError> {
        match self.receiver.try_recv() {
            Ok(outcome) => Ok(Some(outcome)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(PickrError::Disconnected),
        }
    }
}

/// Describe the picker a request needs
#[must_use]
pub fn picker_intent(request: &SelectionRequest) -> PickerIntent {
    if request.is_directory() {
        return PickerIntent {
            action: PickerAction::OpenDocumentTree,
            mime_types: Vec::new(),
            allow_multiple: false,
        };
    }

    let action = match &request.type_filter {
        TypeFilter::Mime(mime) if mime == "image/*" => PickerAction::PickImage,
        _ => PickerAction::OpenDocument,
    };

    PickerIntent {
        action,
        mime_types: request.type_filter.mime_types(),
        allow_multiple: request.multiple,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_selection_receives_once() {
        let (session, pending) = Session::live(SelectionRequest::file(TypeFilter::Any));
        assert_eq!(pending.try_outcome().unwrap(), None);

        let sender = session.reply.unwrap();
        sender.send(SelectionOutcome::Cancelled).unwrap();
        drop(sender);

        assert_eq!(pending.try_outcome().unwrap(), Some(SelectionOutcome::Cancelled));
        assert!(matches!(pending.try_outcome(), Err(PickrError::Disconnected)));
    }

    #[test]
    fn test_wait_reports_disconnect() {
        let (session, pending) = Session::live(SelectionRequest::file(TypeFilter::Any));
        drop(session);
        assert!(matches!(pending.wait(), Err(PickrError::Disconnected)));
    }

    #[test]
    fn test_wait_timeout_without_outcome() {
        let (_session, pending) = Session::live(SelectionRequest::file(TypeFilter::Any));
        assert_eq!(pending.wait_timeout(Duration::from_millis(5)).unwrap(), None);
    }

    #[test]
    fn test_picker_intent_actions() {
        let dir = picker_intent(&SelectionRequest::directory());
        assert_eq!(dir.action, PickerAction::OpenDocumentTree);
        assert!(dir.mime_types.is_empty());

        let images = picker_intent(&SelectionRequest::files(TypeFilter::Mime("image/*".into())));
        assert_eq!(images.action, PickerAction::PickImage);
        assert!(images.allow_multiple);

        let docs = picker_intent(&SelectionRequest::file(TypeFilter::parse("pdf,docx")));
        assert_eq!(docs.action, PickerAction::OpenDocument);
        assert_eq!(docs.mime_types, vec!["pdf".to_string(), "docx".to_string()]);
    }
}
