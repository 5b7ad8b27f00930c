//! Terminal host: permission prompts and a typed-in picker
//!
//! Both capabilities answer synchronously on the terminal but still report
//! through the [`HostEvent`] channel, so the coordinator sees the same
//! asynchronous flow it would with any other host.

use super::{
    HostEvent, LaunchError, PermissionPrompt, PickerAction, PickerIntent, PickerLauncher,
    PickerResponse,
};
use crate::handle::{ContentHandle, HandleError};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};
use std::env;
use std::mem;
use std::path::Path;
use std::sync::mpsc::Sender;
use tracing::{debug, warn};

/// Asks for permissions with a yes/no prompt
pub struct TerminalPermissions {
    assume_yes: bool,
    events: Sender<HostEvent>,
}

impl TerminalPermissions {
    /// With `assume_yes` every permission counts as already granted
    #[must_use]
    pub const fn new(assume_yes: bool, events: Sender<HostEvent>) -> Self {
        Self { assume_yes, events }
    }
}

impl PermissionPrompt for TerminalPermissions {
    fn is_granted(&self, _permission: &str) -> bool {
        self.assume_yes
    }

    fn request(&mut self, permission: &str) {
        let granted = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Allow access to shared storage ({permission})?"))
            .default(true)
            .interact()
            .unwrap_or_else(|e| {
                warn!(error = %e, "permission prompt failed, treating as denied");
                false
            });

        if self.events.send(HostEvent::Permission { granted }).is_err() {
            debug!("permission answer dropped, coordinator is gone");
        }
    }
}

/// Picker that reads handles or paths from the terminal
///
/// Handles given up front are returned by the first launch without
/// prompting.
pub struct TerminalPicker {
    preset: Vec<ContentHandle>,
    events: Sender<HostEvent>,
}

impl TerminalPicker {
    #[must_use]
    pub const fn new(preset: Vec<ContentHandle>, events: Sender<HostEvent>) -> Self {
        Self { preset, events }
    }

    fn prompt(intent: &PickerIntent) -> Result<PickerResponse, LaunchError> {
        let theme = ColorfulTheme::default();
        let label = prompt_label(intent);

        loop {
            let line: String = Input::with_theme(&theme)
                .with_prompt(&label)
                .allow_empty(true)
                .interact_text()
                .map_err(|e| LaunchError(e.to_string()))?;

            match parse_entries(&line, intent.allow_multiple) {
                Ok(handles) => return Ok(response_for(handles)),
                Err(e) => eprintln!("{e}"),
            }
        }
    }
}

impl PickerLauncher for TerminalPicker {
    fn launch(&mut self, intent: &PickerIntent) -> Result<(), LaunchError> {
        let response = if self.preset.is_empty() {
            Self::prompt(intent)?
        } else {
            debug!(count = self.preset.len(), "answering picker with preset handles");
            response_for(mem::take(&mut self.preset))
        };

        self.events
            .send(HostEvent::Picker(response))
            .map_err(|_| LaunchError("coordinator is gone".into()))
    }
}

fn prompt_label(intent: &PickerIntent) -> String {
    match intent.action {
        PickerAction::OpenDocumentTree => "Directory (empty to cancel)".to_string(),
        _ if intent.allow_multiple => {
            format!("Files [{}] (space separated, empty to cancel)", intent.mime_types.join(", "))
        }
        _ => format!("File [{}] (empty to cancel)", intent.mime_types.join(", ")),
    }
}

fn response_for(mut handles: Vec<ContentHandle>) -> PickerResponse {
    match handles.len() {
        0 => PickerResponse::Cancelled,
        1 => PickerResponse::single(handles.remove(0)),
        _ => PickerResponse::multiple(handles),
    }
}

/// Turn one line of input into handles
///
/// Entries containing `://` are handles, anything else is a path resolved
/// against the working directory. Without `multiple` the whole line is one
/// entry, so paths may contain spaces.
fn parse_entries(line: &str, multiple: bool) -> Result<Vec<ContentHandle>, HandleError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<&str> = if multiple {
        line.split_whitespace().collect()
    } else {
        vec![line]
    };

    entries.into_iter().map(parse_entry).collect()
}

fn parse_entry(entry: &str) -> Result<ContentHandle, HandleError> {
    if entry.contains("://") {
        return ContentHandle::parse(entry);
    }

    let path = Path::new(entry);
    if path.is_absolute() {
        ContentHandle::from_path(path)
    } else {
        let cwd = env::current_dir().map_err(|_| HandleError::RelativePath(entry.to_string()))?;
        ContentHandle::from_path(cwd.join(path))
    }
}
