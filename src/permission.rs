//! Read-access gate checked before the picker is shown

use crate::platform::PermissionPrompt;
use tracing::info;

/// Permission required by default before presenting the picker
pub const READ_EXTERNAL_STORAGE: &str = "android.permission.READ_EXTERNAL_STORAGE";

/// Result of checking the read-access grant before the picker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// A prompt is on screen; the answer arrives as a host event
    Prompted,
}

/// Checks and requests the read-access grant
///
/// A gate without a permission name always grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGate {
    permission: Option<String>,
}

impl PermissionGate {
    pub fn new(permission: Option<String>) -> Self {
        Self { permission }
    }

    #[must_use]
    pub fn permission(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    /// Grant immediately or start a prompt
    pub fn ensure(&self, prompt: &mut dyn PermissionPrompt) -> Access {
        let Some(permission) = self.permission.as_deref() else {
            return Access::Granted;
        };

        if prompt.is_granted(permission) {
            return Access::Granted;
        }

        info!(permission, "requesting permission");
        prompt.request(permission);
        Access::Prompted
    }

    /// Record the prompt's answer, returning whether access was granted
    pub fn on_result(&self, granted: bool) -> bool {
        info!(permission = self.permission().unwrap_or_default(), granted, "permission result");
        granted
    }
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new(Some(READ_EXTERNAL_STORAGE.to_string()))
    }
}
