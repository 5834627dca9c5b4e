use thiserror::Error;

use crate::Provider;

/// Terminal outcome of a trigger that did not produce text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessingError {
    /// Service switched off, or another input method is active.
    #[error("processing is disabled")]
    Disabled,
    /// A round-trip is already live; this trigger is dropped.
    #[error("another request is already in progress")]
    Busy,
    #[error("Please set your {provider} API key")]
    MissingCredential { provider: Provider },
    #[error("Offline mode is enabled")]
    OfflineModeActive,
    #[error("{0}")]
    Provider(String),
    #[error("Error - {0}")]
    Unexpected(String),
    #[error("Could not update text in this field")]
    WriteFailed,
    #[error("The text field is no longer available")]
    StaleHandle,
}

impl ProcessingError {
    /// Errors the user never hears about: the trigger is simply not acted on.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Disabled | Self::Busy)
    }

    /// One-line notification text.
    #[must_use]
    pub fn user_message(&self) -> String {
        format!("Scribe: {self}")
    }
}
