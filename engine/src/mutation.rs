//! Writing generated text back into a field.
//!
//! Two strategies: [`MutationMode::Instant`] writes once, and
//! [`MutationMode::Streaming`] writes a growing prefix word by word. A
//! streaming write that fails falls back to an instant write of the full
//! text, and an instant write that fails falls back to the clipboard: focus,
//! copy, clear, paste. The paste itself is not verified against the field.

use std::sync::Arc;
use std::time::Duration;

use scribe_types::FieldHandle;

use crate::surface::{Clipboard, SurfaceError, TextSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationMode {
    Instant,
    Streaming { delay: Duration },
}

/// How the text reached the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Written,
    /// Direct writes failed; the text was copied and a paste was issued.
    Pasted,
    /// Only the clipboard copy succeeded.
    Copied,
    Failed,
}

impl MutationOutcome {
    /// True when the user has the text, in the field or on the clipboard.
    #[must_use]
    pub fn delivered(self) -> bool {
        !matches!(self, MutationOutcome::Failed)
    }
}

#[derive(Clone)]
pub struct MutationEngine {
    surface: Arc<dyn TextSurface>,
    clipboard: Arc<dyn Clipboard>,
}

impl MutationEngine {
    #[must_use]
    pub fn new(surface: Arc<dyn TextSurface>, clipboard: Arc<dyn Clipboard>) -> Self {
        Self { surface, clipboard }
    }

    pub async fn apply(&self, field: &FieldHandle, text: &str, mode: MutationMode) -> MutationOutcome {
        match mode {
            MutationMode::Instant => self.apply_instant(field, text),
            MutationMode::Streaming { delay } => match self.stream(field, text, delay).await {
                Ok(()) => MutationOutcome::Written,
                Err(err) => {
                    tracing::warn!(field = %field.id(), "Streaming write failed, writing at once: {err}");
                    self.apply_instant(field, text)
                }
            },
        }
    }

    #[must_use]
    pub fn apply_instant(&self, field: &FieldHandle, text: &str) -> MutationOutcome {
        match write_with_refresh(self.surface.as_ref(), field, text) {
            Ok(_) => MutationOutcome::Written,
            Err(err) => {
                tracing::warn!(field = %field.id(), "Write failed, falling back to clipboard: {err}");
                self.paste_fallback(field, text)
            }
        }
    }

    fn paste_fallback(&self, field: &FieldHandle, text: &str) -> MutationOutcome {
        if let Err(err) = self.surface.focus(field) {
            tracing::debug!(field = %field.id(), "Focus before paste failed: {err}");
        }
        if let Err(err) = self.clipboard.write(text) {
            tracing::error!("Clipboard write failed: {err}");
            return MutationOutcome::Failed;
        }
        if let Err(err) = self.surface.write(field, "") {
            tracing::debug!(field = %field.id(), "Clear before paste failed: {err}");
        }
        match self.surface.paste(field) {
            Ok(()) => MutationOutcome::Pasted,
            Err(err) => {
                tracing::warn!(field = %field.id(), "Paste failed, text left on clipboard: {err}");
                MutationOutcome::Copied
            }
        }
    }

    async fn stream(&self, field: &FieldHandle, text: &str, delay: Duration) -> Result<(), SurfaceError> {
        let prefixes = word_prefixes(text);
        let mut handle = field.clone();
        let last = prefixes.len().saturating_sub(1);
        for (index, prefix) in prefixes.into_iter().enumerate() {
            handle = write_with_refresh(self.surface.as_ref(), &handle, prefix)?;
            if index < last {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(())
    }
}

/// Write, retrying once through a refreshed handle when the first is stale.
///
/// When the refresh fails the write is retried with the original handle anyway.
/// Returns the handle that succeeded.
pub fn write_with_refresh(
    surface: &dyn TextSurface,
    field: &FieldHandle,
    text: &str,
) -> Result<FieldHandle, SurfaceError> {
    match surface.write(field, text) {
        Ok(()) => Ok(field.clone()),
        Err(SurfaceError::StaleHandle) => {
            let handle = match surface.refresh(field) {
                Ok(fresh) => fresh,
                Err(err) => {
                    tracing::debug!(field = %field.id(), "Refresh failed: {err}");
                    field.clone()
                }
            };
            surface.write(&handle, text).map(|()| handle)
        }
        Err(err) => Err(err),
    }
}

/// Prefixes of `text` ending at each word, the last one being `text` itself.
///
/// Whitespace-only or empty text yields the text alone.
#[must_use]
pub fn word_prefixes(text: &str) -> Vec<&str> {
    let mut prefixes = Vec::new();
    let mut in_word = false;
    for (index, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if in_word {
                prefixes.push(&text[..index]);
            }
            in_word = false;
        } else {
            in_word = true;
        }
    }
    if in_word || prefixes.is_empty() {
        prefixes.push(text);
    } else if let Some(last) = prefixes.last_mut() {
        // Trailing whitespace: the final write carries it.
        *last = text;
    }
    prefixes
}
