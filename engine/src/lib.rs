//! Event pipeline for Scribe.
//!
//! Watches the text fields reported by a host, detects trigger suffixes and
//! writes AI-generated text back into the field. The crate has no platform
//! code: hosts implement the traits in [`surface`] and feed a [`Pipeline`].
//!
//! ```text
//! FieldEvent ─▶ gates ─▶ TriggerMatcher ─▶ ProcessingCoordinator ─▶ provider
//!                                                   │
//!        undo control ◀─ MutationEngine ◀───────────┘
//! ```

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod coordinator;
mod matcher;
mod mutation;
mod pipeline;
pub mod prompt;
mod registry;
mod selection;
mod shortcuts;
pub mod surface;
mod toggle;
mod undo;

#[cfg(test)]
mod test_support;

pub use matcher::{TriggerMatch, TriggerMatcher};
pub use mutation::{MutationEngine, MutationMode, MutationOutcome, word_prefixes, write_with_refresh};
pub use pipeline::{
    COPIED_MESSAGE, NO_COMMANDS_MESSAGE, NO_REWRITES_MESSAGE, NO_SUGGESTIONS_MESSAGE, PauseSwitch,
    Pipeline, PipelineHandle,
};
pub use registry::TriggerRegistry;
pub use selection::{SMART_REPLY_ON_SELECTION_MESSAGE, TEXT_UPDATED_MESSAGE, TRIGGER_NOT_FOUND_MESSAGE};
pub use shortcuts::{Expansion, ShortcutExpander};
pub use surface::{
    AnimationHost, Clipboard, Hosts, Notifier, OverlayHost, SelectionMenu,
    SuggestionKind, SuggestionList, SurfaceError, TextSurface,
};
pub use toggle::{AppToggleGate, TURNED_OFF_MESSAGE, TURNED_ON_MESSAGE, ToggleDecision};
pub use undo::UNDO_TTL;
