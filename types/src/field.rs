//! Host field references and the events that carry them.

use std::time::Instant;

use crate::text::{char_len, splice_chars};
use crate::{AppId, FieldId};

/// Reference to a third-party editable control.
///
/// `(id, generation)` identifies one incarnation of the control: the surface
/// bumps the generation whenever the host recycles the underlying object, and
/// every write validates it. `cached_text` is the text observed when the
/// handle was produced and may be stale by the time it is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHandle {
    id: FieldId,
    generation: u64,
    cached_text: String,
}

impl FieldHandle {
    #[must_use]
    pub fn new(id: FieldId, generation: u64, cached_text: impl Into<String>) -> Self {
        Self {
            id,
            generation,
            cached_text: cached_text.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> FieldId {
        self.id
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn cached_text(&self) -> &str {
        &self.cached_text
    }
}

/// Observation delivered by the host, strictly in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEvent {
    TextChanged {
        field: FieldHandle,
        app: AppId,
    },
    Focused {
        field: FieldHandle,
        app: AppId,
    },
    /// Selection moved. Offsets are character offsets into the field text.
    SelectionChanged {
        field: FieldHandle,
        app: AppId,
        start: usize,
        end: usize,
    },
}

impl FieldEvent {
    #[must_use]
    pub fn field(&self) -> &FieldHandle {
        match self {
            FieldEvent::TextChanged { field, .. }
            | FieldEvent::Focused { field, .. }
            | FieldEvent::SelectionChanged { field, .. } => field,
        }
    }

    #[must_use]
    pub fn app(&self) -> &AppId {
        match self {
            FieldEvent::TextChanged { app, .. }
            | FieldEvent::Focused { app, .. }
            | FieldEvent::SelectionChanged { app, .. } => app,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            FieldEvent::TextChanged { .. } => "text_changed",
            FieldEvent::Focused { .. } => "focused",
            FieldEvent::SelectionChanged { .. } => "selection_changed",
        }
    }
}

/// A non-empty selection captured at selection-change time.
///
/// Offsets refer to `full_text` as captured, not to the live field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSpan {
    full_text: String,
    start: usize,
    end: usize,
    field: FieldHandle,
}

impl SelectionSpan {
    /// Capture `[start, end)` of `full_text`; `None` unless `start < end <= len`.
    #[must_use]
    pub fn capture(
        field: FieldHandle,
        full_text: impl Into<String>,
        start: usize,
        end: usize,
    ) -> Option<Self> {
        let full_text = full_text.into();
        if start >= end || end > char_len(&full_text) {
            return None;
        }
        Some(Self {
            full_text,
            start,
            end,
            field,
        })
    }

    #[must_use]
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    #[must_use]
    pub fn field(&self) -> &FieldHandle {
        &self.field
    }

    /// The selected substring.
    #[must_use]
    pub fn selected(&self) -> String {
        self.full_text
            .chars()
            .skip(self.start)
            .take(self.end - self.start)
            .collect()
    }

    /// `full_text[0, start) + generated + full_text[end, )`.
    #[must_use]
    pub fn splice(&self, generated: &str) -> String {
        // Construction guarantees the span is in range.
        splice_chars(&self.full_text, self.start, self.end, generated)
            .unwrap_or_else(|| self.full_text.clone())
    }
}

/// The last successful mutation: enough to undo or redo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    original_text: String,
    generated_text: String,
    field: FieldHandle,
    created_at: Instant,
}

impl MutationRecord {
    #[must_use]
    pub fn new(
        original_text: impl Into<String>,
        generated_text: impl Into<String>,
        field: FieldHandle,
    ) -> Self {
        Self {
            original_text: original_text.into(),
            generated_text: generated_text.into(),
            field,
            created_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    #[must_use]
    pub fn generated_text(&self) -> &str {
        &self.generated_text
    }

    #[must_use]
    pub fn field(&self) -> &FieldHandle {
        &self.field
    }

    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}
