//! Applying a trigger to a selected substring only.

use std::sync::Arc;

use scribe_types::{AppId, FieldHandle, SelectionSpan, Settings};

use crate::prompt::{self, DEFAULT_TONE_REWRITE_INSTRUCTIONS};
use crate::registry::TriggerRegistry;
use crate::surface::{OverlayHost, SelectionMenu};

pub const SMART_REPLY_ON_SELECTION_MESSAGE: &str =
    "Smart reply works best on full conversations";
pub const TRIGGER_NOT_FOUND_MESSAGE: &str = "Trigger not found";
pub const TEXT_UPDATED_MESSAGE: &str = "Text updated";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CapturedSelection {
    pub(crate) span: SelectionSpan,
    pub(crate) app: AppId,
}

/// A chosen trigger resolved against the captured selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectionPlan {
    pub(crate) selection: CapturedSelection,
    pub(crate) prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectionRefusal {
    NothingSelected,
    SmartReply,
    UnknownTrigger,
}

pub(crate) struct SelectionScopedProcessor {
    overlay: Arc<dyn OverlayHost>,
    captured: Option<CapturedSelection>,
}

impl SelectionScopedProcessor {
    pub(crate) fn new(overlay: Arc<dyn OverlayHost>) -> Self {
        Self {
            overlay,
            captured: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn captured(&self) -> Option<&CapturedSelection> {
        self.captured.as_ref()
    }

    /// Capture `[start, end)` of `full_text` and offer the trigger menu.
    ///
    /// Does nothing while the feature is off or overlays are not permitted. An
    /// empty or out-of-range selection hides any menu already shown.
    pub(crate) fn on_selection_changed(
        &mut self,
        settings: &Settings,
        registry: &TriggerRegistry,
        field: FieldHandle,
        app: AppId,
        full_text: &str,
        (start, end): (usize, usize),
    ) -> bool {
        if !settings.selection_menu.enabled || !self.overlay.can_show_overlay() {
            return false;
        }
        let Some(span) = SelectionSpan::capture(field, full_text, start, end) else {
            self.clear();
            return false;
        };

        let menu = SelectionMenu {
            style: settings.selection_menu.style,
            selected: span.selected(),
            triggers: registry.selection_entries(settings),
        };
        tracing::debug!(
            field = %span.field().id(),
            start,
            end,
            triggers = menu.triggers.len(),
            "Selection captured"
        );
        self.overlay.show_selection_affordance(&menu);
        self.captured = Some(CapturedSelection { span, app });
        true
    }

    /// Forget the selection and hide the menu.
    pub(crate) fn clear(&mut self) {
        if self.captured.take().is_some() {
            self.overlay.hide_selection_affordance();
        }
    }

    /// Build the prompt for `trigger` over the captured selection.
    pub(crate) fn plan(
        &self,
        settings: &Settings,
        registry: &TriggerRegistry,
        trigger: &str,
    ) -> Result<SelectionPlan, SelectionRefusal> {
        let captured = self
            .captured
            .as_ref()
            .ok_or(SelectionRefusal::NothingSelected)?;
        let selected = captured.span.selected();

        let prompt = if settings.smart_reply.enabled && trigger == settings.smart_reply.trigger.as_str() {
            return Err(SelectionRefusal::SmartReply);
        } else if settings.tone_rewrite.enabled && trigger == settings.tone_rewrite.trigger.as_str() {
            let instructions = settings
                .tone_rewrite
                .instructions(DEFAULT_TONE_REWRITE_INSTRUCTIONS);
            prompt::selection_tone_rewrite(&selected, instructions)
        } else if let Some(def) = registry.find(trigger) {
            prompt::selection_custom(def.instruction(), &selected)
        } else {
            return Err(SelectionRefusal::UnknownTrigger);
        };

        Ok(SelectionPlan {
            selection: captured.clone(),
            prompt,
        })
    }
}
