//! Built-in and user-defined triggers, resolved against one settings snapshot.

use std::sync::Arc;

use scribe_types::{BuiltInTrigger, Settings, TriggerDefinition};

#[derive(Debug, Clone)]
pub struct TriggerRegistry {
    custom: Arc<Vec<TriggerDefinition>>,
}

impl TriggerRegistry {
    #[must_use]
    pub fn new(custom: Arc<Vec<TriggerDefinition>>) -> Self {
        Self { custom }
    }

    #[must_use]
    pub fn custom(&self) -> &[TriggerDefinition] {
        &self.custom
    }

    #[must_use]
    pub fn find(&self, trigger: &str) -> Option<&TriggerDefinition> {
        self.custom.iter().find(|def| def.trigger() == trigger)
    }

    /// The longest custom trigger ending `text`. Equal lengths keep declared order.
    #[must_use]
    pub fn longest_suffix_match(&self, text: &str) -> Option<&TriggerDefinition> {
        self.custom
            .iter()
            .filter(|def| text.ends_with(def.trigger()))
            .fold(None, |best: Option<&TriggerDefinition>, def| match best {
                Some(current) if current.trigger().len() >= def.trigger().len() => Some(current),
                _ => Some(def),
            })
    }

    /// Enabled built-ins with their configured trigger strings, in matching priority.
    #[must_use]
    pub fn built_ins<'s>(&self, settings: &'s Settings) -> Vec<(BuiltInTrigger, &'s str)> {
        let mut out = Vec::with_capacity(4);
        if settings.smart_reply.enabled {
            out.push((BuiltInTrigger::SmartReply, settings.smart_reply.trigger.as_str()));
        }
        if settings.tone_rewrite.enabled {
            out.push((BuiltInTrigger::ToneRewrite, settings.tone_rewrite.trigger.as_str()));
        }
        if settings.all_menu.enabled {
            out.push((BuiltInTrigger::AllMenu, settings.all_menu.trigger()));
        }
        if settings.search.enabled {
            out.push((BuiltInTrigger::Search, settings.search.trigger.as_str()));
        }
        out
    }

    /// Commands listed by the all menu.
    ///
    /// An explicit order is filtered down to what is currently available;
    /// otherwise enabled built-ins come first, then every custom trigger.
    #[must_use]
    pub fn all_menu_entries(&self, settings: &Settings) -> Vec<String> {
        let available: Vec<String> = self
            .built_ins(settings)
            .into_iter()
            .filter(|(kind, _)| *kind != BuiltInTrigger::AllMenu)
            .map(|(_, trigger)| trigger.to_string())
            .chain(self.custom.iter().map(|def| def.trigger().to_string()))
            .collect();

        if settings.all_menu.order.is_empty() {
            return available;
        }
        settings
            .all_menu
            .order
            .iter()
            .filter(|trigger| available.contains(trigger))
            .cloned()
            .collect()
    }

    /// Triggers offered for a text selection: reply, tone, then custom.
    #[must_use]
    pub fn selection_entries(&self, settings: &Settings) -> Vec<String> {
        let mut out = Vec::with_capacity(self.custom.len() + 2);
        if settings.smart_reply.enabled {
            out.push(settings.smart_reply.trigger.to_string());
        }
        if settings.tone_rewrite.enabled {
            out.push(settings.tone_rewrite.trigger.to_string());
        }
        out.extend(self.custom.iter().map(|def| def.trigger().to_string()));
        out
    }
}
