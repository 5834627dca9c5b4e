//! Picks the single trigger an observed text fires.
//!
//! Every trigger is a literal suffix of the trimmed text. Candidates are tried
//! in a fixed priority: smart reply, tone rewrite, the all menu, search, and
//! finally the longest matching custom trigger. The first hit wins, so a
//! built-in that is a suffix of a custom trigger (or of another built-in)
//! shadows it. App toggle commands are not suffixes and are handled before
//! matching by [`crate::toggle`].

use scribe_types::{BuiltInTrigger, Settings, TriggerDefinition};

use crate::registry::TriggerRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerMatch {
    BuiltIn {
        kind: BuiltInTrigger,
        trigger: String,
    },
    Custom(TriggerDefinition),
}

impl TriggerMatch {
    #[must_use]
    pub fn trigger(&self) -> &str {
        match self {
            TriggerMatch::BuiltIn { trigger, .. } => trigger,
            TriggerMatch::Custom(def) => def.trigger(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TriggerMatcher<'a> {
    settings: &'a Settings,
    registry: &'a TriggerRegistry,
}

impl<'a> TriggerMatcher<'a> {
    #[must_use]
    pub fn new(settings: &'a Settings, registry: &'a TriggerRegistry) -> Self {
        Self { settings, registry }
    }

    /// Match against `text` after trimming. Disabled built-ins never match.
    #[must_use]
    pub fn find(&self, text: &str) -> Option<TriggerMatch> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let built_in = self
            .registry
            .built_ins(self.settings)
            .into_iter()
            .find(|(_, trigger)| text.ends_with(trigger))
            .map(|(kind, trigger)| TriggerMatch::BuiltIn {
                kind,
                trigger: trigger.to_string(),
            });

        built_in.or_else(|| {
            self.registry
                .longest_suffix_match(text)
                .cloned()
                .map(TriggerMatch::Custom)
        })
    }
}
