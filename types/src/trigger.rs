//! Trigger and shortcut definitions.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::{NonEmptyString, ShortcutId};

/// Literal suffix that opens the command menu.
pub const ALL_MENU_TRIGGER: &str = "@all";
/// In-text command that switches processing off.
pub const APP_OFF_COMMAND: &str = "@off";
/// In-text command that switches processing back on.
pub const APP_ON_COMMAND: &str = "@on";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerDefinitionError {
    #[error("trigger must not be empty")]
    EmptyTrigger,
    #[error("trigger must not contain whitespace: {0:?}")]
    ContainsWhitespace(String),
    #[error("duplicate trigger: {0}")]
    Duplicate(String),
}

/// A `(trigger, instruction)` pair.
///
/// The trigger is a literal suffix; matching never interprets it as a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerDefinition {
    trigger: NonEmptyString,
    instruction: String,
    built_in: bool,
}

impl TriggerDefinition {
    /// User-defined trigger.
    pub fn new(
        trigger: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Result<Self, TriggerDefinitionError> {
        Ok(Self {
            trigger: parse_trigger(trigger.into())?,
            instruction: instruction.into(),
            built_in: false,
        })
    }

    /// Shipped default. Same matching rules as a user trigger.
    pub fn built_in(
        trigger: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Result<Self, TriggerDefinitionError> {
        Ok(Self {
            built_in: true,
            ..Self::new(trigger, instruction)?
        })
    }

    #[must_use]
    pub fn trigger(&self) -> &str {
        self.trigger.as_str()
    }

    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    #[must_use]
    pub fn is_built_in(&self) -> bool {
        self.built_in
    }

    /// Reject lists that define the same trigger twice.
    pub fn ensure_unique(definitions: &[TriggerDefinition]) -> Result<(), TriggerDefinitionError> {
        let mut seen = HashSet::with_capacity(definitions.len());
        for def in definitions {
            if !seen.insert(def.trigger()) {
                return Err(TriggerDefinitionError::Duplicate(def.trigger().to_string()));
            }
        }
        Ok(())
    }
}

fn parse_trigger(raw: String) -> Result<NonEmptyString, TriggerDefinitionError> {
    let trimmed = raw.trim();
    if trimmed.chars().any(char::is_whitespace) {
        return Err(TriggerDefinitionError::ContainsWhitespace(trimmed.to_string()));
    }
    NonEmptyString::new(trimmed).map_err(|_| TriggerDefinitionError::EmptyTrigger)
}

/// Triggers whose behaviour is not a plain instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltInTrigger {
    SmartReply,
    ToneRewrite,
    AllMenu,
    Search,
}

impl BuiltInTrigger {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            BuiltInTrigger::SmartReply => "smart reply",
            BuiltInTrigger::ToneRewrite => "tone rewrite",
            BuiltInTrigger::AllMenu => "all menu",
            BuiltInTrigger::Search => "search",
        }
    }
}

impl fmt::Display for BuiltInTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Static `trigger -> replacement` substitution. No AI involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutDefinition {
    id: ShortcutId,
    trigger: NonEmptyString,
    replacement: String,
}

impl ShortcutDefinition {
    pub fn new(
        trigger: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Result<Self, TriggerDefinitionError> {
        Ok(Self {
            id: ShortcutId::default(),
            trigger: parse_trigger(trigger.into())?,
            replacement: replacement.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> ShortcutId {
        self.id
    }

    #[must_use]
    pub fn trigger(&self) -> &str {
        self.trigger.as_str()
    }

    #[must_use]
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// `text` with the trailing trigger swapped for the replacement.
    ///
    /// The text is not trimmed: a trigger followed by whitespace does not match.
    #[must_use]
    pub fn expand(&self, text: &str) -> Option<String> {
        let head = text.strip_suffix(self.trigger())?;
        let mut out = String::with_capacity(head.len() + self.replacement.len());
        out.push_str(head);
        out.push_str(&self.replacement);
        Some(out)
    }
}

const DEFAULT_TRIGGERS: &[(&str, &str)] = &[
    (
        "@aido",
        "Answer in the same language as the question. Be direct and concise. \
         Skip introductions and filler; give only the essential information.",
    ),
    (
        "@fixg",
        "Correct all grammar, spelling, and punctuation mistakes in the text. \
         Keep the original meaning and writing style. Output only the corrected text.",
    ),
    (
        "@summ",
        "Summarize the text in one or two short sentences capturing only the main idea. \
         Respond in the language of the original text. Output only the summary.",
    ),
    (
        "@polite",
        "Rewrite the text in a polite and respectful tone suitable for formal communication. \
         Keep the meaning unchanged. Output only the rewritten text.",
    ),
    (
        "@casual",
        "Rewrite the text in a natural, friendly tone, as if speaking to someone you know well. \
         Keep the meaning unchanged. Output only the rewritten text.",
    ),
    (
        "@expand",
        "Expand the text with relevant details or examples while keeping its meaning and tone. \
         Avoid repetition. Output only the expanded text.",
    ),
    (
        "@bullet",
        "Convert the text into concise bullet points, one per line, preserving all key information. \
         Output only the list.",
    ),
    (
        "@improve",
        "Improve the clarity, flow, and readability of the text while keeping its meaning and tone. \
         Output only the improved text.",
    ),
    (
        "@rephrase",
        "Rephrase the text with different wording and sentence structure, keeping the same meaning, \
         tone, and length. Output only the rephrased text.",
    ),
    (
        "@emoji",
        "Add a few relevant emojis inline without changing the original wording. \
         Output only the resulting text.",
    ),
    (
        "@formal",
        "Rewrite the text in a clear, professional business tone, keeping its meaning and length. \
         Output only the rewritten text.",
    ),
    (
        "@funny",
        "Rewrite the text with light, natural humor while keeping its meaning and context. \
         Output only the rewritten text.",
    ),
    (
        "@prompt",
        "Rewrite the input as a clear, detailed, and effective prompt for an AI model, \
         preserving its intent. Output only the refined prompt.",
    ),
];

/// The instruction triggers used when the configuration defines none.
#[must_use]
pub fn default_custom_triggers() -> Vec<TriggerDefinition> {
    DEFAULT_TRIGGERS
        .iter()
        .filter_map(|(trigger, instruction)| TriggerDefinition::built_in(*trigger, *instruction).ok())
        .collect()
}
