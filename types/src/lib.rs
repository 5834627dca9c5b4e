//! Core domain types for Scribe.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the pipeline.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod error;
mod field;
mod ids;
pub mod settings;
mod text;
mod trigger;

pub use error::ProcessingError;
pub use field::{FieldEvent, FieldHandle, MutationRecord, SelectionSpan};
pub use ids::{AppId, FieldId, SessionId, ShortcutId};
pub use settings::{
    AllMenuSettings, BuiltInSettings, ProviderSettings, SearchEngine, SearchSettings,
    SelectionMenuSettings, SelectionMenuStyle, ServiceSettings, Settings, StreamingSettings,
    TriggerMethod, UndoRedoSettings,
};
pub use text::{
    byte_offset_of_char, char_len, remove_ignore_ascii_case, splice_chars, strip_suffix_trimmed,
    substring_before_last,
};
pub use trigger::{
    ALL_MENU_TRIGGER, APP_OFF_COMMAND, APP_ON_COMMAND, BuiltInTrigger, ShortcutDefinition,
    TriggerDefinition, TriggerDefinitionError, default_custom_triggers,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use thiserror::Error;

// ============================================================================
// NonEmpty String Types
// ============================================================================

/// A string guaranteed to be non-empty (after trimming).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

#[derive(Debug, Error)]
#[error("value must not be empty")]
pub struct EmptyStringError;

impl NonEmptyString {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyStringError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyStringError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for NonEmptyString {
    type Error = EmptyStringError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl Deref for NonEmptyString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl AsRef<str> for NonEmptyString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for NonEmptyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Provider & Credential Types
// ============================================================================

/// Supported completion providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    /// Any OpenAI-compatible `chat/completions` endpoint.
    Custom,
}

impl Provider {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Custom => "custom",
        }
    }

    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::Custom => "custom API",
        }
    }

    #[must_use]
    pub fn env_var(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::Custom => "SCRIBE_CUSTOM_API_KEY",
        }
    }

    #[must_use]
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.5-flash-lite",
            Provider::Custom => "gpt-4o-mini",
        }
    }

    /// Models offered for this provider. Custom endpoints accept any name.
    #[must_use]
    pub fn available_models(&self) -> &'static [&'static str] {
        match self {
            Provider::Gemini => &[
                "gemini-2.5-flash-lite",
                "gemini-2.5-flash",
                "gemini-2.5-pro",
                "gemma-3n-e2b-it",
                "gemma-3n-e4b-it",
            ],
            Provider::Custom => &[],
        }
    }

    /// Parse provider from string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Some(Provider::Gemini),
            "custom" | "openai" => Some(Provider::Custom),
            _ => None,
        }
    }

    #[must_use]
    pub fn all() -> &'static [Provider] {
        &[Provider::Gemini, Provider::Custom]
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// An API key. Never printed.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ApiKey(String);

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("ApiKey(<empty>)")
        } else {
            f.write_str("ApiKey(<redacted>)")
        }
    }
}

impl ApiKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

/// Everything a completion provider needs except the prompt.
///
/// Only constructed by [`ProviderSettings::credentials`], which refuses to
/// build one without a key for the selected provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    provider: Provider,
    api_key: ApiKey,
    model: String,
    endpoint: Option<String>,
}

impl Credentials {
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Base URL override; `None` means the provider's canonical endpoint.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}
