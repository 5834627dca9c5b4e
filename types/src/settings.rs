//! Resolved configuration snapshot shared across crates.
//!
//! Raw TOML deserialization structs (with `Option` fields and string enums)
//! stay private in `scribe-config`. The loader resolves them into these types
//! at the parse boundary, and the pipeline only ever sees a whole `Settings`
//! value behind an `Arc`: one snapshot per event, never a live store.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use crate::{ALL_MENU_TRIGGER, ApiKey, AppId, Credentials, NonEmptyString, Provider};

/// Which input surface is allowed to fire triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerMethod {
    /// Field observation (the pipeline in this workspace).
    #[default]
    Observer,
    /// A dedicated keyboard handles triggers itself; the observer stays idle.
    Keyboard,
}

impl TriggerMethod {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "observer" | "accessibility" => Some(Self::Observer),
            "keyboard" => Some(Self::Keyboard),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Observer => "observer",
            Self::Keyboard => "keyboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMenuStyle {
    #[default]
    Grid,
    List,
}

impl SelectionMenuStyle {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grid" => Some(Self::Grid),
            "list" => Some(Self::List),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchEngine {
    Google,
    Bing,
    #[default]
    DuckDuckGo,
    Brave,
    Yandex,
    /// User-supplied URL template containing `%s`.
    Custom,
}

impl SearchEngine {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Some(Self::Google),
            "bing" => Some(Self::Bing),
            "duckduckgo" | "ddg" => Some(Self::DuckDuckGo),
            "brave" => Some(Self::Brave),
            "yandex" => Some(Self::Yandex),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    /// URL template with `%s` standing for the encoded query.
    ///
    /// `Custom` returns the configured template, or `None` when it lacks `%s`.
    #[must_use]
    pub fn url_template<'a>(&self, custom: &'a str) -> Option<&'a str> {
        match self {
            Self::Google => Some("https://www.google.com/search?q=%s"),
            Self::Bing => Some("https://www.bing.com/search?q=%s"),
            Self::DuckDuckGo => Some("https://duckduckgo.com/?q=%s"),
            Self::Brave => Some("https://search.brave.com/search?q=%s"),
            Self::Yandex => Some("https://yandex.com/search/?text=%s"),
            Self::Custom => custom.contains("%s").then_some(custom),
        }
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Google => "Google",
            Self::Bing => "Bing",
            Self::DuckDuckGo => "DuckDuckGo",
            Self::Brave => "Brave",
            Self::Yandex => "Yandex",
            Self::Custom => "Custom",
        })
    }
}

pub const DEFAULT_CUSTOM_API_URL: &str = "https://api.openai.com/v1/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub kind: Provider,
    pub api_key: ApiKey,
    pub model: String,
    pub custom_api_url: String,
    pub custom_api_key: ApiKey,
    pub custom_model: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: Provider::Gemini,
            api_key: ApiKey::default(),
            model: Provider::Gemini.default_model().to_string(),
            custom_api_url: DEFAULT_CUSTOM_API_URL.to_string(),
            custom_api_key: ApiKey::default(),
            custom_model: Provider::Custom.default_model().to_string(),
        }
    }
}

impl ProviderSettings {
    /// Credentials for the selected provider, or `None` when its key is missing.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        let (api_key, model, endpoint) = match self.kind {
            Provider::Gemini => (&self.api_key, &self.model, None),
            Provider::Custom => (
                &self.custom_api_key,
                &self.custom_model,
                Some(self.custom_api_url.trim().to_string()).filter(|url| !url.is_empty()),
            ),
        };
        if api_key.is_empty() {
            return None;
        }
        let model = match model.trim() {
            "" => self.kind.default_model().to_string(),
            trimmed => trimmed.to_string(),
        };
        Some(Credentials {
            provider: self.kind,
            api_key: api_key.clone(),
            model,
            endpoint,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub enabled: bool,
    pub offline: bool,
    pub trigger_method: TriggerMethod,
    pub app_toggle_enabled: bool,
    pub app_active: bool,
    pub disabled_apps: HashSet<AppId>,
    pub processing_indicator: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            offline: false,
            trigger_method: TriggerMethod::Observer,
            app_toggle_enabled: false,
            app_active: true,
            disabled_apps: HashSet::new(),
            processing_indicator: false,
        }
    }
}

impl ServiceSettings {
    #[must_use]
    pub fn is_blacklisted(&self, app: &AppId) -> bool {
        self.disabled_apps.contains(app)
    }
}

/// Smart reply and tone rewrite: toggle, overridable trigger, optional prompt override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltInSettings {
    pub enabled: bool,
    pub trigger: NonEmptyString,
    /// Replacement for the shipped instructions; `None` keeps them.
    pub prompt: Option<String>,
}

impl BuiltInSettings {
    /// Disabled, with the given trigger.
    ///
    /// # Panics
    /// Never for the literal triggers this workspace ships.
    #[must_use]
    pub fn disabled(trigger: &'static str) -> Self {
        Self {
            enabled: false,
            trigger: literal_trigger(trigger),
            prompt: None,
        }
    }

    /// The override when it has content, else `default`.
    #[must_use]
    pub fn instructions<'a>(&'a self, default: &'a str) -> &'a str {
        match self.prompt.as_deref().map(str::trim) {
            Some(custom) if !custom.is_empty() => custom,
            _ => default,
        }
    }
}

fn literal_trigger(trigger: &'static str) -> NonEmptyString {
    // Only called with non-empty literals.
    NonEmptyString::new(trigger).unwrap_or_else(|_| unreachable!("empty trigger literal"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    pub enabled: bool,
    pub trigger: NonEmptyString,
    pub engine: SearchEngine,
    pub custom_url: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            trigger: literal_trigger("@search"),
            engine: SearchEngine::DuckDuckGo,
            custom_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllMenuSettings {
    pub enabled: bool,
    /// Explicit menu order. Empty means "derive from what is enabled".
    pub order: Vec<String>,
}

impl AllMenuSettings {
    #[must_use]
    pub fn trigger(&self) -> &'static str {
        ALL_MENU_TRIGGER
    }
}

pub const DEFAULT_STREAMING_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingSettings {
    pub enabled: bool,
    pub delay: Duration,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            delay: DEFAULT_STREAMING_DELAY,
        }
    }
}

/// Vertical offset used while the control has never been dragged.
pub const UNDO_DEFAULT_Y: i32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UndoRedoSettings {
    pub enabled: bool,
    pub x: i32,
    pub y: i32,
}

impl UndoRedoSettings {
    /// Where to show the control. `(0, 0)` means it was never moved.
    #[must_use]
    pub fn display_position(&self) -> (i32, i32) {
        if self.x == 0 && self.y == 0 {
            (0, UNDO_DEFAULT_Y)
        } else {
            (self.x, self.y)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionMenuSettings {
    pub enabled: bool,
    pub style: SelectionMenuStyle,
}

/// One immutable configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub provider: ProviderSettings,
    pub service: ServiceSettings,
    pub smart_reply: BuiltInSettings,
    pub tone_rewrite: BuiltInSettings,
    pub search: SearchSettings,
    pub all_menu: AllMenuSettings,
    pub streaming: StreamingSettings,
    pub undo_redo: UndoRedoSettings,
    pub selection_menu: SelectionMenuSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: ProviderSettings::default(),
            service: ServiceSettings::default(),
            smart_reply: BuiltInSettings::disabled("@reply"),
            tone_rewrite: BuiltInSettings::disabled("@tone"),
            search: SearchSettings::default(),
            all_menu: AllMenuSettings::default(),
            streaming: StreamingSettings::default(),
            undo_redo: UndoRedoSettings::default(),
            selection_menu: SelectionMenuSettings::default(),
        }
    }
}
