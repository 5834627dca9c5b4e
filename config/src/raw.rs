//! Raw TOML structs and their resolution into domain types.
//!
//! Everything here is lenient: an unknown enum string or an invalid trigger is
//! logged and replaced by its default rather than failing the whole load.

use std::collections::HashSet;
use std::env;
use std::fmt;
use std::time::Duration;

use scribe_types::settings::{
    AllMenuSettings, BuiltInSettings, DEFAULT_CUSTOM_API_URL, ProviderSettings, SearchEngine,
    SearchSettings, SelectionMenuSettings, SelectionMenuStyle, ServiceSettings, StreamingSettings,
    TriggerMethod, UndoRedoSettings,
};
use scribe_types::{
    ApiKey, AppId, NonEmptyString, Provider, Settings, ShortcutDefinition, TriggerDefinition,
    default_custom_triggers,
};
use serde::Deserialize;

use crate::expand_env_vars;

// bool::default() is false, so only true needs a fn
const fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawConfig {
    provider: Option<RawProvider>,
    service: Option<RawService>,
    smart_reply: Option<RawBuiltIn>,
    tone_rewrite: Option<RawBuiltIn>,
    search: Option<RawSearch>,
    all_menu: Option<RawAllMenu>,
    streaming: Option<RawStreaming>,
    undo_redo: Option<RawUndoRedo>,
    selection_menu: Option<RawSelectionMenu>,
    /// `None` (absent) means "use the shipped defaults"; an empty array means none.
    triggers: Option<Vec<RawTrigger>>,
    #[serde(default)]
    shortcuts: Vec<RawShortcut>,
}

#[derive(Default, Deserialize)]
struct RawProvider {
    kind: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    custom_api_url: Option<String>,
    custom_api_key: Option<String>,
    custom_model: Option<String>,
}

// Manual Debug impl to keep keys out of logs.
impl fmt::Debug for RawProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(opt: Option<&String>) -> &'static str {
            if opt.is_some() { "[REDACTED]" } else { "None" }
        }
        f.debug_struct("RawProvider")
            .field("kind", &self.kind)
            .field("api_key", &mask(self.api_key.as_ref()))
            .field("model", &self.model)
            .field("custom_api_url", &self.custom_api_url)
            .field("custom_api_key", &mask(self.custom_api_key.as_ref()))
            .field("custom_model", &self.custom_model)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RawService {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    offline: bool,
    trigger_method: Option<String>,
    #[serde(default)]
    app_toggle_enabled: bool,
    #[serde(default = "default_true")]
    app_active: bool,
    #[serde(default)]
    disabled_apps: Vec<String>,
    #[serde(default)]
    processing_indicator: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawBuiltIn {
    #[serde(default)]
    enabled: bool,
    trigger: Option<String>,
    prompt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSearch {
    #[serde(default)]
    enabled: bool,
    trigger: Option<String>,
    engine: Option<String>,
    custom_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAllMenu {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    order: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStreaming {
    #[serde(default)]
    enabled: bool,
    delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawUndoRedo {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
}

#[derive(Debug, Default, Deserialize)]
struct RawSelectionMenu {
    #[serde(default)]
    enabled: bool,
    style: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTrigger {
    trigger: String,
    #[serde(default)]
    instruction: String,
}

#[derive(Debug, Deserialize)]
struct RawShortcut {
    trigger: String,
    #[serde(default)]
    replacement: String,
}

/// A fully resolved configuration: one settings snapshot and both lists.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub settings: Settings,
    pub triggers: Vec<TriggerDefinition>,
    pub shortcuts: Vec<ShortcutDefinition>,
}

impl Default for Resolved {
    fn default() -> Self {
        RawConfig::default().resolve()
    }
}

/// Parse and resolve TOML text.
pub fn parse_str(content: &str) -> Result<Resolved, toml::de::Error> {
    let raw: RawConfig = toml::from_str(content)?;
    Ok(raw.resolve())
}

impl RawConfig {
    pub(crate) fn resolve(self) -> Resolved {
        let settings = Settings {
            provider: resolve_provider(self.provider.unwrap_or_default()),
            service: self.service.map_or_else(ServiceSettings::default, resolve_service),
            smart_reply: resolve_built_in(self.smart_reply.unwrap_or_default(), "@reply"),
            tone_rewrite: resolve_built_in(self.tone_rewrite.unwrap_or_default(), "@tone"),
            search: resolve_search(self.search.unwrap_or_default()),
            all_menu: self.all_menu.map_or_else(AllMenuSettings::default, |raw| {
                AllMenuSettings {
                    enabled: raw.enabled,
                    order: raw
                        .order
                        .into_iter()
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect(),
                }
            }),
            streaming: self.streaming.map_or_else(StreamingSettings::default, |raw| {
                let defaults = StreamingSettings::default();
                StreamingSettings {
                    enabled: raw.enabled,
                    delay: raw.delay_ms.map_or(defaults.delay, Duration::from_millis),
                }
            }),
            undo_redo: self.undo_redo.map_or_else(UndoRedoSettings::default, |raw| {
                UndoRedoSettings {
                    enabled: raw.enabled,
                    x: raw.x,
                    y: raw.y,
                }
            }),
            selection_menu: self
                .selection_menu
                .map_or_else(SelectionMenuSettings::default, resolve_selection_menu),
        };

        let triggers = match self.triggers {
            Some(raw) => resolve_triggers(raw),
            None => default_custom_triggers(),
        };
        let shortcuts = resolve_shortcuts(self.shortcuts);

        Resolved {
            settings,
            triggers,
            shortcuts,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| expand_env_vars(v.trim()))
        .filter(|v| !v.trim().is_empty())
}

fn resolve_key(value: Option<String>, provider: Provider) -> ApiKey {
    let key = non_blank(value).or_else(|| {
        env::var(provider.env_var())
            .ok()
            .filter(|v| !v.trim().is_empty())
    });
    key.map(ApiKey::new).unwrap_or_default()
}

fn resolve_provider(raw: RawProvider) -> ProviderSettings {
    let kind = match raw.kind.as_deref() {
        None => Provider::default(),
        Some(s) => Provider::parse(s).unwrap_or_else(|| {
            tracing::warn!(kind = s, "Unknown provider kind; using gemini");
            Provider::default()
        }),
    };
    ProviderSettings {
        kind,
        api_key: resolve_key(raw.api_key, Provider::Gemini),
        model: non_blank(raw.model).unwrap_or_else(|| Provider::Gemini.default_model().into()),
        custom_api_url: non_blank(raw.custom_api_url)
            .unwrap_or_else(|| DEFAULT_CUSTOM_API_URL.into()),
        custom_api_key: resolve_key(raw.custom_api_key, Provider::Custom),
        custom_model: non_blank(raw.custom_model)
            .unwrap_or_else(|| Provider::Custom.default_model().into()),
    }
}

fn resolve_service(raw: RawService) -> ServiceSettings {
    let trigger_method = match raw.trigger_method.as_deref() {
        None => TriggerMethod::default(),
        Some(s) => TriggerMethod::parse(s).unwrap_or_else(|| {
            tracing::warn!(trigger_method = s, "Unknown trigger method; using observer");
            TriggerMethod::default()
        }),
    };
    ServiceSettings {
        enabled: raw.enabled,
        offline: raw.offline,
        trigger_method,
        app_toggle_enabled: raw.app_toggle_enabled,
        app_active: raw.app_active,
        disabled_apps: raw
            .disabled_apps
            .into_iter()
            .map(|app| app.trim().to_string())
            .filter(|app| !app.is_empty())
            .map(AppId::new)
            .collect(),
        processing_indicator: raw.processing_indicator,
    }
}

fn resolve_trigger_string(value: Option<String>, default: &'static str) -> NonEmptyString {
    let fallback = || BuiltInSettings::disabled(default).trigger;
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.chars().any(char::is_whitespace) => {
            tracing::warn!(trigger = %v, "Trigger contains whitespace; using {default}");
            fallback()
        }
        Some(v) => NonEmptyString::new(v).unwrap_or_else(|_| fallback()),
        None => fallback(),
    }
}

fn resolve_built_in(raw: RawBuiltIn, default_trigger: &'static str) -> BuiltInSettings {
    BuiltInSettings {
        enabled: raw.enabled,
        trigger: resolve_trigger_string(raw.trigger, default_trigger),
        prompt: raw.prompt.filter(|p| !p.trim().is_empty()),
    }
}

fn resolve_search(raw: RawSearch) -> SearchSettings {
    let engine = match raw.engine.as_deref() {
        None => SearchEngine::default(),
        Some(s) => SearchEngine::parse(s).unwrap_or_else(|| {
            tracing::warn!(engine = s, "Unknown search engine; using DuckDuckGo");
            SearchEngine::default()
        }),
    };
    SearchSettings {
        enabled: raw.enabled,
        trigger: resolve_trigger_string(raw.trigger, "@search"),
        engine,
        custom_url: raw.custom_url.unwrap_or_default().trim().to_string(),
    }
}

fn resolve_selection_menu(raw: RawSelectionMenu) -> SelectionMenuSettings {
    let style = match raw.style.as_deref() {
        None => SelectionMenuStyle::default(),
        Some(s) => SelectionMenuStyle::parse(s).unwrap_or_else(|| {
            tracing::warn!(style = s, "Unknown selection menu style; using grid");
            SelectionMenuStyle::default()
        }),
    };
    SelectionMenuSettings {
        enabled: raw.enabled,
        style,
    }
}

fn resolve_triggers(raw: Vec<RawTrigger>) -> Vec<TriggerDefinition> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());
    for entry in raw {
        match TriggerDefinition::new(entry.trigger, entry.instruction) {
            Ok(def) if seen.insert(def.trigger().to_string()) => out.push(def),
            Ok(def) => {
                tracing::warn!(trigger = def.trigger(), "Duplicate trigger ignored");
            }
            Err(e) => tracing::warn!("Invalid trigger ignored: {e}"),
        }
    }
    out
}

fn resolve_shortcuts(raw: Vec<RawShortcut>) -> Vec<ShortcutDefinition> {
    raw.into_iter()
        .filter_map(|entry| match ShortcutDefinition::new(entry.trigger, entry.replacement) {
            Ok(shortcut) => Some(shortcut),
            Err(e) => {
                tracing::warn!("Invalid shortcut ignored: {e}");
                None
            }
        })
        .collect()
}
