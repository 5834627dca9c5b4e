//! Global on/off switch driven by `@off` / `@on` typed into any field.

use scribe_types::{APP_OFF_COMMAND, APP_ON_COMMAND, ServiceSettings, remove_ignore_ascii_case};

pub const TURNED_OFF_MESSAGE: &str = "Turned OFF (type @on to enable)";
pub const TURNED_ON_MESSAGE: &str = "Turned ON";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleDecision {
    /// Feature off, or active and no command present: keep processing.
    Pass,
    /// A command was found. `text` is the field content with it removed.
    Switch { active: bool, text: String },
    /// Inactive and no ON command: drop the event.
    Suppressed,
}

impl ToggleDecision {
    #[must_use]
    pub fn message(&self) -> Option<&'static str> {
        match self {
            ToggleDecision::Switch { active: true, .. } => Some(TURNED_ON_MESSAGE),
            ToggleDecision::Switch { active: false, .. } => Some(TURNED_OFF_MESSAGE),
            ToggleDecision::Pass | ToggleDecision::Suppressed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AppToggleGate;

impl AppToggleGate {
    /// Commands match anywhere, case-insensitively. OFF is checked first.
    #[must_use]
    pub fn evaluate(&self, service: &ServiceSettings, text: &str) -> ToggleDecision {
        if !service.app_toggle_enabled {
            return ToggleDecision::Pass;
        }

        let lower = text.to_ascii_lowercase();
        if lower.contains(APP_OFF_COMMAND) {
            return ToggleDecision::Switch {
                active: false,
                text: remove_ignore_ascii_case(text, APP_OFF_COMMAND).trim().to_string(),
            };
        }
        if lower.contains(APP_ON_COMMAND) {
            return ToggleDecision::Switch {
                active: true,
                text: remove_ignore_ascii_case(text, APP_ON_COMMAND).trim().to_string(),
            };
        }

        if service.app_active {
            ToggleDecision::Pass
        } else {
            ToggleDecision::Suppressed
        }
    }
}
