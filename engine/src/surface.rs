//! Host capabilities the pipeline is driven through.
//!
//! Everything that touches a real screen lives behind these traits: the text
//! fields of other applications ([`TextSurface`]), transient messages
//! ([`Notifier`]), the processing indicator ([`AnimationHost`]), floating
//! menus and controls ([`OverlayHost`]) and the system clipboard
//! ([`Clipboard`]). The pipeline calls them from its own task only, one event
//! at a time, so implementations never see concurrent calls from it.

use std::sync::Arc;

use futures_util::stream::BoxStream;
use scribe_types::{FieldEvent, FieldHandle, SelectionMenuStyle};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// The handle's generation no longer matches the live control.
    #[error("field handle is stale")]
    StaleHandle,
    /// The host refused the operation.
    #[error("host rejected the operation: {0}")]
    Rejected(String),
    #[error("operation not supported by this host")]
    Unsupported,
}

/// Editable controls of third-party applications.
pub trait TextSurface: Send + Sync {
    /// Field events in arrival order. Called once, when the pipeline starts.
    fn events(&self) -> BoxStream<'static, FieldEvent>;

    fn read_text(&self, field: &FieldHandle) -> Result<String, SurfaceError>;

    /// Current selection as `[start, end)` character offsets, if any.
    fn read_selection(&self, field: &FieldHandle) -> Result<Option<(usize, usize)>, SurfaceError>;

    /// Replace the whole content of the field.
    fn write(&self, field: &FieldHandle, text: &str) -> Result<(), SurfaceError>;

    /// Re-resolve the control behind `field`, returning a handle with the live generation.
    fn refresh(&self, field: &FieldHandle) -> Result<FieldHandle, SurfaceError>;

    fn focus(&self, field: &FieldHandle) -> Result<(), SurfaceError>;

    /// Paste the clipboard into the field.
    fn paste(&self, field: &FieldHandle) -> Result<(), SurfaceError>;

    /// Visible text around the field (the conversation being replied to).
    ///
    /// Hosts without a screen model return nothing.
    fn screen_context(&self, _field: &FieldHandle) -> String {
        String::new()
    }
}

/// One-line user-facing messages.
pub trait Notifier: Send + Sync {
    /// `force_show` marks messages that must be shown even when the host
    /// normally suppresses informational ones.
    fn notify(&self, message: &str, force_show: bool);
}

pub trait AnimationHost: Send + Sync {
    fn show_processing(&self);
    fn hide_processing(&self);
}

/// What a suggestion list was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    SmartReply,
    ToneRewrite,
    AllMenu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionList {
    pub kind: SuggestionKind,
    pub items: Vec<String>,
}

/// Trigger menu offered next to a text selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionMenu {
    pub style: SelectionMenuStyle,
    pub selected: String,
    pub triggers: Vec<String>,
}

/// Floating UI drawn over other applications.
pub trait OverlayHost: Send + Sync {
    fn can_show_overlay(&self) -> bool;

    fn show_selection_affordance(&self, menu: &SelectionMenu);
    fn hide_selection_affordance(&self);

    fn show_suggestions(&self, list: &SuggestionList);
    fn hide_suggestions(&self);

    fn show_search(&self, query: &str, url: &Url);

    fn show_undo_control(&self, x: i32, y: i32);
    fn hide_undo_control(&self);
}

pub trait Clipboard: Send + Sync {
    fn write(&self, text: &str) -> Result<(), SurfaceError>;
}

/// The full set of host capabilities, shared by the pipeline's components.
#[derive(Clone)]
pub struct Hosts {
    pub surface: Arc<dyn TextSurface>,
    pub notifier: Arc<dyn Notifier>,
    pub animation: Arc<dyn AnimationHost>,
    pub overlay: Arc<dyn OverlayHost>,
    pub clipboard: Arc<dyn Clipboard>,
}
