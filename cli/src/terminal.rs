//! Host surfaces backed by the terminal.
//!
//! The terminal plays a single text field: every typed line replaces the
//! field's text and raises a `TextChanged` event. Earlier lines stand in for
//! the rest of the screen, so smart reply sees them as the conversation.
//! Overlays, notifications and the undo control are printed.

use std::collections::VecDeque;
use std::fmt::Display;
use std::io::{self, Write};
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use scribe_engine::{
    AnimationHost, Clipboard, Hosts, Notifier, OverlayHost, SelectionMenu, SuggestionKind,
    SuggestionList, SurfaceError, TextSurface,
};
use scribe_types::{AppId, FieldEvent, FieldHandle, FieldId};
use tokio::sync::mpsc;
use url::Url;

const FIELD_ID: FieldId = FieldId::new(1);
const APP_ID: &str = "terminal";
/// Earlier lines offered as screen context.
const CONTEXT_LINES: usize = 20;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Line-oriented output shared by every host.
#[derive(Clone)]
pub struct Console {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Console {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn line(&self, line: impl Display) {
        let mut out = lock(&self.out);
        // Output is best effort; a closed stdout must not stop the pipeline.
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

#[derive(Debug, Default)]
struct FieldState {
    text: String,
    selection: Option<(usize, usize)>,
    history: VecDeque<String>,
}

pub struct TerminalSurface {
    console: Console,
    app: AppId,
    state: Mutex<FieldState>,
    events_tx: Mutex<Option<mpsc::UnboundedSender<FieldEvent>>>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<FieldEvent>>>,
}

impl TerminalSurface {
    pub fn new(console: Console) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            console,
            app: AppId::new(APP_ID),
            state: Mutex::new(FieldState::default()),
            events_tx: Mutex::new(Some(tx)),
            events_rx: Mutex::new(Some(rx)),
        }
    }

    /// Replace the field text with `line`, as if the user had typed it.
    pub fn type_line(&self, line: &str) {
        let handle = {
            let mut state = lock(&self.state);
            let previous = mem::replace(&mut state.text, line.to_string());
            if !previous.trim().is_empty() {
                state.history.push_back(previous);
                if state.history.len() > CONTEXT_LINES {
                    state.history.pop_front();
                }
            }
            state.selection = None;
            FieldHandle::new(FIELD_ID, 0, line)
        };
        self.emit(FieldEvent::TextChanged {
            field: handle,
            app: self.app.clone(),
        });
    }

    /// Select characters `start..end` of the current text.
    pub fn select(&self, start: usize, end: usize) {
        let handle = {
            let mut state = lock(&self.state);
            state.selection = Some((start, end));
            FieldHandle::new(FIELD_ID, 0, state.text.clone())
        };
        self.emit(FieldEvent::SelectionChanged {
            field: handle,
            app: self.app.clone(),
            start,
            end,
        });
    }

    pub fn text(&self) -> String {
        lock(&self.state).text.clone()
    }

    /// End the event stream. The pipeline finishes pending work and stops.
    pub fn close(&self) {
        lock(&self.events_tx).take();
    }

    fn emit(&self, event: FieldEvent) {
        if let Some(tx) = lock(&self.events_tx).as_ref()
            && tx.send(event).is_err()
        {
            tracing::debug!("Pipeline gone, field event dropped");
        }
    }

    fn check(handle: &FieldHandle) -> Result<(), SurfaceError> {
        if handle.id() == FIELD_ID {
            Ok(())
        } else {
            Err(SurfaceError::StaleHandle)
        }
    }
}

impl TextSurface for TerminalSurface {
    fn events(&self) -> BoxStream<'static, FieldEvent> {
        match lock(&self.events_rx).take() {
            Some(rx) => stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|event| (event, rx))
            })
            .boxed(),
            None => stream::empty().boxed(),
        }
    }

    fn read_text(&self, field: &FieldHandle) -> Result<String, SurfaceError> {
        Self::check(field)?;
        Ok(self.text())
    }

    fn read_selection(&self, field: &FieldHandle) -> Result<Option<(usize, usize)>, SurfaceError> {
        Self::check(field)?;
        Ok(lock(&self.state).selection)
    }

    fn write(&self, field: &FieldHandle, text: &str) -> Result<(), SurfaceError> {
        Self::check(field)?;
        lock(&self.state).text = text.to_string();
        self.console.line(format_args!("= {text}"));
        Ok(())
    }

    fn refresh(&self, field: &FieldHandle) -> Result<FieldHandle, SurfaceError> {
        Self::check(field)?;
        Ok(FieldHandle::new(FIELD_ID, 0, self.text()))
    }

    fn focus(&self, field: &FieldHandle) -> Result<(), SurfaceError> {
        Self::check(field)
    }

    fn paste(&self, _field: &FieldHandle) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported)
    }

    fn screen_context(&self, _field: &FieldHandle) -> String {
        let state = lock(&self.state);
        state
            .history
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct ConsoleNotifier(Console);

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, force_show: bool) {
        let marker = if force_show { "!" } else { "-" };
        self.0.line(format_args!("{marker} {message}"));
    }
}

pub struct ConsoleAnimation(Console);

impl AnimationHost for ConsoleAnimation {
    fn show_processing(&self) {
        self.0.line("... thinking");
    }

    fn hide_processing(&self) {}
}

pub struct ConsoleOverlay(Console);

impl OverlayHost for ConsoleOverlay {
    fn can_show_overlay(&self) -> bool {
        true
    }

    fn show_selection_affordance(&self, menu: &SelectionMenu) {
        self.0.line(format_args!(
            "Selected \"{}\". :apply one of {}",
            menu.selected,
            menu.triggers.join(" ")
        ));
    }

    fn hide_selection_affordance(&self) {}

    fn show_suggestions(&self, list: &SuggestionList) {
        let title = match list.kind {
            SuggestionKind::SmartReply => "Replies",
            SuggestionKind::ToneRewrite => "Rewrites",
            SuggestionKind::AllMenu => "Commands",
        };
        self.0.line(format_args!("{title} (:pick N):"));
        for (index, item) in list.items.iter().enumerate() {
            self.0.line(format_args!("  {}. {item}", index + 1));
        }
    }

    fn hide_suggestions(&self) {}

    fn show_search(&self, query: &str, url: &Url) {
        self.0.line(format_args!("Search \"{query}\": {url}"));
    }

    fn show_undo_control(&self, _x: i32, _y: i32) {
        self.0.line("(:undo / :redo)");
    }

    fn hide_undo_control(&self) {}
}

/// The system clipboard through `arboard`.
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn write(&self, text: &str) -> Result<(), SurfaceError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|err| SurfaceError::Rejected(err.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|err| SurfaceError::Rejected(err.to_string()))
    }
}

pub fn hosts(surface: Arc<TerminalSurface>, console: &Console, clipboard: Arc<dyn Clipboard>) -> Hosts {
    Hosts {
        surface,
        notifier: Arc::new(ConsoleNotifier(console.clone())),
        animation: Arc::new(ConsoleAnimation(console.clone())),
        overlay: Arc::new(ConsoleOverlay(console.clone())),
        clipboard,
    }
}
