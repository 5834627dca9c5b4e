//! In-memory hosts for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use scribe_providers::{CompletionFut, CompletionProvider, ProviderError};
use scribe_types::{AppId, Credentials, FieldEvent, FieldHandle, FieldId};
use tokio::sync::mpsc;
use url::Url;

use crate::surface::{
    AnimationHost, Clipboard, Hosts, Notifier, OverlayHost, SelectionMenu, SuggestionList,
    SurfaceError, TextSurface,
};

#[derive(Debug, Default)]
struct FakeField {
    generation: u64,
    text: String,
    selection: Option<(usize, usize)>,
}

#[derive(Debug, Default)]
struct SurfaceState {
    fields: HashMap<FieldId, FakeField>,
    writes: Vec<String>,
    failing_writes: usize,
    reject_all_writes: bool,
    focuses: usize,
    pastes: usize,
    screen_context: String,
}

#[derive(Debug)]
pub(crate) struct FakeSurface {
    state: Mutex<SurfaceState>,
    events_tx: mpsc::UnboundedSender<FieldEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<FieldEvent>>>,
}

impl FakeSurface {
    pub(crate) fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(SurfaceState::default()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    fn state(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap()
    }

    /// Set the field's text and return a handle for it.
    pub(crate) fn type_text(&self, id: u64, text: &str) -> FieldHandle {
        let mut state = self.state();
        let field = state.fields.entry(FieldId::new(id)).or_default();
        field.text = text.to_string();
        FieldHandle::new(FieldId::new(id), field.generation, text)
    }

    pub(crate) fn select(&self, id: u64, start: usize, end: usize) {
        let mut state = self.state();
        state.fields.entry(FieldId::new(id)).or_default().selection = Some((start, end));
    }

    /// Invalidate outstanding handles for the field.
    pub(crate) fn recycle(&self, id: u64) {
        let mut state = self.state();
        state.fields.entry(FieldId::new(id)).or_default().generation += 1;
    }

    pub(crate) fn text(&self, id: u64) -> String {
        self.state()
            .fields
            .get(&FieldId::new(id))
            .map(|f| f.text.clone())
            .unwrap_or_default()
    }

    pub(crate) fn writes(&self) -> Vec<String> {
        self.state().writes.clone()
    }

    pub(crate) fn fail_next_writes(&self, count: usize) {
        self.state().failing_writes = count;
    }

    pub(crate) fn reject_all_writes(&self) {
        self.state().reject_all_writes = true;
    }

    pub(crate) fn pastes(&self) -> usize {
        self.state().pastes
    }

    pub(crate) fn focuses(&self) -> usize {
        self.state().focuses
    }

    pub(crate) fn set_screen_context(&self, context: &str) {
        self.state().screen_context = context.to_string();
    }

    pub(crate) fn emit(&self, event: FieldEvent) {
        let _ = self.events_tx.send(event);
    }

    fn check(state: &SurfaceState, handle: &FieldHandle) -> Result<(), SurfaceError> {
        match state.fields.get(&handle.id()) {
            Some(field) if field.generation == handle.generation() => Ok(()),
            _ => Err(SurfaceError::StaleHandle),
        }
    }
}

impl TextSurface for FakeSurface {
    fn events(&self) -> BoxStream<'static, FieldEvent> {
        match self.events_rx.lock().unwrap().take() {
            Some(rx) => stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|event| (event, rx))
            })
            .boxed(),
            None => stream::empty().boxed(),
        }
    }

    fn read_text(&self, field: &FieldHandle) -> Result<String, SurfaceError> {
        let state = self.state();
        Self::check(&state, field)?;
        Ok(state.fields[&field.id()].text.clone())
    }

    fn read_selection(&self, field: &FieldHandle) -> Result<Option<(usize, usize)>, SurfaceError> {
        let state = self.state();
        Self::check(&state, field)?;
        Ok(state.fields[&field.id()].selection)
    }

    fn write(&self, field: &FieldHandle, text: &str) -> Result<(), SurfaceError> {
        let mut state = self.state();
        Self::check(&state, field)?;
        if state.reject_all_writes {
            return Err(SurfaceError::Rejected("read-only field".into()));
        }
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(SurfaceError::Rejected("write refused".into()));
        }
        state.writes.push(text.to_string());
        if let Some(f) = state.fields.get_mut(&field.id()) {
            f.text = text.to_string();
        }
        Ok(())
    }

    fn refresh(&self, field: &FieldHandle) -> Result<FieldHandle, SurfaceError> {
        let state = self.state();
        let live = state
            .fields
            .get(&field.id())
            .ok_or(SurfaceError::StaleHandle)?;
        Ok(FieldHandle::new(field.id(), live.generation, live.text.clone()))
    }

    fn focus(&self, field: &FieldHandle) -> Result<(), SurfaceError> {
        let mut state = self.state();
        Self::check(&state, field)?;
        state.focuses += 1;
        Ok(())
    }

    fn paste(&self, field: &FieldHandle) -> Result<(), SurfaceError> {
        let mut state = self.state();
        Self::check(&state, field)?;
        state.pastes += 1;
        Ok(())
    }

    fn screen_context(&self, _field: &FieldHandle) -> String {
        self.state().screen_context.clone()
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    messages: Mutex<Vec<(String, bool)>>,
}

impl RecordingNotifier {
    pub(crate) fn messages(&self) -> Vec<(String, bool)> {
        self.messages.lock().unwrap().clone()
    }

    pub(crate) fn last(&self) -> Option<String> {
        self.messages.lock().unwrap().last().map(|(m, _)| m.clone())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, force_show: bool) {
        self.messages
            .lock()
            .unwrap()
            .push((message.to_string(), force_show));
    }
}

#[derive(Debug, Default)]
pub(crate) struct CountingAnimation {
    pub(crate) shown: AtomicUsize,
    pub(crate) hidden: AtomicUsize,
}

impl AnimationHost for CountingAnimation {
    fn show_processing(&self) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }

    fn hide_processing(&self) {
        self.hidden.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OverlayCall {
    SelectionShown(SelectionMenu),
    SelectionHidden,
    Suggestions(SuggestionList),
    SuggestionsHidden,
    Search { query: String, url: String },
    UndoShown { x: i32, y: i32 },
    UndoHidden,
}

#[derive(Debug)]
pub(crate) struct RecordingOverlay {
    permitted: Mutex<bool>,
    calls: Mutex<Vec<OverlayCall>>,
}

impl Default for RecordingOverlay {
    fn default() -> Self {
        Self {
            permitted: Mutex::new(true),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingOverlay {
    pub(crate) fn deny(&self) {
        *self.permitted.lock().unwrap() = false;
    }

    pub(crate) fn calls(&self) -> Vec<OverlayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn last(&self) -> Option<OverlayCall> {
        self.calls.lock().unwrap().last().cloned()
    }

    fn record(&self, call: OverlayCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl OverlayHost for RecordingOverlay {
    fn can_show_overlay(&self) -> bool {
        *self.permitted.lock().unwrap()
    }

    fn show_selection_affordance(&self, menu: &SelectionMenu) {
        self.record(OverlayCall::SelectionShown(menu.clone()));
    }

    fn hide_selection_affordance(&self) {
        self.record(OverlayCall::SelectionHidden);
    }

    fn show_suggestions(&self, list: &SuggestionList) {
        self.record(OverlayCall::Suggestions(list.clone()));
    }

    fn hide_suggestions(&self) {
        self.record(OverlayCall::SuggestionsHidden);
    }

    fn show_search(&self, query: &str, url: &Url) {
        self.record(OverlayCall::Search {
            query: query.to_string(),
            url: url.to_string(),
        });
    }

    fn show_undo_control(&self, x: i32, y: i32) {
        self.record(OverlayCall::UndoShown { x, y });
    }

    fn hide_undo_control(&self) {
        self.record(OverlayCall::UndoHidden);
    }
}

#[derive(Debug, Default)]
pub(crate) struct MemoryClipboard {
    content: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub(crate) fn content(&self) -> Option<String> {
        self.content.lock().unwrap().clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write(&self, text: &str) -> Result<(), SurfaceError> {
        *self.content.lock().unwrap() = Some(text.to_string());
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) enum Scripted {
    Reply(String),
    Delayed(Duration, String),
    Fail(u16, String),
    Panic,
}

/// Completion provider answering from a script, recording every prompt.
#[derive(Debug, Default)]
pub(crate) struct ScriptedProvider {
    script: Mutex<VecDeque<Scripted>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub(crate) fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn replying(text: &str) -> Self {
        Self::new([Scripted::Reply(text.to_string())])
    }

    pub(crate) fn push(&self, step: Scripted) {
        self.script.lock().unwrap().push_back(step);
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl CompletionProvider for ScriptedProvider {
    fn complete<'a>(&'a self, _credentials: &'a Credentials, prompt: &'a str) -> CompletionFut<'a> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let step = self.script.lock().unwrap().pop_front();
        Box::pin(async move {
            match step {
                Some(Scripted::Reply(text)) => Ok(text),
                Some(Scripted::Delayed(delay, text)) => {
                    tokio::time::sleep(delay).await;
                    Ok(text)
                }
                Some(Scripted::Fail(status, body)) => Err(ProviderError::Http { status, body }),
                Some(Scripted::Panic) => panic!("scripted provider panic"),
                None => Err(ProviderError::EmptyResponse),
            }
        })
    }
}

/// Fakes wired into a [`Hosts`] bundle, with typed access for assertions.
pub(crate) struct FakeHosts {
    pub(crate) surface: Arc<FakeSurface>,
    pub(crate) notifier: Arc<RecordingNotifier>,
    pub(crate) animation: Arc<CountingAnimation>,
    pub(crate) overlay: Arc<RecordingOverlay>,
    pub(crate) clipboard: Arc<MemoryClipboard>,
}

impl FakeHosts {
    pub(crate) fn new() -> Self {
        Self {
            surface: Arc::new(FakeSurface::new()),
            notifier: Arc::new(RecordingNotifier::default()),
            animation: Arc::new(CountingAnimation::default()),
            overlay: Arc::new(RecordingOverlay::default()),
            clipboard: Arc::new(MemoryClipboard::default()),
        }
    }

    pub(crate) fn hosts(&self) -> Hosts {
        Hosts {
            surface: self.surface.clone(),
            notifier: self.notifier.clone(),
            animation: self.animation.clone(),
            overlay: self.overlay.clone(),
            clipboard: self.clipboard.clone(),
        }
    }
}

pub(crate) fn app() -> AppId {
    AppId::new("com.example.chat")
}
