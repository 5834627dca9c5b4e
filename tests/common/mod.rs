//! Shared hosts and fixtures for integration tests.
//!
//! The hosts here only use the engine's public traits, so they exercise the
//! same seams a platform integration would.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use scribe_engine::{
    AnimationHost, Clipboard, Hosts, Notifier, OverlayHost, SelectionMenu, SuggestionList,
    SurfaceError, TextSurface,
};
use scribe_types::{AppId, FieldEvent, FieldHandle, FieldId};
use tokio::sync::mpsc;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const FIELD: FieldId = FieldId::new(7);
pub const MODEL: &str = "gemini-2.5-flash-lite";

pub fn app() -> AppId {
    AppId::new("com.example.mail")
}

/// A single always-writable field fed by the test.
pub struct ScriptedField {
    text: Mutex<String>,
    selection: Mutex<Option<(usize, usize)>>,
    writes: Mutex<Vec<String>>,
    events_tx: Mutex<Option<mpsc::UnboundedSender<FieldEvent>>>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<FieldEvent>>>,
}

impl ScriptedField {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            text: Mutex::new(String::new()),
            selection: Mutex::new(None),
            writes: Mutex::new(Vec::new()),
            events_tx: Mutex::new(Some(tx)),
            events_rx: Mutex::new(Some(rx)),
        }
    }

    /// Replace the text as the user would and report it.
    pub fn type_text(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_string();
        *self.selection.lock().unwrap() = None;
        self.emit(FieldEvent::TextChanged {
            field: FieldHandle::new(FIELD, 0, text),
            app: app(),
        });
    }

    pub fn select(&self, start: usize, end: usize) {
        *self.selection.lock().unwrap() = Some((start, end));
        let text = self.text();
        self.emit(FieldEvent::SelectionChanged {
            field: FieldHandle::new(FIELD, 0, text),
            app: app(),
            start,
            end,
        });
    }

    /// End the event stream; a running pipeline drains and stops.
    pub fn close(&self) {
        self.events_tx.lock().unwrap().take();
    }

    pub fn text(&self) -> String {
        self.text.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub async fn wait_for_text(&self, expected: &str) {
        wait_until(|| self.text() == expected).await;
    }

    fn emit(&self, event: FieldEvent) {
        if let Some(tx) = self.events_tx.lock().unwrap().as_ref() {
            let _ = tx.send(event);
        }
    }
}

impl TextSurface for ScriptedField {
    fn events(&self) -> BoxStream<'static, FieldEvent> {
        match self.events_rx.lock().unwrap().take() {
            Some(rx) => stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|event| (event, rx))
            })
            .boxed(),
            None => stream::empty().boxed(),
        }
    }

    fn read_text(&self, _field: &FieldHandle) -> Result<String, SurfaceError> {
        Ok(self.text())
    }

    fn read_selection(&self, _field: &FieldHandle) -> Result<Option<(usize, usize)>, SurfaceError> {
        Ok(*self.selection.lock().unwrap())
    }

    fn write(&self, _field: &FieldHandle, text: &str) -> Result<(), SurfaceError> {
        *self.text.lock().unwrap() = text.to_string();
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn refresh(&self, _field: &FieldHandle) -> Result<FieldHandle, SurfaceError> {
        Ok(FieldHandle::new(FIELD, 0, self.text()))
    }

    fn focus(&self, _field: &FieldHandle) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn paste(&self, _field: &FieldHandle) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported)
    }

    fn screen_context(&self, _field: &FieldHandle) -> String {
        String::new()
    }
}

#[derive(Default)]
pub struct Notices(Mutex<Vec<(String, bool)>>);

impl Notices {
    pub fn all(&self) -> Vec<(String, bool)> {
        self.0.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<(String, bool)> {
        self.0.lock().unwrap().last().cloned()
    }
}

impl Notifier for Notices {
    fn notify(&self, message: &str, force_show: bool) {
        self.0.lock().unwrap().push((message.to_string(), force_show));
    }
}

pub struct Silent;

impl AnimationHost for Silent {
    fn show_processing(&self) {}
    fn hide_processing(&self) {}
}

/// Overlay that remembers the last list, selection menu and search.
#[derive(Default)]
pub struct Screen {
    suggestions: Mutex<Option<SuggestionList>>,
    selection_menu: Mutex<Option<SelectionMenu>>,
    search: Mutex<Option<String>>,
    undo_shown: Mutex<Option<(i32, i32)>>,
}

impl Screen {
    pub fn suggestions(&self) -> Option<SuggestionList> {
        self.suggestions.lock().unwrap().clone()
    }

    pub fn selection_menu(&self) -> Option<SelectionMenu> {
        self.selection_menu.lock().unwrap().clone()
    }

    pub fn search(&self) -> Option<String> {
        self.search.lock().unwrap().clone()
    }

    pub fn undo_position(&self) -> Option<(i32, i32)> {
        *self.undo_shown.lock().unwrap()
    }
}

impl OverlayHost for Screen {
    fn can_show_overlay(&self) -> bool {
        true
    }

    fn show_selection_affordance(&self, menu: &SelectionMenu) {
        *self.selection_menu.lock().unwrap() = Some(menu.clone());
    }

    fn hide_selection_affordance(&self) {
        self.selection_menu.lock().unwrap().take();
    }

    fn show_suggestions(&self, list: &SuggestionList) {
        *self.suggestions.lock().unwrap() = Some(list.clone());
    }

    fn hide_suggestions(&self) {
        self.suggestions.lock().unwrap().take();
    }

    fn show_search(&self, _query: &str, url: &Url) {
        *self.search.lock().unwrap() = Some(url.to_string());
    }

    fn show_undo_control(&self, x: i32, y: i32) {
        *self.undo_shown.lock().unwrap() = Some((x, y));
    }

    fn hide_undo_control(&self) {
        self.undo_shown.lock().unwrap().take();
    }
}

#[derive(Default)]
pub struct Pasteboard(Mutex<Option<String>>);

impl Pasteboard {
    pub fn content(&self) -> Option<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Clipboard for Pasteboard {
    fn write(&self, text: &str) -> Result<(), SurfaceError> {
        *self.0.lock().unwrap() = Some(text.to_string());
        Ok(())
    }
}

/// Test hosts with typed handles kept for assertions.
pub struct TestHosts {
    pub field: Arc<ScriptedField>,
    pub notices: Arc<Notices>,
    pub screen: Arc<Screen>,
    pub clipboard: Arc<Pasteboard>,
}

impl TestHosts {
    pub fn new() -> Self {
        Self {
            field: Arc::new(ScriptedField::new()),
            notices: Arc::new(Notices::default()),
            screen: Arc::new(Screen::default()),
            clipboard: Arc::new(Pasteboard::default()),
        }
    }

    pub fn hosts(&self) -> Hosts {
        Hosts {
            surface: self.field.clone(),
            notifier: self.notices.clone(),
            animation: Arc::new(Silent),
            overlay: self.screen.clone(),
            clipboard: self.clipboard.clone(),
        }
    }
}

/// Poll `done` until it holds, failing the test after five seconds.
pub async fn wait_until(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

pub fn gemini_path(model: &str) -> String {
    format!("/v1beta/models/{model}:generateContent")
}

pub fn gemini_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

pub fn chat_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }]
    })
}

/// Answer every Gemini request for [`MODEL`] with `text`.
pub async fn mount_gemini_reply(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path(gemini_path(MODEL)))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body(text)))
        .mount(server)
        .await;
}

pub async fn mount_gemini_error(server: &MockServer, status: u16, body: &str) {
    Mock::given(method("POST"))
        .and(path(gemini_path(MODEL)))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}
