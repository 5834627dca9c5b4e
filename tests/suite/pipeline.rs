//! End-to-end pipeline runs: field events in, provider over HTTP, text out.

use std::fs;
use std::sync::Arc;

use scribe_config::{ConfigStore, FileStore, MemoryStore};
use scribe_engine::{Pipeline, PipelineHandle, SuggestionKind, TEXT_UPDATED_MESSAGE};
use scribe_providers::HttpCompletionProvider;
use scribe_providers::retry::RetryConfig;
use scribe_types::{ApiKey, Settings, default_custom_triggers};
use tokio::task::JoinHandle;
use wiremock::MockServer;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{
    MODEL, TestHosts, gemini_body, gemini_path, mount_gemini_error, mount_gemini_reply, wait_until,
};

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.provider.api_key = ApiKey::new("AIza-test");
    settings
}

fn memory_store(settings: Settings) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(settings, default_custom_triggers(), Vec::new()))
}

fn start(
    hosts: &TestHosts,
    store: Arc<dyn ConfigStore>,
    server: &MockServer,
) -> (PipelineHandle, JoinHandle<()>) {
    let provider = HttpCompletionProvider::new()
        .with_gemini_base(server.uri())
        .with_retry_config(RetryConfig::none());
    let pipeline = Pipeline::new(hosts.hosts(), store, Arc::new(provider));
    let handle = pipeline.handle();
    (handle, tokio::spawn(pipeline.run()))
}

#[tokio::test]
async fn custom_trigger_rewrites_field_through_gemini() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(gemini_path(MODEL)))
        .and(body_string_contains("i has a cat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body("I have a cat.")))
        .expect(1)
        .mount(&server)
        .await;
    let hosts = TestHosts::new();
    let (_handle, task) = start(&hosts, memory_store(settings()), &server);

    hosts.field.type_text("i has a cat @fixg");
    // Closing the event stream lets the in-flight completion land first.
    hosts.field.close();
    task.await.unwrap();

    assert_eq!(hosts.field.text(), "I have a cat.");
    assert!(hosts.notices.all().is_empty());
}

#[tokio::test]
async fn provider_rejection_is_shown_and_text_kept() {
    let server = MockServer::start().await;
    mount_gemini_error(&server, 401, "API key not valid").await;
    let hosts = TestHosts::new();
    let (_handle, task) = start(&hosts, memory_store(settings()), &server);

    hosts.field.type_text("teh cat @fixg");
    hosts.field.close();
    task.await.unwrap();

    assert_eq!(hosts.field.text(), "teh cat @fixg");
    assert_eq!(
        hosts.notices.last(),
        Some(("Scribe: API error 401: API key not valid".into(), true))
    );
}

#[tokio::test]
async fn missing_key_never_reaches_the_network() {
    let server = MockServer::start().await;
    mount_gemini_reply(&server, "unused").await;
    let hosts = TestHosts::new();
    let (_handle, task) = start(&hosts, memory_store(Settings::default()), &server);

    hosts.field.type_text("hello @fixg");
    hosts.field.close();
    task.await.unwrap();

    assert_eq!(
        hosts.notices.last(),
        Some(("Scribe: Please set your Gemini API key".into(), true))
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn tone_rewrite_choice_replaces_text() {
    let server = MockServer::start().await;
    mount_gemini_reply(&server, "- Please send the report.\n- \"Could you send the report?\"").await;
    let mut settings = settings();
    settings.tone_rewrite.enabled = true;
    let hosts = TestHosts::new();
    let (handle, task) = start(&hosts, memory_store(settings), &server);

    hosts.field.type_text("send report @tone");
    wait_until(|| hosts.screen.suggestions().is_some()).await;
    let list = hosts.screen.suggestions().unwrap();
    assert_eq!(list.kind, SuggestionKind::ToneRewrite);
    assert_eq!(list.items, vec!["Please send the report.", "Could you send the report?"]);

    handle.choose_suggestion(1);
    hosts.field.wait_for_text("Could you send the report?").await;
    assert!(hosts.screen.suggestions().is_none());

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test]
async fn selection_trigger_rewrites_only_the_selection() {
    let server = MockServer::start().await;
    mount_gemini_reply(&server, "earth").await;
    let mut settings = settings();
    settings.selection_menu.enabled = true;
    let hosts = TestHosts::new();
    let (handle, task) = start(&hosts, memory_store(settings), &server);

    hosts.field.type_text("Hello world");
    hosts.field.select(6, 11);
    wait_until(|| hosts.screen.selection_menu().is_some()).await;
    assert_eq!(hosts.screen.selection_menu().unwrap().selected, "world");

    handle.apply_selection_trigger("@fixg");
    wait_until(|| !hosts.notices.all().is_empty()).await;
    assert_eq!(hosts.field.text(), "Hello earth");
    assert_eq!(
        hosts.notices.last(),
        Some((format!("Scribe: {TEXT_UPDATED_MESSAGE}"), false))
    );

    handle.shutdown();
    task.await.unwrap();
}

#[tokio::test]
async fn undo_restores_text_after_http_round_trip() {
    let server = MockServer::start().await;
    mount_gemini_reply(&server, "Fixed text.").await;
    let mut settings = settings();
    settings.undo_redo.enabled = true;
    let hosts = TestHosts::new();
    let (handle, task) = start(&hosts, memory_store(settings), &server);

    hosts.field.type_text("fixd txt @fixg");
    wait_until(|| hosts.screen.undo_position().is_some()).await;
    assert_eq!(hosts.field.text(), "Fixed text.");
    assert_eq!(hosts.screen.undo_position(), Some((0, 150)));

    handle.undo();
    hosts.field.wait_for_text("fixd txt @fixg").await;
    handle.redo();
    hosts.field.wait_for_text("Fixed text.").await;

    handle.shutdown();
    task.await.unwrap();
    assert_eq!(hosts.screen.undo_position(), None);
}

#[tokio::test]
async fn in_text_toggle_and_undo_position_persist_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        "[provider]\napi_key = \"AIza-test\"\n\n[service]\napp_toggle_enabled = true\n",
    )
    .unwrap();
    let store = Arc::new(FileStore::open(&config).unwrap());
    let server = MockServer::start().await;
    let hosts = TestHosts::new();
    let (handle, task) = start(&hosts, store, &server);

    hosts.field.type_text("see you @off");
    handle.begin_undo_drag();
    handle.end_undo_drag(40, 220);
    hosts.field.close();
    task.await.unwrap();

    assert_eq!(hosts.field.text(), "see you");
    assert!(server.received_requests().await.unwrap().is_empty());

    let reopened = FileStore::open(&config).unwrap();
    let settings = reopened.settings().borrow().clone();
    assert!(!settings.service.app_active);
    assert_eq!((settings.undo_redo.x, settings.undo_redo.y), (40, 220));
    assert_eq!(settings.provider.api_key.expose_secret(), "AIza-test");
}
