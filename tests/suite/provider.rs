//! HTTP provider tests against a local mock server.

use std::time::Duration;

use scribe_providers::retry::RetryConfig;
use scribe_providers::{CompletionProvider, HttpCompletionProvider, ProviderError};
use scribe_types::settings::ProviderSettings;
use scribe_types::{ApiKey, Credentials, Provider};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{MODEL, chat_body, gemini_body, gemini_path, mount_gemini_error};

fn gemini_credentials() -> Credentials {
    let settings = ProviderSettings {
        api_key: ApiKey::new("AIza-test"),
        ..ProviderSettings::default()
    };
    settings.credentials().unwrap()
}

fn custom_credentials(base: &str) -> Credentials {
    let settings = ProviderSettings {
        kind: Provider::Custom,
        custom_api_url: base.to_string(),
        custom_api_key: ApiKey::new("sk-local"),
        custom_model: "llama3".into(),
        ..ProviderSettings::default()
    };
    settings.credentials().unwrap()
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        jitter_factor: 0.0,
    }
}

fn provider_for(server: &MockServer) -> HttpCompletionProvider {
    HttpCompletionProvider::new()
        .with_gemini_base(server.uri())
        .with_retry_config(RetryConfig::none())
}

#[tokio::test]
async fn gemini_sends_key_header_and_single_part() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(gemini_path(MODEL)))
        .and(header("x-goog-api-key", "AIza-test"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "Fix this" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body("  Fixed.\n")))
        .expect(1)
        .mount(&server)
        .await;

    let text = provider_for(&server)
        .complete(&gemini_credentials(), "Fix this")
        .await
        .unwrap();

    assert_eq!(text, "Fixed.");
}

#[tokio::test]
async fn gemini_without_candidates_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(gemini_path(MODEL)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .complete(&gemini_credentials(), "hi")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::EmptyResponse));
}

#[tokio::test]
async fn rejected_key_reports_status_and_body() {
    let server = MockServer::start().await;
    mount_gemini_error(&server, 401, "API key not valid").await;

    let err = provider_for(&server)
        .complete(&gemini_credentials(), "hi")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Http { status: 401, .. }));
    assert_eq!(err.to_string(), "API error 401: API key not valid");
}

#[tokio::test]
async fn server_errors_are_retried_before_giving_up() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(gemini_path(MODEL)))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(gemini_path(MODEL)))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body("ok")))
        .mount(&server)
        .await;

    let provider = HttpCompletionProvider::new()
        .with_gemini_base(server.uri())
        .with_retry_config(fast_retry());
    let text = provider.complete(&gemini_credentials(), "hi").await.unwrap();

    assert_eq!(text, "ok");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn custom_endpoint_speaks_chat_completions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-local"))
        .and(body_partial_json(json!({
            "model": "llama3",
            "max_tokens": 1000,
            "messages": [{ "role": "user", "content": "Say hi" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(" Hi! ")))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = custom_credentials(&format!("{}/v1", server.uri()));
    let text = provider_for(&server)
        .complete(&credentials, "Say hi")
        .await
        .unwrap();

    assert_eq!(text, "Hi!");
}

#[tokio::test]
async fn custom_endpoint_blank_content_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("   ")))
        .mount(&server)
        .await;

    let credentials = custom_credentials(&format!("{}/v1/", server.uri()));
    let err = provider_for(&server)
        .complete(&credentials, "Say hi")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::EmptyResponse));
}

#[tokio::test]
async fn custom_endpoint_must_be_a_url() {
    let credentials = custom_credentials("not a url");
    let err = HttpCompletionProvider::new()
        .with_retry_config(RetryConfig::none())
        .complete(&credentials, "Say hi")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::InvalidEndpoint(_)));
}
