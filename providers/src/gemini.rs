//! Google Gemini `generateContent` client.

use serde_json::{Value, json};

use crate::retry::RetryConfig;
use crate::{ProviderError, send_json};

pub(crate) fn endpoint(base: &str, model: &str) -> String {
    format!(
        "{}/v1beta/models/{model}:generateContent",
        base.trim_end_matches('/')
    )
}

pub(crate) fn build_request_body(prompt: &str) -> Value {
    json!({
        "contents": [{
            "parts": [{ "text": prompt }]
        }]
    })
}

/// First candidate, first part, trimmed. `None` when absent or blank.
pub(crate) fn extract_text(response: &Value) -> Option<String> {
    let text = response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()?
        .trim();
    (!text.is_empty()).then(|| text.to_string())
}

pub(crate) async fn complete(
    client: &reqwest::Client,
    base: &str,
    api_key: &str,
    model: &str,
    prompt: &str,
    retry: &RetryConfig,
) -> Result<String, ProviderError> {
    let url = endpoint(base, model);
    let body = build_request_body(prompt);

    let response = send_json(
        || {
            client
                .post(&url)
                .header("x-goog-api-key", api_key)
                .header("content-type", "application/json")
                .json(&body)
        },
        retry,
    )
    .await?;

    extract_text(&response).ok_or(ProviderError::EmptyResponse)
}
