//! OpenAI-compatible `chat/completions` client for user-supplied endpoints.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::retry::RetryConfig;
use crate::{ProviderError, send_json};

/// Output cap sent with every request.
pub const MAX_TOKENS: u32 = 1000;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// `{base}/chat/completions`, whatever the base's trailing slash.
pub(crate) fn endpoint(base: &str) -> Result<Url, ProviderError> {
    let base = base.trim();
    let normalized = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    };
    Url::parse(&normalized)
        .and_then(|url| url.join("chat/completions"))
        .map_err(|e| ProviderError::InvalidEndpoint(format!("{base}: {e}")))
}

fn extract_text(response: ChatResponse) -> Option<String> {
    let content = response.choices.into_iter().next()?.message?.content?;
    let trimmed = content.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub(crate) async fn complete(
    client: &reqwest::Client,
    base: &str,
    api_key: &str,
    model: &str,
    prompt: &str,
    retry: &RetryConfig,
) -> Result<String, ProviderError> {
    let url = endpoint(base)?;
    let body = ChatRequest {
        model,
        messages: [ChatMessage {
            role: "user",
            content: prompt,
        }],
        max_tokens: MAX_TOKENS,
    };

    let response = send_json(
        || {
            client
                .post(url.clone())
                .bearer_auth(api_key)
                .header("content-type", "application/json")
                .json(&body)
        },
        retry,
    )
    .await?;

    let parsed: ChatResponse =
        serde_json::from_value(response).map_err(|e| ProviderError::Decode(e.to_string()))?;
    extract_text(parsed).ok_or(ProviderError::EmptyResponse)
}
