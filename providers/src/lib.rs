//! Completion provider clients.
//!
//! The pipeline treats completion as opaque: a prompt goes in, trimmed text or
//! a [`ProviderError`] comes out. [`CompletionProvider`] is that seam, and
//! [`HttpCompletionProvider`] is the production implementation dispatching on
//! [`Provider`]:
//!
//! - [`gemini`] - Google Gemini `generateContent`
//! - [`custom`] - any OpenAI-compatible `chat/completions` endpoint
//!
//! Transport failures are retried inside the provider (see [`retry`]). There is
//! a connect timeout but no overall request timeout, so a hung server holds the
//! caller until the connection drops.

pub mod custom;
pub mod gemini;
pub mod retry;

use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;
use std::time::Duration;

use scribe_types::settings::DEFAULT_CUSTOM_API_URL;
use scribe_types::{Credentials, Provider};
use thiserror::Error;

use crate::retry::{RetryConfig, RetryOutcome, send_with_retry};

pub use scribe_types;

/// Canonical Gemini API host. Paths are appended per request.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API error {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("response contained no text")]
    EmptyResponse,
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("invalid endpoint {0}")]
    InvalidEndpoint(String),
}

/// Boxed future returned by [`CompletionProvider::complete`].
pub type CompletionFut<'a> = Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + 'a>>;

/// Opaque completion service.
///
/// Implementations return the generated text already trimmed.
pub trait CompletionProvider: Send + Sync {
    fn complete<'a>(&'a self, credentials: &'a Credentials, prompt: &'a str) -> CompletionFut<'a>;
}

pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        base_client_builder().build().unwrap_or_else(|e| {
            tracing::error!("Failed to build tuned HTTP client: {e}. Falling back to defaults.");
            reqwest::Client::new()
        })
    })
}

// Custom endpoints may be plain http on a LAN, so https is not enforced.
fn base_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// Send with retry and decode a 2xx body as JSON.
pub(crate) async fn send_json<F>(
    build_request: F,
    retry: &RetryConfig,
) -> Result<serde_json::Value, ProviderError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    match send_with_retry(build_request, retry).await {
        RetryOutcome::Success(response) => response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string())),
        RetryOutcome::HttpError(response) => {
            let status = response.status().as_u16();
            let body = read_capped_error_body(response).await;
            Err(ProviderError::Http { status, body })
        }
        RetryOutcome::Transport { attempts, source } => {
            Err(ProviderError::Transport { attempts, source })
        }
    }
}

/// Production provider: Gemini or an OpenAI-compatible endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCompletionProvider {
    client: reqwest::Client,
    gemini_base: String,
    retry: RetryConfig,
}

impl Default for HttpCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpCompletionProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: http_client().clone(),
            gemini_base: GEMINI_API_BASE_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }

    /// Point Gemini requests somewhere else (tests, proxies).
    #[must_use]
    pub fn with_gemini_base(mut self, base: impl Into<String>) -> Self {
        self.gemini_base = base.into();
        self
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn dispatch(&self, credentials: &Credentials, prompt: &str) -> Result<String, ProviderError> {
        let api_key = credentials.api_key().expose_secret();
        let model = credentials.model();
        tracing::debug!(
            provider = credentials.provider().as_str(),
            model,
            prompt_chars = prompt.chars().count(),
            "Sending completion request"
        );
        match credentials.provider() {
            Provider::Gemini => {
                let base = credentials.endpoint().unwrap_or(self.gemini_base.as_str());
                gemini::complete(&self.client, base, api_key, model, prompt, &self.retry).await
            }
            Provider::Custom => {
                let base = credentials.endpoint().unwrap_or(DEFAULT_CUSTOM_API_URL);
                custom::complete(&self.client, base, api_key, model, prompt, &self.retry).await
            }
        }
    }
}

impl CompletionProvider for HttpCompletionProvider {
    fn complete<'a>(&'a self, credentials: &'a Credentials, prompt: &'a str) -> CompletionFut<'a> {
        Box::pin(self.dispatch(credentials, prompt))
    }
}
