//! HTTP model backends.
//!
//! Enum dispatch rather than a trait object, since async methods are not
//! dyn-compatible. Both backends share one send path; they differ only in
//! endpoint, auth headers, body layout and where the reply text lives.

use serde_json::{Value, json};

use crate::config::{BackendConfig, BackendType};
use crate::error::AdvisorError;

/// Upper bound on advisory length requested from the model.
const MAX_TOKENS: u32 = 256;

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System instructions.
    pub system: String,
    /// User message.
    pub user: String,
}

/// An HTTP model backend.
#[derive(Debug, Clone)]
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(HttpBackend),
    /// Anthropic Messages API.
    Anthropic(HttpBackend),
}

/// Connection details shared by both backend kinds.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl LlmBackend {
    /// Create a backend from configuration.
    pub fn new(config: &BackendConfig) -> Self {
        let http = HttpBackend {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        };
        match config.backend_type {
            BackendType::OpenAi => Self::OpenAi(http),
            BackendType::Anthropic => Self::Anthropic(http),
        }
    }

    /// Backend label for logs.
    pub const fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }

    const fn http(&self) -> &HttpBackend {
        match self {
            Self::OpenAi(http) | Self::Anthropic(http) => http,
        }
    }

    /// JSON pointer to the reply text in a successful response.
    const fn reply_pointer(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "/choices/0/message/content",
            Self::Anthropic(_) => "/content/0/text",
        }
    }

    fn request(&self, prompt: &Prompt) -> reqwest::RequestBuilder {
        let http = self.http();
        match self {
            Self::OpenAi(_) => http
                .client
                .post(format!("{}/chat/completions", http.api_url))
                .bearer_auth(&http.api_key)
                .json(&json!({
                    "model": http.model,
                    "messages": [
                        {"role": "system", "content": prompt.system},
                        {"role": "user", "content": prompt.user},
                    ],
                    "temperature": 0.7,
                    "max_tokens": MAX_TOKENS,
                })),
            Self::Anthropic(_) => http
                .client
                .post(format!("{}/messages", http.api_url))
                .header("x-api-key", &http.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&json!({
                    "model": http.model,
                    "max_tokens": MAX_TOKENS,
                    "system": prompt.system,
                    "messages": [{"role": "user", "content": prompt.user}],
                })),
        }
    }

    /// Send a prompt and return the reply text.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::Backend`] if the HTTP call fails, the status
    /// is not a success, or the response carries no text.
    pub async fn complete(&self, prompt: &Prompt) -> Result<String, AdvisorError> {
        let label = self.name();
        let response = self
            .request(prompt)
            .send()
            .await
            .map_err(|e| AdvisorError::Backend(format!("{label} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Backend(format!(
                "{label} returned {status}: {detail}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AdvisorError::Backend(format!("{label} sent malformed JSON: {e}")))?;
        self.reply_text(&body)
    }

    fn reply_text(&self, body: &Value) -> Result<String, AdvisorError> {
        let pointer = self.reply_pointer();
        body.pointer(pointer)
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .ok_or_else(|| {
                AdvisorError::Backend(format!("{} reply has no text at {pointer}", self.name()))
            })
    }
}
