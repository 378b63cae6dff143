//! Anthropic Messages API client.

use std::future::Future;
use std::time::Duration;

use mintel_core::LlmSettings;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Error bodies are cut to this many characters before they reach logs or
/// `error_message`.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// One model completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub stop_reason: Option<String>,
}

impl Completion {
    /// The model stopped because it ran out of tokens.
    #[must_use]
    pub fn hit_token_limit(&self) -> bool {
        self.stop_reason.as_deref() == Some("max_tokens")
    }
}

/// A text-completion backend.
pub trait CompletionClient: Send + Sync {
    fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
    ) -> impl Future<Output = Result<Completion, LlmError>> + Send;
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicClient {
    client: Client,
    api_key: String,
    messages_url: Url,
    model: String,
    temperature: f32,
}

impl AnthropicClient {
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] when no key is configured.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        Self::with_base_url(settings, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// As [`AnthropicClient::from_settings`], plus
    /// [`LlmError::InvalidBaseUrl`].
    pub fn with_base_url(settings: &LlmSettings, base_url: &str) -> Result<Self, LlmError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(LlmError::MissingApiKey("ANTHROPIC_API_KEY"))?;

        let invalid = |reason: String| LlmError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason,
        };
        let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .map_err(|e| invalid(e.to_string()))?;
        let messages_url = base.join("v1/messages").map_err(|e| invalid(e.to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            messages_url,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }
}

impl CompletionClient for AnthropicClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion, LlmError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            temperature: self.temperature,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.messages_url.clone())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        let text = parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyCompletion)?;

        Ok(Completion {
            text,
            stop_reason: parsed.stop_reason,
        })
    }
}
