//! OpenAI-compatible chat completions provider.
//!
//! Works against any endpoint speaking the `/chat/completions` dialect.
//! OpenRouter is the default target.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use mentor_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// OpenRouter API base.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenAI API base.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Client for OpenAI-style chat completion APIs (OpenRouter, OpenAI).
pub struct OpenAiCompatClient {
    /// Provider label reported by `provider_name`
    provider: String,

    /// Base URL, without the `/chat/completions` suffix
    base_url: String,

    /// Bearer token
    api_key: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Create a client for OpenRouter.
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", OPENROUTER_BASE_URL, api_key)
    }

    /// Create a client for an arbitrary OpenAI-compatible endpoint.
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Base URL this client posts to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn to_chat_request<'a>(&self, request: &'a LlmRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }

    /// Convert a chat response, treating a null message content as empty text.
    fn convert_response(&self, request: &LlmRequest, response: ChatResponse) -> AppResult<LlmResponse> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            AppError::Llm(format!(
                "Malformed {} response: no choices returned",
                self.provider
            ))
        })?;

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            model: response.model.unwrap_or_else(|| request.model.clone()),
            usage,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatClient {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(provider = %self.provider, model = %request.model, "Sending chat completion request");

        let body = self.to_chat_request(request);
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::Llm(format!("Failed to send request to {}: {}", self.provider, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "{} API error ({}): {}",
                self.provider, status, error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            AppError::Llm(format!("Failed to parse {} response: {}", self.provider, e))
        })?;

        let converted = self.convert_response(request, chat_response)?;
        tracing::info!(
            completion_tokens = converted.usage.completion_tokens,
            "Received chat completion"
        );

        Ok(converted)
    }
}
