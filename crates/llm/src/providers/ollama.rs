//! Ollama LLM provider implementation.
//!
//! This module provides integration with Ollama, a local LLM runtime.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use mentor_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Default local endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    options: OllamaOptions,
    stream: bool,
}

/// Sampling options nested under `options`.
#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama LLM client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with default settings.
    ///
    /// Default URL: http://localhost:11434
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_OLLAMA_URL)
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Convert LlmRequest to Ollama format.
    fn to_ollama_request(&self, request: &LlmRequest) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            stream: false,
        }
    }

    /// Convert Ollama response to LlmResponse.
    fn convert_response(&self, response: OllamaResponse) -> LlmResponse {
        let usage = LlmUsage::new(
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );

        LlmResponse {
            content: response.response.unwrap_or_default(),
            model: response.model,
            usage,
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Ollama");
        tracing::debug!(model = %request.model, prompt_chars = request.prompt.len(), "Ollama request");

        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        tracing::info!("Received completion from Ollama");

        Ok(self.convert_response(ollama_response))
    }
}
