//! LLM provider factory.
//!
//! This module creates LLM clients from the configured provider name,
//! endpoint and API key.

use crate::client::LlmClient;
use crate::providers::ollama::DEFAULT_OLLAMA_URL;
use crate::providers::openai::{OPENAI_BASE_URL, OPENROUTER_BASE_URL};
use crate::providers::{OllamaClient, OpenAiCompatClient};
use crate::types::ProviderType;
use mentor_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openrouter", "openai", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key (required for hosted providers)
///
/// # Errors
/// Returns `AppError::Config` if:
/// - Provider is unknown
/// - A hosted provider has no API key
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider).ok_or_else(|| {
        AppError::Config(format!(
            "Unknown LLM provider: {}. Supported: openrouter, openai, ollama",
            provider
        ))
    })?;

    let api_key = api_key.map(str::trim).filter(|k| !k.is_empty());

    let client: Arc<dyn LlmClient> = match (provider_type, api_key) {
        (ProviderType::Ollama, _) => {
            Arc::new(OllamaClient::with_base_url(endpoint.unwrap_or(DEFAULT_OLLAMA_URL)))
        }
        (ProviderType::OpenRouter, Some(key)) => Arc::new(OpenAiCompatClient::new(
            "openrouter",
            endpoint.unwrap_or(OPENROUTER_BASE_URL),
            key,
        )),
        (ProviderType::OpenAI, Some(key)) => Arc::new(OpenAiCompatClient::new(
            "openai",
            endpoint.unwrap_or(OPENAI_BASE_URL),
            key,
        )),
        (other, None) => {
            return Err(AppError::Config(format!(
                "{} provider requires API key",
                other.as_str()
            )))
        }
    };

    tracing::debug!(provider = client.provider_name(), "Created LLM client");
    Ok(client)
}
