//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{OllamaProvider, OpenAiProvider, TrigramProvider};
use mentor_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
///
/// HTTP providers are checked once here; a provider whose reported
/// dimensions differ from the configuration is rejected.
pub async fn create_provider(
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if config.dimensions == 0 {
        return Err(AppError::Embedding(
            "Embedding dimensions must be greater than zero".to_string(),
        ));
    }

    let provider: Arc<dyn EmbeddingProvider> = match config.provider.as_str() {
        "trigram" => Arc::new(TrigramProvider::from_config(config)?),

        "ollama" => Arc::new(OllamaProvider::new(config).await?),

        "openai" => Arc::new(OpenAiProvider::new(config, api_key)?),

        _ => {
            return Err(AppError::Embedding(format!(
                "Unknown embedding provider: '{}'. Supported providers: trigram, ollama, openai",
                config.provider
            )))
        }
    };

    if provider.dimensions() != config.dimensions {
        return Err(AppError::Embedding(format!(
            "Provider '{}' reports {} dimensions, configuration expects {}",
            provider.provider_name(),
            provider.dimensions(),
            config.dimensions
        )));
    }

    tracing::info!(
        provider = provider.provider_name(),
        model = provider.model_name(),
        dimensions = provider.dimensions(),
        "Embedding provider ready"
    );

    Ok(provider)
}
