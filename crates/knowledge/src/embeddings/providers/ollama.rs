//! Ollama Embedding Provider
//!
//! Provides semantic embeddings via Ollama's local API using models like nomic-embed-text.
//!
//! The connection is verified once when the provider is created, with a short
//! retry loop. Embedding calls made afterwards are not retried.
//!
//! # Example
//! ```no_run
//! use mentor_knowledge::embeddings::{EmbeddingConfig, EmbeddingProvider};
//! use mentor_knowledge::embeddings::providers::OllamaProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EmbeddingConfig {
//!     provider: "ollama".to_string(),
//!     model: "nomic-embed-text".to_string(),
//!     dimensions: 768,
//!     ..Default::default()
//! };
//!
//! let provider = OllamaProvider::new(&config).await?;
//! let embedding = provider.embed("Olá mundo").await?;
//! assert_eq!(embedding.len(), 768);
//! # Ok(())
//! # }
//! ```

use crate::embeddings::EmbeddingConfig;
use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use mentor_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Ollama API endpoint for embeddings
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Maximum attempts for the load-time connection check
const MAX_CONNECT_ATTEMPTS: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Ollama embedding provider using local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// HTTP client for API requests
    client: Client,
    /// Ollama API base URL
    base_url: String,
    /// Model name (e.g., "nomic-embed-text")
    model: String,
    /// Expected embedding dimensions
    dimensions: usize,
}

/// Request payload for Ollama embeddings API
#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response from Ollama embeddings API
#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Error response from Ollama API
#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider and verify that Ollama serves the model.
    ///
    /// # Errors
    /// * `AppError::Embedding` - If Ollama is not reachable or the model
    ///   returns vectors of the wrong size
    pub async fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let provider = Self::connect(config);
        provider.verify_connection().await?;
        Ok(provider)
    }

    /// Create a provider without contacting Ollama.
    ///
    /// The base URL comes from the config endpoint, then `OLLAMA_URL`, then
    /// the local default.
    pub fn connect(config: &EmbeddingConfig) -> Self {
        let base_url = config
            .endpoint
            .clone()
            .or_else(|| std::env::var("OLLAMA_URL").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        }
    }

    /// Verify Ollama connection and model availability
    #[instrument(skip(self), fields(model = %self.model))]
    async fn verify_connection(&self) -> AppResult<()> {
        debug!("Verifying Ollama connection at {}", self.base_url);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.embed_single("test connection").await {
                Ok(_) => {
                    debug!("Ollama connection verified, model '{}' ready", self.model);
                    return Ok(());
                }
                Err(e) if attempt < MAX_CONNECT_ATTEMPTS => {
                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Ollama check failed (attempt {}/{}): {}. Retrying in {}ms",
                        attempt, MAX_CONNECT_ATTEMPTS, e, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => {
                    error!("Failed to connect to Ollama: {}", e);
                    return Err(AppError::Embedding(format!(
                        "Ollama not available at {} ({}). Ensure Ollama is running and model '{}' is installed. Run: ollama pull {}",
                        self.base_url, e, self.model, self.model
                    )));
                }
            }
        }
    }

    /// Embed single text (no retries)
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to Ollama: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let detail = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|r| r.error)
                .unwrap_or(error_text);

            return Err(AppError::Embedding(format!(
                "Ollama API error ({}): {}",
                status, detail
            )));
        }

        let response_body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        if response_body.embedding.len() != self.dimensions {
            return Err(AppError::Embedding(format!(
                "Ollama model '{}' returned {} dimensions, expected {}",
                self.model,
                response_body.embedding.len(),
                self.dimensions
            )));
        }

        Ok(response_body.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        // Ollama's embeddings endpoint takes one prompt per request
        let mut embeddings = Vec::with_capacity(texts.len());

        for (i, text) in texts.iter().enumerate() {
            if text.trim().is_empty() {
                warn!("Empty text at index {}, using zero vector", i);
                embeddings.push(vec![0.0; self.dimensions]);
                continue;
            }

            embeddings.push(self.embed_single(text).await?);
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
