//! OpenAI-compatible embeddings provider (`POST /embeddings`).

use crate::embeddings::EmbeddingConfig;
use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use mentor_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Embeddings provider for OpenAI-style APIs.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    /// Create a provider. Hosted embeddings need an API key.
    pub fn new(config: &EmbeddingConfig, api_key: Option<&str>) -> AppResult<Self> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AppError::Embedding(
                    "OpenAI embedding provider requires an API key (set OPENAI_API_KEY or MENTOR_EMBEDDING_API_KEY)"
                        .to_string(),
                )
            })?;

        let base_url = config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::new(),
            base_url,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    /// Order vectors by their `index` and check their size.
    fn collect_vectors(&self, expected: usize, mut data: Vec<EmbeddingData>) -> AppResult<Vec<Vec<f32>>> {
        if data.len() != expected {
            return Err(AppError::Embedding(format!(
                "Embedding API returned {} vectors for {} inputs",
                data.len(),
                expected
            )));
        }

        data.sort_by_key(|d| d.index);

        data.into_iter()
            .map(|d| {
                if d.embedding.len() != self.dimensions {
                    Err(AppError::Embedding(format!(
                        "Model '{}' returned {} dimensions, expected {}",
                        self.model,
                        d.embedding.len(),
                        self.dimensions
                    )))
                } else {
                    Ok(d.embedding)
                }
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        tracing::debug!(batch_size = texts.len(), model = %self.model, "Requesting embeddings");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send embedding request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Embedding(format!(
                "Embedding API error ({}): {}",
                status, error_text
            )));
        }

        let body: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse embedding response: {}", e)))?;

        self.collect_vectors(texts.len(), body.data)
    }
}
