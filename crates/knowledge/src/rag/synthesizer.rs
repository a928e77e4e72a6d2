//! Answer synthesis.
//!
//! Renders the mentor prompt over the retrieved chunks and sends it to the
//! configured LLM as a single user message.

use crate::types::ScoredChunk;
use mentor_core::{AppConfig, AppError, AppResult};
use mentor_llm::{create_client, LlmClient, LlmRequest};
use mentor_prompt::{build_prompt, load_answer_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Default completion length limit.
pub const DEFAULT_MAX_TOKENS: u32 = 1500;

/// Turns a query and its retrieved chunks into answer text.
#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    /// Generate the answer text.
    ///
    /// Called even when `chunks` is empty.
    async fn synthesize(&self, query: &str, chunks: &[ScoredChunk]) -> AppResult<String>;
}

/// LLM-backed synthesizer using the mentor persona prompt.
pub struct AnswerSynthesizer {
    client: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for AnswerSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerSynthesizer")
            .field("provider", &self.client.provider_name())
            .field("prompt", &self.prompt.id)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AnswerSynthesizer {
    pub fn new(client: Arc<dyn LlmClient>, prompt: PromptDefinition, model: impl Into<String>) -> Self {
        Self {
            client,
            prompt,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Build a synthesizer from application configuration.
    ///
    /// # Errors
    /// * `AppError::Config` - Unknown provider, empty model, or missing API key
    /// * `AppError::Prompt` - The prompt file is unreadable or invalid
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate_llm()?;

        let client = create_client(
            &config.llm.provider,
            config.llm.endpoint.as_deref(),
            config.llm.api_key.as_deref(),
        )?;
        let prompt = load_answer_prompt(config.prompt.file.as_deref())?;

        tracing::debug!(
            provider = %config.llm.provider,
            model = %config.llm.model,
            prompt = %prompt.id,
            "Answer synthesizer configured"
        );

        Ok(Self::new(client, prompt, config.llm.model.clone())
            .with_temperature(config.llm.temperature)
            .with_max_tokens(config.llm.max_tokens))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Render the full prompt for a query.
    pub fn render(&self, query: &str, chunks: &[ScoredChunk]) -> AppResult<String> {
        let mut variables = HashMap::new();
        variables.insert("context".to_string(), build_context(chunks));
        variables.insert("question".to_string(), query.to_string());

        Ok(build_prompt(&self.prompt, &variables)?.user)
    }
}

#[async_trait::async_trait]
impl Synthesizer for AnswerSynthesizer {
    async fn synthesize(&self, query: &str, chunks: &[ScoredChunk]) -> AppResult<String> {
        let prompt = self.render(query, chunks)?;

        let request = LlmRequest::new(prompt, self.model.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        tracing::debug!(
            provider = self.client.provider_name(),
            model = %self.model,
            chunks = chunks.len(),
            "Generating answer"
        );

        let response = self
            .client
            .complete(&request)
            .await
            .map_err(|e| match e {
                AppError::Llm(_) => e,
                other => AppError::Llm(other.to_string()),
            })?;

        Ok(response.content)
    }
}

/// Join chunk contents with a blank line, keeping rank order.
pub fn build_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
