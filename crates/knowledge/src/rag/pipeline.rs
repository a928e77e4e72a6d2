//! RAG pipeline orchestration.
//!
//! The pipeline owns its state behind an `Arc` swap: `initialize` builds a
//! complete replacement without holding the lock, then publishes it in one
//! pointer swap. Queries clone the current `Arc` and never block
//! initialization.

use crate::embeddings::{create_provider, EmbeddingConfig};
use crate::rag::synthesizer::{AnswerSynthesizer, Synthesizer};
use crate::rag::types::{Answer, AskError, InitFailure, InternalCause, PipelineStatus, SourceDocument};
use crate::retriever::Retriever;
use crate::vector_index::{LoadFailure, VectorIndex};
use mentor_core::AppConfig;
use parking_lot::RwLock;
use std::sync::Arc;

/// Fully built components answering queries.
#[derive(Clone)]
pub struct ReadyPipeline {
    retriever: Retriever,
    synthesizer: Arc<dyn Synthesizer>,
}

impl std::fmt::Debug for ReadyPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadyPipeline")
            .field("retriever", &self.retriever)
            .finish_non_exhaustive()
    }
}

impl ReadyPipeline {
    pub fn new(index: Arc<VectorIndex>, synthesizer: Arc<dyn Synthesizer>, top_k: usize) -> Self {
        Self {
            retriever: Retriever::new(index).with_top_k(top_k),
            synthesizer,
        }
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        self.retriever.index()
    }

    async fn ask(&self, query: &str) -> Result<Answer, AskError> {
        if query.trim().is_empty() {
            return Err(AskError::EmptyQuery);
        }

        tracing::info!("Processing query: '{}'", query);

        let query_vector = self
            .index()
            .embedder()
            .embed(query)
            .await
            .map_err(|e| {
                tracing::error!("Failed to embed query: {}", e);
                AskError::internal(InternalCause::Embedding, e)
            })?;

        let chunks = self.retriever.retrieve_top(&query_vector).map_err(|e| {
            tracing::error!("Failed to retrieve chunks: {}", e);
            AskError::internal(InternalCause::Retrieval, e)
        })?;

        let answer = self
            .synthesizer
            .synthesize(query, &chunks)
            .await
            .map_err(|e| {
                tracing::error!("Failed to generate answer: {}", e);
                AskError::internal(InternalCause::Backend, e)
            })?;

        tracing::info!("Answer generated from {} source chunks", chunks.len());

        Ok(Answer {
            answer,
            sources: chunks.iter().map(|c| SourceDocument::from(&c.chunk)).collect(),
        })
    }
}

enum PipelineState {
    Uninitialized,
    Ready(ReadyPipeline),
    Failed(InitFailure),
}

impl PipelineState {
    fn status(&self) -> PipelineStatus {
        match self {
            Self::Uninitialized => PipelineStatus::Uninitialized,
            Self::Ready(ready) => PipelineStatus::Ready {
                chunks: ready.index().len(),
            },
            Self::Failed(failure) => PipelineStatus::Failed(failure.clone()),
        }
    }
}

/// Question answering over a vector index.
pub struct RagPipeline {
    config: AppConfig,
    state: RwLock<Arc<PipelineState>>,
}

impl std::fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline")
            .field("index_path", &self.config.index_path)
            .field("status", &self.status())
            .finish()
    }
}

impl RagPipeline {
    /// Create an uninitialized pipeline.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            state: RwLock::new(Arc::new(PipelineState::Uninitialized)),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build every component from configuration and publish the result.
    ///
    /// Never fails: a failure is logged and published as
    /// [`PipelineStatus::Failed`], replacing any previous state.
    pub async fn initialize(&self) -> PipelineStatus {
        tracing::info!("Initializing RAG pipeline");

        let state = match self.build().await {
            Ok(ready) => {
                tracing::info!(
                    chunks = ready.index().len(),
                    "RAG pipeline initialized"
                );
                PipelineState::Ready(ready)
            }
            Err(failure) => {
                tracing::error!(kind = failure.kind(), "RAG pipeline initialization failed: {}", failure);
                PipelineState::Failed(failure)
            }
        };

        self.publish(state)
    }

    /// Publish components built by the caller.
    pub fn install(&self, ready: ReadyPipeline) -> PipelineStatus {
        self.publish(PipelineState::Ready(ready))
    }

    /// Snapshot of the current state.
    pub fn status(&self) -> PipelineStatus {
        self.state.read().status()
    }

    /// Answer a question.
    pub async fn ask(&self, query: &str) -> Result<Answer, AskError> {
        let state = self.state.read().clone();

        match state.as_ref() {
            PipelineState::Ready(ready) => ready.ask(query).await,
            _ => {
                tracing::error!("Query received while RAG pipeline is not ready");
                Err(AskError::NotInitialized)
            }
        }
    }

    fn publish(&self, state: PipelineState) -> PipelineStatus {
        let status = state.status();
        *self.state.write() = Arc::new(state);
        status
    }

    async fn build(&self) -> Result<ReadyPipeline, InitFailure> {
        self.config
            .validate_embedding()
            .and_then(|_| self.config.validate_retrieval())
            .map_err(|e| InitFailure::InvalidConfiguration(e.to_string()))?;

        let embedding_config = EmbeddingConfig::from(&self.config.embedding);
        tracing::info!(
            provider = %embedding_config.provider,
            model = %embedding_config.model,
            "Loading embedding model"
        );
        let embedder = create_provider(&embedding_config, self.config.embedding.api_key.as_deref())
            .await
            .map_err(|e| InitFailure::EmbeddingLoadFailure(e.to_string()))?;

        let dir = &self.config.index_path;
        tracing::info!("Loading vector index from {:?}", dir);
        let index = VectorIndex::load(dir, embedder).map_err(|failure| match failure {
            LoadFailure::MissingArtifacts { missing } => InitFailure::MissingIndexArtifacts {
                dir: dir.clone(),
                missing,
            },
            other => InitFailure::IndexLoadFailure(other.to_string()),
        })?;

        let synthesizer = AnswerSynthesizer::from_config(&self.config)
            .map_err(|e| InitFailure::LlmConfiguration(e.to_string()))?;

        Ok(ReadyPipeline::new(
            Arc::new(index),
            Arc::new(synthesizer),
            self.config.retrieval.top_k,
        ))
    }
}
