//! RAG response and error types.

use crate::types::{Chunk, PageRef};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// A retrieved chunk as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub content: String,
    #[serde(default)]
    pub page: PageRef,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub book_title: Option<String>,
}

impl From<&Chunk> for SourceDocument {
    fn from(chunk: &Chunk) -> Self {
        Self {
            content: chunk.content.clone(),
            page: chunk.page.clone(),
            author: chunk.author.clone(),
            book_title: chunk.book_title.clone(),
        }
    }
}

/// Answer to one query.
///
/// `sources` are the chunks handed to the synthesizer, in rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<SourceDocument>,
}

/// Why the pipeline could not become ready.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitFailure {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Index artifacts missing in {}: {}", .dir.display(), join_paths(.missing))]
    MissingIndexArtifacts { dir: PathBuf, missing: Vec<PathBuf> },

    #[error("Failed to load embedding model: {0}")]
    EmbeddingLoadFailure(String),

    #[error("Failed to load vector index: {0}")]
    IndexLoadFailure(String),

    #[error("LLM configuration error: {0}")]
    LlmConfiguration(String),
}

impl InitFailure {
    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration(_) => "invalid_configuration",
            Self::MissingIndexArtifacts { .. } => "missing_index_artifacts",
            Self::EmbeddingLoadFailure(_) => "embedding_load_failure",
            Self::IndexLoadFailure(_) => "index_load_failure",
            Self::LlmConfiguration(_) => "llm_configuration",
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Stage of `ask` that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalCause {
    Embedding,
    Retrieval,
    /// LLM transport error, bad status, or malformed payload
    Backend,
}

impl InternalCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::Retrieval => "retrieval",
            Self::Backend => "backend",
        }
    }
}

/// Error returned by [`crate::rag::RagPipeline::ask`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AskError {
    #[error("Sistema RAG não inicializado corretamente. Verifique os logs do servidor.")]
    NotInitialized,

    #[error("A pergunta (query) não pode ser vazia.")]
    EmptyQuery,

    #[error("Ocorreu um erro interno ao processar sua solicitação: {message}")]
    Internal {
        cause: InternalCause,
        message: String,
    },
}

impl AskError {
    pub fn internal(cause: InternalCause, error: impl std::fmt::Display) -> Self {
        Self::Internal {
            cause,
            message: error.to_string(),
        }
    }
}

/// Snapshot of the pipeline state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStatus {
    Uninitialized,
    Ready { chunks: usize },
    Failed(InitFailure),
}

impl PipelineStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Short label for status endpoints.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready { .. } => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "not initialized"),
            Self::Ready { chunks } => write!(f, "ready ({} chunks)", chunks),
            Self::Failed(failure) => write!(f, "failed: {}", failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_document_from_chunk() {
        let chunk = Chunk::new("Trecho")
            .with_page(PageRef::Number(7))
            .with_author("A")
            .with_book_title("B")
            .with_source("b.txt");

        let doc = SourceDocument::from(&chunk);
        assert_eq!(doc.content, "Trecho");
        assert_eq!(doc.page, PageRef::Number(7));
        assert_eq!(doc.author.as_deref(), Some("A"));
        assert_eq!(doc.book_title.as_deref(), Some("B"));
    }

    #[test]
    fn test_source_document_json_shape() {
        let doc = SourceDocument::from(&Chunk::new("x"));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"content": "x", "page": null, "author": null, "book_title": null})
        );
    }

    #[test]
    fn test_ask_error_messages() {
        assert!(AskError::NotInitialized.to_string().contains("não inicializado"));
        assert_eq!(
            AskError::EmptyQuery.to_string(),
            "A pergunta (query) não pode ser vazia."
        );

        let err = AskError::internal(InternalCause::Backend, "LLM API error (500): boom");
        assert_eq!(
            err.to_string(),
            "Ocorreu um erro interno ao processar sua solicitação: LLM API error (500): boom"
        );
    }

    #[test]
    fn test_status_labels() {
        assert!(PipelineStatus::Ready { chunks: 0 }.is_ready());
        assert!(!PipelineStatus::Uninitialized.is_ready());

        let failed = PipelineStatus::Failed(InitFailure::LlmConfiguration("no key".to_string()));
        assert_eq!(failed.label(), "failed");
        assert_eq!(failed.to_string(), "failed: LLM configuration error: no key");
    }
}
