//! Error types for the Mentor RAG service.
//!
//! This module defines a unified error enum that covers all error categories
//! in the service: configuration, I/O, LLM backend, embeddings, vector index,
//! prompt rendering, and serialization.

use thiserror::Error;

/// Unified error type for the Mentor RAG service.
///
/// Library functions return `Result<T, AppError>`. Domain-specific failures
/// (index loading, pipeline initialization, query answering) have their own
/// enums in `mentor-knowledge` and wrap this one where needed.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM backend errors (transport, status, malformed payload)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index errors
    #[error("Index error: {0}")]
    Index(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
