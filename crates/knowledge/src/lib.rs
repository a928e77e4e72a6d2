//! Knowledge base and RAG pipeline for the mentor service.
//!
//! - [`builder`] turns extracted book text into an on-disk vector index
//! - [`vector_index`] loads and searches that index
//! - [`retriever`] picks the top-k chunks for a query vector
//! - [`rag`] wires embedding, retrieval and answer synthesis together

pub mod builder;
pub mod embeddings;
pub mod parser;
pub mod progress;
pub mod rag;
pub mod retriever;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use builder::{BookMetadata, BuildOptions, BuildReport, Catalog, IndexBuilder};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use progress::{BuildPhase, ProgressEvent, ProgressReporter};
pub use rag::{
    Answer, AnswerSynthesizer, AskError, InitFailure, InternalCause, PipelineStatus, RagPipeline,
    ReadyPipeline, SourceDocument, Synthesizer,
};
pub use retriever::Retriever;
pub use types::{Chunk, IndexedVector, PageRef, ScoredChunk};
pub use vector_index::{read_docstore, Docstore, EmbeddingBinding, LoadFailure, VectorIndex};
