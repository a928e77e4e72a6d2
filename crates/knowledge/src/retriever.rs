//! Top-k retrieval over a loaded vector index.

use crate::types::ScoredChunk;
use crate::vector_index::VectorIndex;
use mentor_core::{AppError, AppResult};
use std::sync::Arc;

/// Number of chunks handed to the synthesizer by default.
pub const DEFAULT_TOP_K: usize = 5;

/// Retrieves the chunks most similar to a query vector.
#[derive(Debug, Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self {
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Set the default number of chunks returned by [`Retriever::retrieve_top`].
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Return up to `k` chunks ordered by descending similarity.
    ///
    /// Fewer than `k` chunks are returned only when the index holds fewer.
    ///
    /// # Errors
    /// * `AppError::Index` - If the query vector dimension differs from the index
    pub fn retrieve(&self, query_vector: &[f32], k: usize) -> AppResult<Vec<ScoredChunk>> {
        if query_vector.len() != self.index.dimensions() {
            return Err(AppError::Index(format!(
                "Query vector has {} dimensions, index expects {}",
                query_vector.len(),
                self.index.dimensions()
            )));
        }

        let results = self.index.search(query_vector, k)?;

        if let Some(best) = results.first() {
            tracing::debug!(
                requested = k,
                returned = results.len(),
                top_score = best.score,
                "Retrieved chunks"
            );
        } else {
            tracing::debug!(requested = k, "Index returned no chunks");
        }

        Ok(results)
    }

    /// Retrieve with the configured `top_k`.
    pub fn retrieve_top(&self, query_vector: &[f32]) -> AppResult<Vec<ScoredChunk>> {
        self.retrieve(query_vector, self.top_k)
    }
}
