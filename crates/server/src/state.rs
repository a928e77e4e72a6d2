//! Shared handler state.

use mentor_knowledge::RagPipeline;
use std::sync::Arc;

/// State cloned into every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self { pipeline }
    }
}
