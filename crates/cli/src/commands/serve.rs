//! Serve command handler.

use clap::Args;
use mentor_core::{config::AppConfig, AppResult};
use mentor_knowledge::RagPipeline;
use std::sync::Arc;

/// Initialize the RAG pipeline and serve the HTTP API
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Socket address to bind (default: 0.0.0.0:8000)
    #[arg(short, long, env = "MENTOR_BIND")]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing serve command");

        let pipeline = Arc::new(RagPipeline::new(config.clone()));
        let status = pipeline.initialize().await;

        if !status.is_ready() {
            tracing::warn!(
                "Serving with RAG pipeline {}; /api/v1/chat/ask will answer 503",
                status
            );
        }

        mentor_server::serve(&config.server.bind, pipeline).await
    }
}
