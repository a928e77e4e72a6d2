//! Ask command handler.
//!
//! Runs one question through a locally initialized pipeline.

use clap::Args;
use mentor_core::{config::AppConfig, AppError, AppResult};
use mentor_knowledge::{Answer, PipelineStatus, RagPipeline, SourceDocument};

/// Ask the mentor a question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        config.validate()?;

        let pipeline = RagPipeline::new(config.clone());
        if let PipelineStatus::Failed(failure) = pipeline.initialize().await {
            return Err(AppError::Other(format!(
                "RAG pipeline failed to initialize: {}",
                failure
            )));
        }

        let answer = pipeline
            .ask(&self.query)
            .await
            .map_err(|e| AppError::Other(e.to_string()))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&answer)?);
        } else {
            print_answer(&answer);
        }

        Ok(())
    }
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.answer);
    println!();

    if answer.sources.is_empty() {
        println!("Sources: (no sources available)");
        return;
    }

    println!("Sources:");
    for (i, source) in answer.sources.iter().enumerate() {
        println!("  {}. {}", i + 1, describe_source(source));
    }
}

fn describe_source(source: &SourceDocument) -> String {
    let title = source.book_title.as_deref().unwrap_or("(sem título)");
    let mut line = match source.author.as_deref() {
        Some(author) => format!("{} ({})", title, author),
        None => title.to_string(),
    };
    if !source.page.is_none() {
        line.push_str(&format!(", p. {}", source.page));
    }
    line
}
