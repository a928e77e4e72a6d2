//! Mentor CLI
//!
//! Main entry point for the mentor command-line tool.
//! Serves the multi-author RAG API, answers one-off questions locally and
//! builds the vector index from extracted book text.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, IndexCommand, ServeCommand};
use mentor_core::{config::AppConfig, logging};
use std::path::PathBuf;

/// Mentor - multi-author RAG question answering
#[derive(Parser, Debug)]
#[command(name = "mentor")]
#[command(about = "Multi-author RAG mentor: HTTP API, one-shot ask and index builder", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (default: ./mentor.yaml when present)
    #[arg(short, long, global = true, env = "MENTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Vector index directory
    #[arg(long, global = true)]
    index_path: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize the RAG pipeline and serve the HTTP API
    Serve(ServeCommand),

    /// Ask a single question from the command line
    Ask(AskCommand),

    /// Build or inspect the vector index
    Index(IndexCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration file and environment
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    let bind = match &cli.command {
        Commands::Serve(cmd) => cmd.bind.clone(),
        _ => None,
    };
    let config = config.with_overrides(
        cli.index_path,
        bind,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(
        config.logging.level.as_deref(),
        config.logging.no_color,
        config.logging.format,
    )
    .context("Failed to initialize logging")?;

    tracing::info!("Mentor CLI starting");
    tracing::info!("LLM API key: {}", logging::mask_secret(config.llm.api_key.as_deref()));
    tracing::info!(
        "Embedding model: {} ({}, {} dims)",
        config.embedding.model,
        config.embedding.provider,
        config.embedding.dimensions
    );
    tracing::info!("LLM model: {} ({})", config.llm.model, config.llm.provider);
    tracing::info!("Index path: {:?}", config.index_path);
    if let Some(file) = &config.config_file {
        tracing::debug!("Config file: {:?}", file);
    }

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Ask(_) => "ask",
        Commands::Index(_) => "index",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match &cli.command {
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Index(cmd) => cmd.execute(&config).await,
    };

    // Log completion
    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result.with_context(|| format!("mentor {} failed", command_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_index_build() {
        let cli = Cli::parse_from([
            "mentor",
            "index",
            "build",
            "--sources",
            "pdf_sources",
            "--chunk-size",
            "800",
        ]);
        match cli.command {
            Commands::Index(IndexCommand {
                action: commands::index::IndexAction::Build(build),
            }) => {
                assert_eq!(build.sources, PathBuf::from("pdf_sources"));
                assert_eq!(build.chunk_size, 800);
                assert_eq!(build.chunk_overlap, 200);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_ask_with_global_flags() {
        let cli = Cli::parse_from(["mentor", "ask", "Como liderar?", "--json", "--index-path", "idx"]);
        assert_eq!(cli.index_path, Some(PathBuf::from("idx")));
        match cli.command {
            Commands::Ask(ask) => {
                assert_eq!(ask.query, "Como liderar?");
                assert!(ask.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
