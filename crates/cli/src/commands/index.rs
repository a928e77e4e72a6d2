//! Index command handler.
//!
//! Builds and inspects the on-disk vector index.

use clap::{Args, Subcommand};
use mentor_core::{config::AppConfig, AppResult};
use mentor_knowledge::builder::{DEFAULT_CATALOG_FILE, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use mentor_knowledge::vector_index::{DOCSTORE_FILE, VECTORS_FILE};
use mentor_knowledge::{
    create_provider, read_docstore, BuildOptions, Catalog, EmbeddingConfig, IndexBuilder,
    ProgressReporter,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Vector index management
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Build an index from extracted book text
    Build(IndexBuildCommand),
    /// Show index statistics
    Stats(IndexStatsCommand),
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            IndexAction::Build(cmd) => cmd.execute(config).await,
            IndexAction::Stats(cmd) => cmd.execute(config),
        }
    }
}

/// Build an index
#[derive(Args, Debug)]
pub struct IndexBuildCommand {
    /// Directory of .txt / .md books (form feed separates pages)
    #[arg(long)]
    pub sources: PathBuf,

    /// JSON catalog mapping file names to author and book_title
    #[arg(long, default_value = DEFAULT_CATALOG_FILE)]
    pub metadata: PathBuf,

    /// Index directory to write (default: configured index path)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum chunk size in characters
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
    pub chunk_overlap: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexBuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index build command");

        let embedding_config = EmbeddingConfig::from(&config.embedding);
        let embedder =
            create_provider(&embedding_config, config.embedding.api_key.as_deref()).await?;

        let progress = if self.json {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event| eprintln!("{}", event.format_simple())))
        };

        let builder = IndexBuilder::new(embedder)
            .with_chunking(self.chunk_size, self.chunk_overlap)
            .with_batch_size(embedding_config.batch_size)
            .with_progress(progress);

        let options = BuildOptions {
            sources: self.sources.clone(),
            catalog: Catalog::load(&self.metadata)?,
            output: self
                .output
                .clone()
                .unwrap_or_else(|| config.index_path.clone()),
        };

        let report = builder.build(&options).await?;

        if self.json {
            let output = serde_json::json!({
                "output": report.output,
                "filesIndexed": report.files_indexed,
                "filesSkipped": report.files_skipped,
                "chunks": report.chunks,
                "elapsedSecs": report.elapsed.as_secs_f64(),
                "sizeMb": report.size_mb(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Indexed {} chunks from {} files ({} skipped) in {:.2}s",
                report.chunks,
                report.files_indexed,
                report.files_skipped,
                report.elapsed.as_secs_f64()
            );
            println!(
                "Index written to {} ({:.2} MB)",
                report.output.display(),
                report.size_mb()
            );
        }

        Ok(())
    }
}

/// Show index statistics
#[derive(Args, Debug)]
pub struct IndexStatsCommand {
    /// Index directory (default: configured index path)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexStatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let dir = self.path.clone().unwrap_or_else(|| config.index_path.clone());
        tracing::info!("Reading index stats from {:?}", dir);

        let docstore = read_docstore(&dir.join(DOCSTORE_FILE))?;
        let books: BTreeSet<&str> = docstore
            .chunks
            .iter()
            .filter_map(|c| c.book_title.as_deref())
            .collect();
        let size_bytes = artifact_size(&dir);

        if self.json {
            let output = serde_json::json!({
                "path": dir,
                "chunks": docstore.chunks.len(),
                "books": books.len(),
                "embedding": docstore.embedding,
                "createdAt": docstore.created_at,
                "sizeBytes": size_bytes,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Index: {}", dir.display());
            println!("  Chunks:     {}", docstore.chunks.len());
            println!("  Books:      {}", books.len());
            println!(
                "  Embedding:  {} / {} ({} dims)",
                docstore.embedding.provider, docstore.embedding.model, docstore.embedding.dimensions
            );
            println!("  Created at: {}", docstore.created_at.to_rfc3339());
            println!("  Size:       {} bytes", size_bytes);
        }

        Ok(())
    }
}

fn artifact_size(dir: &Path) -> u64 {
    [VECTORS_FILE, DOCSTORE_FILE]
        .iter()
        .filter_map(|name| std::fs::metadata(dir.join(name)).ok())
        .map(|m| m.len())
        .sum()
}
