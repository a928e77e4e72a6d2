//! Offline index builder.
//!
//! Walks a directory of extracted book text, attaches author and title from
//! a JSON catalog, splits pages into overlapping chunks, embeds them in
//! batches and writes the vector index artifacts.

use crate::embeddings::EmbeddingProvider;
use crate::parser::{self, ContentType};
use crate::progress::{BuildPhase, ProgressReporter};
use crate::types::{Chunk, IndexedVector, PageRef};
use crate::vector_index::VectorIndex;
use mentor_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use text_splitter::{ChunkConfig, TextSplitter};
use walkdir::WalkDir;

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Default number of chunks per embedding request.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Author recorded when the catalog has none.
pub const DEFAULT_AUTHOR: &str = "Autor Desconhecido";

/// Conventional catalog file name.
pub const DEFAULT_CATALOG_FILE: &str = "pdf_metadata.json";

/// Catalog entry for one book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookMetadata {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub book_title: Option<String>,
}

/// Book metadata keyed by source file name.
///
/// Keys may carry the original `.pdf` extension, the extension of the
/// extracted text file, or none at all.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, BookMetadata>,
}

impl Catalog {
    pub fn new(entries: HashMap<String, BookMetadata>) -> Self {
        Self { entries }
    }

    /// Load a catalog from a JSON object file.
    ///
    /// A missing file yields an empty catalog so every book falls back to
    /// default metadata.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::warn!(
                "Metadata catalog {:?} not found, using default author and titles",
                path
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read catalog {:?}: {}", path, e)))?;
        let entries: HashMap<String, BookMetadata> = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse catalog {:?}: {}", path, e)))?;

        tracing::info!("Loaded metadata for {} books from {:?}", entries.len(), path);
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the entry for a source file.
    pub fn lookup(&self, path: &Path) -> Option<&BookMetadata> {
        let file_name = path.file_name().and_then(|n| n.to_str())?;
        let stem = file_stem(path);

        self.entries
            .get(file_name)
            .or_else(|| self.entries.get(&format!("{}.pdf", stem)))
            .or_else(|| self.entries.get(&stem))
    }

    /// Author and title for a source file, with defaults filled in.
    pub fn resolve(&self, path: &Path) -> (String, String) {
        let entry = self.lookup(path);

        let author = entry
            .and_then(|m| m.author.clone())
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());
        let title = entry
            .and_then(|m| m.book_title.clone())
            .unwrap_or_else(|| default_title(&file_stem(path)));

        (author, title)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Title derived from a file stem: underscores become spaces, words are
/// capitalized.
pub fn default_title(stem: &str) -> String {
    let spaced = stem.trim_end_matches(".pdf").replace('_', " ");

    let mut title = String::with_capacity(spaced.len());
    let mut previous_is_letter = false;
    for c in spaced.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                title.extend(c.to_lowercase());
            } else {
                title.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            title.push(c);
            previous_is_letter = false;
        }
    }
    title
}

/// Inputs of a directory build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory of extracted `.txt` / `.md` books
    pub sources: PathBuf,
    pub catalog: Catalog,
    /// Index directory to write
    pub output: PathBuf,
}

/// Outcome of a directory build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub chunks: usize,
    pub elapsed: Duration,
    pub bytes_on_disk: u64,
    pub output: PathBuf,
}

impl BuildReport {
    pub fn size_mb(&self) -> f64 {
        self.bytes_on_disk as f64 / (1024.0 * 1024.0)
    }
}

/// Builds vector indexes with one embedding provider.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    chunk_size: usize,
    chunk_overlap: usize,
    batch_size: usize,
    progress: ProgressReporter,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            batch_size: DEFAULT_BATCH_SIZE,
            progress: ProgressReporter::noop(),
        }
    }

    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    fn splitter(&self) -> AppResult<TextSplitter<text_splitter::Characters>> {
        if self.chunk_size == 0 {
            return Err(AppError::Config(
                "Chunk size must be greater than zero".to_string(),
            ));
        }
        let config = ChunkConfig::new(self.chunk_size)
            .with_overlap(self.chunk_overlap)
            .map_err(|e| {
                AppError::Config(format!(
                    "Invalid chunking settings (size {}, overlap {}): {}",
                    self.chunk_size, self.chunk_overlap, e
                ))
            })?;
        Ok(TextSplitter::new(config))
    }

    /// Split the pages of one book into chunks carrying its provenance.
    ///
    /// `pages[i]` is page `i + 1`.
    pub fn split_pages(
        &self,
        pages: &[String],
        author: &str,
        book_title: &str,
        source: &str,
    ) -> AppResult<Vec<Chunk>> {
        let splitter = self.splitter()?;
        Ok(split_with(&splitter, pages, author, book_title, source))
    }

    /// Embed chunks in batches and assemble an in-memory index.
    pub async fn embed_chunks(&self, chunks: Vec<Chunk>) -> AppResult<VectorIndex> {
        let total = chunks.len() as u64;
        let mut entries = Vec::with_capacity(chunks.len());
        let mut pending = chunks.into_iter().peekable();

        while pending.peek().is_some() {
            let batch: Vec<Chunk> = pending.by_ref().take(self.batch_size).collect();
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();

            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(AppError::Embedding(format!(
                    "Provider returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }

            entries.extend(
                vectors
                    .into_iter()
                    .zip(batch)
                    .map(|(vector, chunk)| IndexedVector { vector, chunk }),
            );

            self.progress.emit(
                BuildPhase::Embed,
                entries.len() as u64,
                Some(total),
                self.embedder.model_name(),
            );
        }

        VectorIndex::from_entries(self.embedder.clone(), entries)
    }

    /// Build an index from every supported file under `options.sources`.
    ///
    /// Unreadable files are logged and skipped. Nothing is written when no
    /// chunks were produced.
    pub async fn build(&self, options: &BuildOptions) -> AppResult<BuildReport> {
        let start = Instant::now();
        let splitter = self.splitter()?;

        if !options.sources.is_dir() {
            return Err(AppError::Index(format!(
                "Source directory {:?} does not exist",
                options.sources
            )));
        }

        tracing::info!(
            "Building index from {:?} into {:?} (chunk size {}, overlap {})",
            options.sources,
            options.output,
            self.chunk_size,
            self.chunk_overlap
        );

        let files = discover_sources(&options.sources);
        self.progress.emit(
            BuildPhase::Discover,
            files.len() as u64,
            None,
            options.sources.display().to_string(),
        );

        let mut chunks = Vec::new();
        let mut files_indexed = 0usize;
        let mut files_skipped = 0usize;

        for (position, path) in files.iter().enumerate() {
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            self.progress.emit(
                BuildPhase::Parse,
                position as u64 + 1,
                Some(files.len() as u64),
                source.clone(),
            );

            let pages = match parser::parse_pages(path) {
                Ok(pages) => pages,
                Err(e) => {
                    tracing::warn!("Skipping {:?}: {}", path, e);
                    files_skipped += 1;
                    continue;
                }
            };

            let (author, title) = options.catalog.resolve(path);
            let book_chunks = split_with(&splitter, &pages, &author, &title, &source);

            tracing::debug!(
                "Processed {:?}: {} pages, {} chunks (author: {}, title: {})",
                path,
                pages.len(),
                book_chunks.len(),
                author,
                title
            );

            if book_chunks.is_empty() {
                tracing::warn!("No text extracted from {:?}", path);
            }

            chunks.extend(book_chunks);
            files_indexed += 1;
        }

        if chunks.is_empty() {
            return Err(AppError::Index(format!(
                "No chunks produced from {:?}; index not written",
                options.sources
            )));
        }

        tracing::info!("Embedding {} chunks with {}", chunks.len(), self.embedder.model_name());
        let index = self.embed_chunks(chunks).await?;

        self.progress.emit(
            BuildPhase::Write,
            index.len() as u64,
            Some(index.len() as u64),
            options.output.display().to_string(),
        );
        let bytes_on_disk = index.save(&options.output)?;

        let report = BuildReport {
            files_indexed,
            files_skipped,
            chunks: index.len(),
            elapsed: start.elapsed(),
            bytes_on_disk,
            output: options.output.clone(),
        };

        tracing::info!(
            "Index built: {} chunks from {} files ({} skipped) in {:.2}s, {:.2} MB at {:?}",
            report.chunks,
            report.files_indexed,
            report.files_skipped,
            report.elapsed.as_secs_f64(),
            report.size_mb(),
            report.output
        );

        Ok(report)
    }
}

fn split_with(
    splitter: &TextSplitter<text_splitter::Characters>,
    pages: &[String],
    author: &str,
    book_title: &str,
    source: &str,
) -> Vec<Chunk> {
    pages
        .iter()
        .enumerate()
        .flat_map(|(i, page)| {
            splitter.chunks(page).map(move |text| {
                Chunk::new(text)
                    // 1-based, matching printed page numbers
                    .with_page(PageRef::Number(i as i64 + 1))
                    .with_author(author)
                    .with_book_title(book_title)
                    .with_source(source)
            })
        })
        .filter(|chunk| !chunk.content.trim().is_empty())
        .collect()
}

/// Supported files under `root`, in a stable order.
fn discover_sources(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| ContentType::from_path(p).is_supported())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use tempfile::TempDir;

    fn builder() -> IndexBuilder {
        IndexBuilder::new(Arc::new(TrigramProvider::new(64)))
    }

    #[test]
    fn test_default_title() {
        assert_eq!(default_title("o_poder_do_habito"), "O Poder Do Habito");
        assert_eq!(default_title("LIDERANÇA_servidora.pdf"), "Liderança Servidora");
    }

    #[test]
    fn test_catalog_lookup_variants() {
        let mut entries = HashMap::new();
        entries.insert(
            "habitos.pdf".to_string(),
            BookMetadata {
                author: Some("James Clear".to_string()),
                book_title: Some("Hábitos Atômicos".to_string()),
            },
        );
        entries.insert(
            "coragem".to_string(),
            BookMetadata {
                author: Some("Brené Brown".to_string()),
                book_title: None,
            },
        );
        let catalog = Catalog::new(entries);

        let (author, title) = catalog.resolve(Path::new("/livros/habitos.txt"));
        assert_eq!(author, "James Clear");
        assert_eq!(title, "Hábitos Atômicos");

        let (author, title) = catalog.resolve(Path::new("coragem.md"));
        assert_eq!(author, "Brené Brown");
        assert_eq!(title, "Coragem");

        let (author, title) = catalog.resolve(Path::new("sem_catalogo.txt"));
        assert_eq!(author, DEFAULT_AUTHOR);
        assert_eq!(title, "Sem Catalogo");
    }

    #[test]
    fn test_missing_catalog_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::load(&temp.path().join("pdf_metadata.json")).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_malformed_catalog_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pdf_metadata.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(Catalog::load(&path).is_err());
    }

    #[test]
    fn test_split_pages_respects_size_and_numbers_pages() {
        let builder = builder().with_chunking(40, 10);
        let pages = vec![
            "Primeira página com algumas palavras para dividir em pedaços.".to_string(),
            String::new(),
            "Terceira.".to_string(),
        ];

        let chunks = builder.split_pages(&pages, "A", "B", "livro.txt").unwrap();

        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.content.chars().count() <= 40));
        assert_eq!(chunks[0].page, PageRef::Number(1));
        let last = chunks.last().unwrap();
        assert_eq!(last.page, PageRef::Number(3));
        assert_eq!(last.content, "Terceira.");
        assert_eq!(last.author.as_deref(), Some("A"));
        assert_eq!(last.source.as_deref(), Some("livro.txt"));
    }

    #[test]
    fn test_overlap_not_smaller_than_size_rejected() {
        let builder = builder().with_chunking(100, 100);
        assert!(builder.split_pages(&["texto".to_string()], "A", "B", "x").is_err());
    }

    #[tokio::test]
    async fn test_embed_chunks_in_batches_keeps_order() {
        let builder = builder().with_batch_size(2);
        let chunks: Vec<Chunk> = (0..5).map(|i| Chunk::new(format!("trecho {}", i))).collect();

        let index = builder.embed_chunks(chunks).await.unwrap();

        assert_eq!(index.len(), 5);
        assert_eq!(index.chunks()[4].content, "trecho 4");
    }

    #[tokio::test]
    async fn test_build_writes_loadable_index() {
        let temp = TempDir::new().unwrap();
        let sources = temp.path().join("livros");
        std::fs::create_dir(&sources).unwrap();
        std::fs::write(
            sources.join("habitos_atomicos.txt"),
            "Pequenos hábitos geram grandes resultados.\x0cA identidade vem antes dos resultados.",
        )
        .unwrap();
        std::fs::write(sources.join("notas.md"), "# Liderança\n\nServir antes de liderar.").unwrap();
        std::fs::write(sources.join("capa.png"), [0u8, 1, 2]).unwrap();
        std::fs::write(sources.join("quebrado.txt"), "a\0b").unwrap();

        let mut entries = HashMap::new();
        entries.insert(
            "habitos_atomicos.pdf".to_string(),
            BookMetadata {
                author: Some("James Clear".to_string()),
                book_title: Some("Hábitos Atômicos".to_string()),
            },
        );

        let output = temp.path().join("index");
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TrigramProvider::new(64));
        let report = IndexBuilder::new(embedder.clone())
            .build(&BuildOptions {
                sources,
                catalog: Catalog::new(entries),
                output: output.clone(),
            })
            .await
            .unwrap();

        assert_eq!(report.files_indexed, 2);
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.chunks, 3);
        assert!(report.bytes_on_disk > 0);

        let index = VectorIndex::load(&output, embedder).unwrap();
        assert_eq!(index.len(), 3);

        let first = &index.chunks()[0];
        assert_eq!(first.author.as_deref(), Some("James Clear"));
        assert_eq!(first.page, PageRef::Number(1));
        assert_eq!(index.chunks()[1].page, PageRef::Number(2));

        let notes = &index.chunks()[2];
        assert_eq!(notes.author.as_deref(), Some(DEFAULT_AUTHOR));
        assert_eq!(notes.book_title.as_deref(), Some("Notas"));
    }

    #[tokio::test]
    async fn test_build_without_chunks_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let sources = temp.path().join("vazio");
        std::fs::create_dir(&sources).unwrap();
        std::fs::write(sources.join("branco.txt"), "   \x0c  ").unwrap();

        let output = temp.path().join("index");
        let result = builder()
            .build(&BuildOptions {
                sources,
                catalog: Catalog::default(),
                output: output.clone(),
            })
            .await;

        assert!(result.is_err());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_build_missing_sources_dir() {
        let temp = TempDir::new().unwrap();
        let result = builder()
            .build(&BuildOptions {
                sources: temp.path().join("nope"),
                catalog: Catalog::default(),
                output: temp.path().join("index"),
            })
            .await;
        assert!(result.is_err());
    }
}
