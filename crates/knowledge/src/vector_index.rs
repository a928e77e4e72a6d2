//! Immutable on-disk vector index.
//!
//! An index directory holds two artifacts:
//! - `index.vec`: `b"MVEC"`, `u32` version, `u32` dimension, `u64` count
//!   (little-endian), then `count * dimension` little-endian `f32` values
//! - `index.json`: the docstore (format version, embedding binding,
//!   creation time, SHA-256 of `index.vec`, ordered chunks)
//!
//! Row `i` of the vector file belongs to chunk `i` of the docstore.

use crate::embeddings::EmbeddingProvider;
use crate::types::{Chunk, IndexedVector, ScoredChunk};
use chrono::{DateTime, Utc};
use mentor_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Binary vector file name.
pub const VECTORS_FILE: &str = "index.vec";

/// Docstore file name.
pub const DOCSTORE_FILE: &str = "index.json";

/// Magic bytes opening the vector file.
pub const VECTORS_MAGIC: [u8; 4] = *b"MVEC";

/// Current artifact format version.
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Why an index directory could not be loaded.
#[derive(Debug, Clone, Error)]
pub enum LoadFailure {
    /// The directory or one of the artifact files does not exist
    #[error("Index artifacts not found: {}", join_paths(.missing))]
    MissingArtifacts { missing: Vec<PathBuf> },

    /// The index was built with another embedding model or format
    #[error("Index is incompatible: {0}")]
    Incompatible(String),

    /// The artifacts exist but do not agree with each other
    #[error("Index is corrupt: {0}")]
    Corrupt(String),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Embedding model an index was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingBinding {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

impl EmbeddingBinding {
    /// Binding describing a live provider.
    pub fn of(provider: &dyn EmbeddingProvider) -> Self {
        Self {
            provider: provider.provider_name().to_string(),
            model: provider.model_name().to_string(),
            dimensions: provider.dimensions(),
        }
    }

    /// Describe how `other` differs from this binding, if it does.
    fn mismatch(&self, other: &Self) -> Option<String> {
        if self.provider != other.provider {
            return Some(format!(
                "provider mismatch: index built with '{}', configured '{}'",
                self.provider, other.provider
            ));
        }
        if self.model != other.model {
            return Some(format!(
                "model mismatch: index built with '{}', configured '{}'",
                self.model, other.model
            ));
        }
        if self.dimensions != other.dimensions {
            return Some(format!(
                "dimension mismatch: index has {}, configured {}",
                self.dimensions, other.dimensions
            ));
        }
        None
    }
}

/// Contents of `index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Docstore {
    pub format_version: u32,
    pub embedding: EmbeddingBinding,
    pub created_at: DateTime<Utc>,
    pub vectors_sha256: String,
    pub chunks: Vec<Chunk>,
}

/// In-memory vector index bound to the provider that embeds its queries.
pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    dimensions: usize,
    /// Row-major, `chunks.len() * dimensions` values
    vectors: Vec<f32>,
    chunks: Vec<Chunk>,
    created_at: DateTime<Utc>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("embedder", &self.embedder)
            .field("dimensions", &self.dimensions)
            .field("len", &self.chunks.len())
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl VectorIndex {
    /// Create an index with no entries.
    pub fn empty(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let dimensions = embedder.dimensions();
        Self {
            embedder,
            dimensions,
            vectors: Vec::new(),
            chunks: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Create an index from embedded chunks, keeping their order.
    pub fn from_entries(
        embedder: Arc<dyn EmbeddingProvider>,
        entries: Vec<IndexedVector>,
    ) -> AppResult<Self> {
        let mut index = Self::empty(embedder);
        index.vectors.reserve(entries.len() * index.dimensions);
        index.chunks.reserve(entries.len());

        for (position, entry) in entries.into_iter().enumerate() {
            if entry.vector.len() != index.dimensions {
                return Err(AppError::Index(format!(
                    "Vector {} has {} dimensions, index expects {}",
                    position,
                    entry.vector.len(),
                    index.dimensions
                )));
            }
            if entry.vector.iter().any(|v| !v.is_finite()) {
                return Err(AppError::Index(format!(
                    "Vector {} contains non-finite values",
                    position
                )));
            }
            index.vectors.extend_from_slice(&entry.vector);
            index.chunks.push(entry.chunk);
        }

        Ok(index)
    }

    /// Paths of the two artifacts inside `dir`.
    pub fn artifact_paths(dir: &Path) -> (PathBuf, PathBuf) {
        (dir.join(VECTORS_FILE), dir.join(DOCSTORE_FILE))
    }

    /// Artifacts (or the directory itself) that do not exist.
    pub fn missing_artifacts(dir: &Path) -> Vec<PathBuf> {
        if !dir.is_dir() {
            return vec![dir.to_path_buf()];
        }
        let (vectors, docstore) = Self::artifact_paths(dir);
        [vectors, docstore]
            .into_iter()
            .filter(|p| !p.is_file())
            .collect()
    }

    /// Load an index directory and bind it to `embedder`.
    ///
    /// Checks, in order: both artifacts exist, the docstore parses, the
    /// format version and embedding binding match, the vector file checksum
    /// matches the docstore, and the header agrees with the docstore.
    pub fn load(dir: &Path, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, LoadFailure> {
        let missing = Self::missing_artifacts(dir);
        if !missing.is_empty() {
            return Err(LoadFailure::MissingArtifacts { missing });
        }

        let (vectors_path, docstore_path) = Self::artifact_paths(dir);
        let docstore = read_docstore(&docstore_path)
            .map_err(|e| LoadFailure::Corrupt(e.to_string()))?;

        if docstore.format_version != FORMAT_VERSION {
            return Err(LoadFailure::Incompatible(format!(
                "unsupported format version {} (expected {})",
                docstore.format_version, FORMAT_VERSION
            )));
        }

        let live = EmbeddingBinding::of(embedder.as_ref());
        if let Some(reason) = docstore.embedding.mismatch(&live) {
            return Err(LoadFailure::Incompatible(reason));
        }

        let bytes = std::fs::read(&vectors_path).map_err(|e| {
            LoadFailure::Corrupt(format!("Failed to read {:?}: {}", vectors_path, e))
        })?;

        let checksum = calculate_hash(&bytes);
        if checksum != docstore.vectors_sha256 {
            return Err(LoadFailure::Corrupt(format!(
                "checksum mismatch for {}: docstore has {}, file has {}",
                VECTORS_FILE, docstore.vectors_sha256, checksum
            )));
        }

        let vectors = decode_vectors(&bytes, live.dimensions, docstore.chunks.len())?;

        tracing::info!(
            path = %dir.display(),
            chunks = docstore.chunks.len(),
            dimensions = live.dimensions,
            "Loaded vector index"
        );

        Ok(Self {
            embedder,
            dimensions: live.dimensions,
            vectors,
            chunks: docstore.chunks,
            created_at: docstore.created_at,
        })
    }

    /// Write both artifacts into `dir`, creating it if needed.
    ///
    /// Returns the number of bytes written.
    pub fn save(&self, dir: &Path) -> AppResult<u64> {
        std::fs::create_dir_all(dir).map_err(|e| {
            AppError::Index(format!("Failed to create index directory {:?}: {}", dir, e))
        })?;

        let bytes = encode_vectors(&self.vectors, self.dimensions, self.chunks.len());
        let docstore = Docstore {
            format_version: FORMAT_VERSION,
            embedding: self.binding(),
            created_at: self.created_at,
            vectors_sha256: calculate_hash(&bytes),
            chunks: self.chunks.clone(),
        };
        let json = serde_json::to_vec_pretty(&docstore)?;

        let (vectors_path, docstore_path) = Self::artifact_paths(dir);
        std::fs::write(&vectors_path, &bytes).map_err(|e| {
            AppError::Index(format!("Failed to write {:?}: {}", vectors_path, e))
        })?;
        std::fs::write(&docstore_path, &json).map_err(|e| {
            AppError::Index(format!("Failed to write {:?}: {}", docstore_path, e))
        })?;

        tracing::debug!(path = %dir.display(), chunks = self.chunks.len(), "Saved vector index");

        Ok((bytes.len() + json.len()) as u64)
    }

    /// Top-`k` chunks by cosine similarity, most similar first.
    ///
    /// Equal scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<ScoredChunk>> {
        if query.len() != self.dimensions {
            return Err(AppError::Index(format!(
                "Query vector has {} dimensions, index expects {}",
                query.len(),
                self.dimensions
            )));
        }

        if query.iter().any(|v| !v.is_finite()) {
            return Err(AppError::Index(
                "Query vector contains non-finite values".to_string(),
            ));
        }

        if k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimensions)
            .map(|row| cosine_similarity(query, row))
            .enumerate()
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| ScoredChunk {
                chunk: self.chunks[position].clone(),
                score,
            })
            .collect())
    }

    /// Provider used to embed queries against this index.
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Embedding binding of this index.
    pub fn binding(&self) -> EmbeddingBinding {
        EmbeddingBinding::of(self.embedder.as_ref())
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Read and parse a docstore file.
pub fn read_docstore(path: &Path) -> AppResult<Docstore> {
    let contents = std::fs::read(path)
        .map_err(|e| AppError::Index(format!("Failed to read {:?}: {}", path, e)))?;
    serde_json::from_slice(&contents)
        .map_err(|e| AppError::Index(format!("Failed to parse {:?}: {}", path, e)))
}

/// Calculate SHA-256 hash of content.
pub fn calculate_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

fn encode_vectors(vectors: &[f32], dimensions: usize, count: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + vectors.len() * 4);
    bytes.extend_from_slice(&VECTORS_MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(dimensions as u32).to_le_bytes());
    bytes.extend_from_slice(&(count as u64).to_le_bytes());
    for &value in vectors {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_vectors(bytes: &[u8], dimensions: usize, expected_count: usize) -> Result<Vec<f32>, LoadFailure> {
    if bytes.len() < HEADER_LEN {
        return Err(LoadFailure::Corrupt(format!(
            "{} is {} bytes, shorter than its header",
            VECTORS_FILE,
            bytes.len()
        )));
    }

    let (header, body) = bytes.split_at(HEADER_LEN);
    if header[0..4] != VECTORS_MAGIC {
        return Err(LoadFailure::Corrupt(format!("{} has a bad magic header", VECTORS_FILE)));
    }

    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != FORMAT_VERSION {
        return Err(LoadFailure::Incompatible(format!(
            "{} has format version {} (expected {})",
            VECTORS_FILE, version, FORMAT_VERSION
        )));
    }

    let file_dimensions = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
    if file_dimensions != dimensions {
        return Err(LoadFailure::Corrupt(format!(
            "{} stores {} dimensions, docstore declares {}",
            VECTORS_FILE, file_dimensions, dimensions
        )));
    }

    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&header[12..20]);
    let count = u64::from_le_bytes(count_bytes) as usize;
    if count != expected_count {
        return Err(LoadFailure::Corrupt(format!(
            "{} holds {} vectors, docstore lists {} chunks",
            VECTORS_FILE, count, expected_count
        )));
    }

    if body.len() != count * dimensions * 4 {
        return Err(LoadFailure::Corrupt(format!(
            "{} body is {} bytes, expected {}",
            VECTORS_FILE,
            body.len(),
            count * dimensions * 4
        )));
    }

    let vectors: Vec<f32> = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    if let Some(position) = vectors.iter().position(|v| !v.is_finite()) {
        return Err(LoadFailure::Corrupt(format!(
            "{} has a non-finite value in vector {}",
            VECTORS_FILE,
            position / dimensions.max(1)
        )));
    }

    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::types::PageRef;
    use tempfile::TempDir;

    fn embedder(dimensions: usize) -> Arc<dyn EmbeddingProvider> {
        Arc::new(TrigramProvider::new(dimensions))
    }

    fn entry(content: &str, vector: Vec<f32>) -> IndexedVector {
        IndexedVector {
            vector,
            chunk: Chunk::new(content),
        }
    }

    fn small_index() -> VectorIndex {
        VectorIndex::from_entries(
            embedder(3),
            vec![
                entry("x", vec![1.0, 0.0, 0.0]),
                entry("y", vec![0.0, 1.0, 0.0]),
                entry("xy", vec![1.0, 1.0, 0.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![1.0, 0.0, 0.0];
        let d = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&c, &d) - 0.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_calculate_hash() {
        assert_eq!(
            calculate_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_from_entries_rejects_wrong_dimension() {
        let result = VectorIndex::from_entries(embedder(3), vec![entry("x", vec![1.0, 0.0])]);
        assert!(result.is_err());
    }

    #[test]
    fn test_search_orders_and_truncates() {
        let index = small_index();
        let results = index.search(&[1.0, 0.1, 0.0], 2).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "x");
        assert_eq!(results[1].chunk.content, "xy");
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_search_rejects_wrong_dimension() {
        let index = small_index();
        assert!(index.search(&[1.0, 0.0], 2).is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let chunk = Chunk::new("Trecho")
            .with_author("A")
            .with_book_title("B")
            .with_page(PageRef::Number(3));
        let index = VectorIndex::from_entries(
            embedder(3),
            vec![IndexedVector {
                vector: vec![0.5, 0.5, 0.0],
                chunk: chunk.clone(),
            }],
        )
        .unwrap();

        let written = index.save(temp.path()).unwrap();
        assert!(written > HEADER_LEN as u64);

        let loaded = VectorIndex::load(temp.path(), embedder(3)).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.chunks()[0], chunk);
        assert_eq!(loaded.created_at(), index.created_at());

        let results = loaded.search(&[0.5, 0.5, 0.0], 5).unwrap();
        assert!((results[0].score - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_load_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nope");

        match VectorIndex::load(&dir, embedder(3)) {
            Err(LoadFailure::MissingArtifacts { missing }) => assert_eq!(missing, vec![dir]),
            other => panic!("expected MissingArtifacts, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_missing_one_file() {
        let temp = TempDir::new().unwrap();
        small_index().save(temp.path()).unwrap();
        std::fs::remove_file(temp.path().join(DOCSTORE_FILE)).unwrap();

        match VectorIndex::load(temp.path(), embedder(3)) {
            Err(LoadFailure::MissingArtifacts { missing }) => {
                assert_eq!(missing, vec![temp.path().join(DOCSTORE_FILE)])
            }
            other => panic!("expected MissingArtifacts, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_rejects_other_embedding_model() {
        let temp = TempDir::new().unwrap();
        small_index().save(temp.path()).unwrap();

        let result = VectorIndex::load(temp.path(), embedder(4));
        assert!(matches!(result, Err(LoadFailure::Incompatible(_))));
    }

    #[test]
    fn test_load_detects_tampered_vectors() {
        let temp = TempDir::new().unwrap();
        small_index().save(temp.path()).unwrap();

        let path = temp.path().join(VECTORS_FILE);
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        let result = VectorIndex::load(temp.path(), embedder(3));
        assert!(matches!(result, Err(LoadFailure::Corrupt(_))));
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut bytes = encode_vectors(&[1.0, 2.0], 2, 1);
        bytes[0] = b'X';
        assert!(matches!(decode_vectors(&bytes, 2, 1), Err(LoadFailure::Corrupt(_))));
    }

    #[test]
    fn test_decode_rejects_count_mismatch() {
        let bytes = encode_vectors(&[1.0, 2.0], 2, 1);
        assert!(matches!(decode_vectors(&bytes, 2, 2), Err(LoadFailure::Corrupt(_))));
    }

    #[test]
    fn test_decode_rejects_non_finite_values() {
        let bytes = encode_vectors(&[1.0, 0.0, f32::NAN, 1.0], 2, 2);
        match decode_vectors(&bytes, 2, 2) {
            Err(LoadFailure::Corrupt(reason)) => assert!(reason.contains("vector 1")),
            other => panic!("unexpected result: {:?}", other),
        }

        let bytes = encode_vectors(&[f32::INFINITY, 0.0], 2, 1);
        assert!(matches!(decode_vectors(&bytes, 2, 1), Err(LoadFailure::Corrupt(_))));
    }

    #[test]
    fn test_from_entries_rejects_nan() {
        let result = VectorIndex::from_entries(
            embedder(2),
            vec![entry("a", vec![1.0, 0.0]), entry("b", vec![f32::NAN, 1.0])],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_search_rejects_nan_query() {
        let index = small_index();
        assert!(index.search(&[f32::NAN, 0.0, 0.0], 2).is_err());
    }

    #[test]
    fn test_search_order_is_total_with_ties() {
        let entries = (0..64)
            .map(|i| {
                let angle = i as f32 * 0.01;
                let vector = if i % 3 == 0 {
                    vec![1.0, 0.0]
                } else {
                    vec![angle.cos(), angle.sin()]
                };
                entry(&format!("c{}", i), vector)
            })
            .collect();
        let index = VectorIndex::from_entries(embedder(2), entries).unwrap();

        let results = index.search(&[1.0, 0.0], 5).unwrap();
        let names: Vec<&str> = results.iter().map(|r| r.chunk.content.as_str()).collect();

        assert_eq!(names, vec!["c0", "c3", "c6", "c9", "c12"]);
        assert!(results.iter().all(|r| r.score.is_finite()));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_load_failure_display_lists_paths() {
        let failure = LoadFailure::MissingArtifacts {
            missing: vec![PathBuf::from("idx/index.vec"), PathBuf::from("idx/index.json")],
        };
        assert_eq!(
            failure.to_string(),
            "Index artifacts not found: idx/index.vec, idx/index.json"
        );
    }
}
