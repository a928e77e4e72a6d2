//! Trigram embedding provider using character trigram-based content-aware embeddings.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::provider::EmbeddingProvider;
use mentor_core::{AppError, AppResult};
use std::collections::{HashMap, HashSet};

/// Model identifier reported by the trigram provider.
pub const TRIGRAM_MODEL: &str = "trigram-v1";

/// English and Portuguese function words ignored when hashing.
const STOP_WORDS: &[&str] = &[
    "the", "which", "are", "was", "were", "for", "and", "but", "with", "from", "this", "that",
    "have", "has", "had", "its", "their", "they", "them", "que", "com", "para", "por", "uma",
    "não", "dos", "das", "nos", "nas", "como", "mais", "mas", "seu", "sua", "seus", "suas",
    "ele", "ela", "isso", "este", "esta", "pelo", "pela",
];

/// Trigram-based embedding provider for local, offline operation.
///
/// Generates deterministic embeddings based on text content using
/// character trigrams and word frequencies. While not semantically
/// accurate like neural embedding models, it produces consistent,
/// content-dependent vectors suitable for development and offline use.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    /// Create a new trigram provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Create a provider from configuration, rejecting foreign model names.
    pub fn from_config(config: &EmbeddingConfig) -> AppResult<Self> {
        if config.model != TRIGRAM_MODEL {
            return Err(AppError::Embedding(format!(
                "Trigram provider only supports model '{}', got '{}'",
                TRIGRAM_MODEL, config.model
            )));
        }
        Ok(Self::new(config.dimensions))
    }

    /// Generate a trigram-based embedding for text.
    fn generate_trigram_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];

        let lower = text.to_lowercase();
        let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();

        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !stop_words.contains(w))
            .collect();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in &words {
            *word_freq.entry(*word).or_insert(0) += 1;
        }

        // Iterate in sorted order so float accumulation is reproducible
        let mut entries: Vec<(&str, u32)> = word_freq.into_iter().collect();
        entries.sort_unstable();

        for (word, freq) in entries {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let trigram_hash = trigram
                    .bytes()
                    .fold(0u64, |acc, b| acc.wrapping_mul(37).wrapping_add(b as u64));

                let dim_idx = (trigram_hash as usize) % self.dimensions;
                embedding[dim_idx] += (freq as f32).sqrt();
            }

            // Also encode whole word
            let word_hash = word
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            let base_dim = (word_hash as usize) % self.dimensions;
            embedding[base_dim] += freq as f32;
        }

        // Normalize to unit vector
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        TRIGRAM_MODEL
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| self.generate_trigram_embedding(text))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_trigram_provider_dimensions() {
        let provider = TrigramProvider::new(384);
        assert_eq!(provider.dimensions(), 384);
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.model_name(), "trigram-v1");
    }

    #[test]
    fn test_from_config_rejects_other_models() {
        let config = EmbeddingConfig {
            model: "paraphrase-multilingual-mpnet-base-v2".to_string(),
            ..Default::default()
        };
        assert!(TrigramProvider::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_trigram_provider_embed_batch() {
        let provider = TrigramProvider::new(384);
        let texts = vec![
            "liderança servidora".to_string(),
            "hábitos atômicos".to_string(),
            "rust programming".to_string(),
        ];

        let embeddings = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 3);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 384);
            assert!((norm(embedding) - 1.0).abs() < 0.001);
        }
    }

    #[tokio::test]
    async fn test_trigram_provider_deterministic() {
        let provider = TrigramProvider::new(384);
        let text = "disciplina é liberdade, disciplina é foco";

        let embedding1 = provider.embed(text).await.unwrap();
        let embedding2 = provider.embed(text).await.unwrap();

        assert_eq!(embedding1, embedding2);
    }

    #[tokio::test]
    async fn test_trigram_provider_different_texts() {
        let provider = TrigramProvider::new(384);

        let embedding1 = provider.embed("hello world").await.unwrap();
        let embedding2 = provider.embed("goodbye world").await.unwrap();

        assert_ne!(embedding1, embedding2);
    }

    #[tokio::test]
    async fn test_trigram_provider_empty_text() {
        let provider = TrigramProvider::new(384);
        let embedding = provider.embed("").await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_punctuation_does_not_change_words() {
        let provider = TrigramProvider::new(384);

        let plain = provider.embed("coragem liderança").await.unwrap();
        let punctuated = provider.embed("Coragem, liderança!").await.unwrap();

        assert_eq!(plain, punctuated);
    }
}
