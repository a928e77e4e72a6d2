//! Embedding configuration.

use mentor_core::config::EmbeddingSettings;
use serde::{Deserialize, Serialize};

/// Embedding configuration used to build a provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama", "openai"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Base URL for HTTP providers
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    32
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            batch_size: default_batch_size(),
        }
    }
}

impl From<&EmbeddingSettings> for EmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            endpoint: settings.endpoint.clone(),
            batch_size: default_batch_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.batch_size, 32);
    }

    #[test]
    fn test_from_settings() {
        let settings = EmbeddingSettings {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: Some("http://gpu:11434".to_string()),
            api_key: None,
        };

        let config = EmbeddingConfig::from(&settings);
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.dimensions, 768);
        assert_eq!(config.endpoint.as_deref(), Some("http://gpu:11434"));
    }
}
