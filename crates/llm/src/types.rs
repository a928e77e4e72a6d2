//! Provider identification.

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenRouter,
    OpenAI,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openrouter" => Some(Self::OpenRouter),
            "openai" => Some(Self::OpenAI),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::OpenAI => "openai",
            Self::Ollama => "ollama",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!(ProviderType::parse("openrouter"), Some(ProviderType::OpenRouter));
        assert_eq!(ProviderType::parse("OpenAI"), Some(ProviderType::OpenAI));
        assert_eq!(ProviderType::parse("ollama"), Some(ProviderType::Ollama));
        assert_eq!(ProviderType::parse("claude"), None);
    }

    #[test]
    fn test_canonical_name_round_trips() {
        for provider in [ProviderType::OpenRouter, ProviderType::OpenAI, ProviderType::Ollama] {
            assert_eq!(ProviderType::parse(provider.as_str()), Some(provider));
        }
    }
}
