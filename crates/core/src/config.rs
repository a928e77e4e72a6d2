//! Configuration management for the Mentor RAG service.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (`mentor.yaml`, or the path in `MENTOR_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources win over earlier ones.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "mentor.yaml";

/// Embedding providers the knowledge crate knows how to build.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 3] = ["trigram", "ollama", "openai"];

/// LLM providers the llm crate knows how to build.
pub const KNOWN_LLM_PROVIDERS: [&str; 3] = ["openrouter", "openai", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Config file the values were merged from (if any)
    pub config_file: Option<PathBuf>,

    /// Directory holding `index.vec` and `index.json`
    pub index_path: PathBuf,

    /// Embedding model settings (must match the index)
    pub embedding: EmbeddingSettings,

    /// Language model settings
    pub llm: LlmSettings,

    /// Retrieval settings
    pub retrieval: RetrievalSettings,

    /// HTTP server settings
    pub server: ServerSettings,

    /// Prompt settings
    pub prompt: PromptSettings,

    /// Logging settings
    pub logging: LoggingSettings,
}

/// Embedding provider configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Provider name: "trigram", "ollama", "openai"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Optional base URL for HTTP providers
    pub endpoint: Option<String>,

    /// API key for hosted embedding providers
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            api_key: None,
        }
    }
}

impl std::fmt::Debug for EmbeddingSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Language model configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Provider name: "openrouter", "openai", "ollama"
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Optional base URL override
    pub endpoint: Option<String>,

    /// API key for hosted providers
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion token ceiling
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            model: "mistralai/mistral-7b-instruct-v0.2".to_string(),
            endpoint: None,
            api_key: None,
            temperature: 0.5,
            max_tokens: 1500,
        }
    }
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl LlmSettings {
    /// Whether this provider is hosted and needs an API key.
    pub fn requires_api_key(&self) -> bool {
        llm_requires_api_key(&self.provider)
    }
}

/// Retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Number of chunks handed to the synthesizer
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Socket address to bind
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Prompt configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptSettings {
    /// Optional YAML prompt definition replacing the built-in persona
    pub file: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level / filter override
    pub level: Option<String>,

    /// Disable colored output
    pub no_color: bool,

    /// Line format
    pub format: LogFormat,
}

/// Full configuration file structure. Every section is optional; unknown keys
/// are rejected so a misspelt setting never falls back to its default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    index_path: Option<PathBuf>,
    embedding: Option<EmbeddingFileSection>,
    llm: Option<LlmFileSection>,
    retrieval: Option<RetrievalFileSection>,
    server: Option<ServerFileSection>,
    prompt: Option<PromptFileSection>,
    logging: Option<LoggingFileSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmbeddingFileSection {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
    endpoint: Option<String>,
    api_key: Option<String>,
    /// Name of the environment variable holding the API key
    api_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LlmFileSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    api_key: Option<String>,
    /// Name of the environment variable holding the API key
    api_key_env: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RetrievalFileSection {
    top_k: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerFileSection {
    bind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PromptFileSection {
    file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingFileSection {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            index_path: PathBuf::from("faiss_index_multi_author"),
            embedding: EmbeddingSettings::default(),
            llm: LlmSettings::default(),
            retrieval: RetrievalSettings::default(),
            server: ServerSettings::default(),
            prompt: PromptSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the process environment.
    ///
    /// Environment variables:
    /// - `MENTOR_CONFIG`: Path to config file (when `config_file` is `None`)
    /// - `INDEX_PATH` / `MENTOR_INDEX_PATH`: Index directory
    /// - `MENTOR_EMBEDDING_PROVIDER`, `EMBEDDING_MODEL_NAME`: Embedding model
    /// - `MENTOR_EMBEDDING_API_KEY`, `OPENAI_API_KEY`: Embedding credential
    /// - `MENTOR_LLM_PROVIDER`, `LLM_MODEL_NAME`: Language model
    /// - `MENTOR_API_KEY`, `OPENROUTER_API_KEY`: LLM credential
    /// - `MENTOR_BIND`: Server bind address
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use mentor_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None).expect("Failed to load config");
    /// println!("Index: {:?}", config.index_path);
    /// ```
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        Self::load_with(config_file, |key| std::env::var(key).ok())
    }

    /// Load configuration using a custom environment lookup.
    pub fn load_with<F>(config_file: Option<&Path>, env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let explicit = config_file
            .map(Path::to_path_buf)
            .or_else(|| env("MENTOR_CONFIG").map(PathBuf::from));

        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                config.merge_yaml(&path, &env)?;
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    config.merge_yaml(&default_path, &env)?;
                }
            }
        }

        config.merge_env(&env);

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml<F>(&mut self, path: &Path, env: &F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        self.config_file = Some(path.to_path_buf());

        if let Some(index_path) = file.index_path {
            self.index_path = index_path;
        }

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                self.embedding.provider = provider;
            }
            if let Some(model) = embedding.model {
                self.embedding.model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                self.embedding.dimensions = dimensions;
            }
            if embedding.endpoint.is_some() {
                self.embedding.endpoint = embedding.endpoint;
            }
            if embedding.api_key.is_some() {
                self.embedding.api_key = embedding.api_key;
            }
            if let Some(var) = embedding.api_key_env {
                self.embedding.api_key = env(&var);
            }
        }

        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if llm.endpoint.is_some() {
                self.llm.endpoint = llm.endpoint;
            }
            if llm.api_key.is_some() {
                self.llm.api_key = llm.api_key;
            }
            if let Some(var) = llm.api_key_env {
                self.llm.api_key = env(&var);
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
        }

        if let Some(top_k) = file.retrieval.and_then(|r| r.top_k) {
            self.retrieval.top_k = top_k;
        }

        if let Some(bind) = file.server.and_then(|s| s.bind) {
            self.server.bind = bind;
        }

        if let Some(prompt_file) = file.prompt.and_then(|p| p.file) {
            self.prompt.file = Some(prompt_file);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.logging.level = Some(level);
            }
            if let Some(color) = logging.color {
                self.logging.no_color = !color;
            }
            if let Some(format) = logging.format {
                self.logging.format = LogFormat::parse(&format).ok_or_else(|| {
                    AppError::Config(format!("Unknown log format: {}", format))
                })?;
            }
        }

        Ok(())
    }

    /// Apply environment variable overrides.
    fn merge_env<F>(&mut self, env: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = env("MENTOR_INDEX_PATH").or_else(|| env("INDEX_PATH")) {
            self.index_path = PathBuf::from(path);
        }

        if let Some(provider) = env("MENTOR_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }

        if let Some(model) = env("EMBEDDING_MODEL_NAME") {
            self.embedding.model = model;
        }

        if let Some(key) = env("MENTOR_EMBEDDING_API_KEY").or_else(|| env("OPENAI_API_KEY")) {
            self.embedding.api_key = Some(key);
        }

        if let Some(provider) = env("MENTOR_LLM_PROVIDER") {
            self.llm.provider = provider;
        }

        if let Some(model) = env("LLM_MODEL_NAME") {
            self.llm.model = model;
        }

        if let Some(key) = env("MENTOR_API_KEY").or_else(|| env("OPENROUTER_API_KEY")) {
            self.llm.api_key = Some(key);
        }

        if let Some(bind) = env("MENTOR_BIND") {
            self.server.bind = bind;
        }

        if let Some(level) = env("RUST_LOG") {
            self.logging.level = Some(level);
        }

        if env("NO_COLOR").is_some() {
            self.logging.no_color = true;
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the file and environment.
    pub fn with_overrides(
        mut self,
        index_path: Option<PathBuf>,
        bind: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(index_path) = index_path {
            self.index_path = index_path;
        }

        if let Some(bind) = bind {
            self.server.bind = bind;
        }

        if let Some(log_level) = log_level {
            self.logging.level = Some(log_level);
        }

        if verbose && self.logging.level.is_none() {
            // Verbose mode implies debug logging
            self.logging.level = Some("debug".to_string());
        }

        if no_color {
            self.logging.no_color = true;
        }

        self
    }

    /// Validate configuration.
    ///
    /// The pipeline runs the same checks while initializing and reports them
    /// through its failure state. The CLI calls this for commands that cannot
    /// run degraded.
    pub fn validate(&self) -> AppResult<()> {
        self.validate_embedding()?;
        self.validate_llm()?;
        self.validate_retrieval()
    }

    /// Validate only the embedding settings.
    pub fn validate_embedding(&self) -> AppResult<()> {
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate only the retrieval settings.
    pub fn validate_retrieval(&self) -> AppResult<()> {
        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.top_k must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate only the language model settings.
    pub fn validate_llm(&self) -> AppResult<()> {
        if !KNOWN_LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown LLM provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        if self.llm.model.trim().is_empty() {
            return Err(AppError::Config("LLM model must not be empty".to_string()));
        }

        if self.llm.requires_api_key()
            && self.llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(AppError::Config(format!(
                "LLM provider '{}' requires an API key (set OPENROUTER_API_KEY or MENTOR_API_KEY)",
                self.llm.provider
            )));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AppError::Config(format!(
                "LLM temperature must be within 0.0-2.0, got {}",
                self.llm.temperature
            )));
        }

        Ok(())
    }
}

/// Whether an LLM provider is hosted and needs an API key.
pub fn llm_requires_api_key(provider: &str) -> bool {
    matches!(provider.to_lowercase().as_str(), "openrouter" | "openai")
}
