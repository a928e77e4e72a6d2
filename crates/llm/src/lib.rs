//! LLM integration crate for the Mentor RAG service.
//!
//! This crate provides a provider-agnostic abstraction for interacting with
//! Large Language Models (LLMs). It supports multiple providers through a
//! unified trait-based interface.
//!
//! # Providers
//! - **OpenRouter / OpenAI**: hosted chat completions (default: OpenRouter)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use mentor_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiCompatClient};
pub use types::ProviderType;
