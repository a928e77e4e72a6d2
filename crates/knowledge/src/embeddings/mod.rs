//! Embedding providers.
//!
//! Provider-agnostic embedding generation. The same provider (name, model,
//! dimensions) must be used to build an index and to query it.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
