//! Prompt system for the Mentor RAG service.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions (the mentor persona is built in)
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{default_answer_prompt, load_answer_prompt, load_prompt_file};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptInputSpec};
