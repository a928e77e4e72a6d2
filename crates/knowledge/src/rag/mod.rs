//! RAG (Retrieval-Augmented Generation) answering system.
//!
//! Embeds the question, retrieves the closest book chunks and asks the LLM
//! to answer as a mentor grounded in them.

pub mod pipeline;
pub mod synthesizer;
pub mod types;

pub use pipeline::{RagPipeline, ReadyPipeline};
pub use synthesizer::{AnswerSynthesizer, Synthesizer};
pub use types::{Answer, AskError, InitFailure, InternalCause, PipelineStatus, SourceDocument};
