//! Command handlers for the mentor CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod index;
pub mod serve;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use index::IndexCommand;
pub use serve::ServeCommand;
