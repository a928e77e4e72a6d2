//! Mentor HTTP server
//!
//! Exposes the RAG pipeline over a small JSON API.

pub mod http;
pub mod state;

pub use http::{create_router, serve};
pub use state::AppState;
