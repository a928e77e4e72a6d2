//! Logging infrastructure for the Mentor RAG service.
//!
//! This module initializes the tracing subscriber for structured logging.
//! All logs are emitted to stderr to keep stdout clean for command output.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Parse a log format name ("text" or "json").
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Initialize the tracing subscriber with stderr output.
///
/// This sets up structured logging with:
/// - Output to stderr (stdout is reserved for command output)
/// - Environment-based filtering (RUST_LOG or provided level)
/// - Human-readable or JSON format
/// - Optional ANSI color control
///
/// # Arguments
/// * `log_level` - Optional log level override (e.g., "debug", "info")
/// * `no_color` - Disable colored output
/// * `format` - Line format
///
/// # Example
/// ```no_run
/// use mentor_core::logging::{init_logging, LogFormat};
///
/// init_logging(None, false, LogFormat::Text).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool, format: LogFormat) -> AppResult<()> {
    let env_filter = build_filter(log_level)?;

    let result = match format {
        LogFormat::Text => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_ansi(!no_color && supports_color());

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
        }
    };

    result.map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}

/// Build the level filter from an explicit level, RUST_LOG, or "info".
fn build_filter(log_level: Option<&str>) -> AppResult<EnvFilter> {
    let default_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_str = log_level.unwrap_or(&default_level);

    EnvFilter::try_new(filter_str)
        .map_err(|e| AppError::Config(format!("Invalid log filter: {}", e)))
}

/// Check if the terminal supports color output.
fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
}

/// Mask a secret for logging, keeping only the last four characters.
pub fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        Some(s) if !s.is_empty() => {
            let chars: Vec<char> = s.chars().collect();
            let visible = chars.len().min(4);
            let hidden = chars.len() - visible;
            let tail: String = chars[hidden..].iter().collect();
            format!("{}{}", "*".repeat(hidden), tail)
        }
        _ => "NOT SET".to_string(),
    }
}
