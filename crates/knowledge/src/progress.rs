//! Structured progress reporting for index builds.
//!
//! Builds over a shelf of books take minutes with hosted embeddings, so the
//! builder emits one event per file and per embedding batch.

use std::sync::Arc;
use std::time::Instant;

/// Stage of an index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Discover,
    Parse,
    Embed,
    Write,
}

impl BuildPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Parse => "parse",
            Self::Embed => "embed",
            Self::Write => "write",
        }
    }
}

/// Progress event emitted during a build.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: BuildPhase,

    /// Units done so far (files or chunks, depending on phase)
    pub current: u64,

    /// Total expected units, if known
    pub total: Option<u64>,

    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: f64,
}

impl ProgressEvent {
    /// Percentage complete, when the total is known.
    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|t| {
            if t > 0 {
                (self.current as f64 / t as f64) * 100.0
            } else {
                0.0
            }
        })
    }

    /// Format as a simple user-facing line.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };

        let pct = self
            .percentage()
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase.as_str(), progress, pct, self.message)
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Emits progress events through an optional callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    /// Reporter that only logs at debug level.
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    pub fn emit(&self, phase: BuildPhase, current: u64, total: Option<u64>, message: impl Into<String>) {
        let event = ProgressEvent {
            phase,
            current,
            total,
            message: message.into(),
            elapsed_secs: self.start_time.elapsed().as_secs_f64(),
        };

        tracing::debug!(
            phase = event.phase.as_str(),
            current = event.current,
            total = ?event.total,
            message = %event.message,
            elapsed_secs = event.elapsed_secs,
            "Build progress"
        );

        if let Some(callback) = &self.callback {
            callback(event);
        }
    }
}
