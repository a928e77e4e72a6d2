//! Source file parsing and text extraction.
//!
//! Books are read as plain text (for example `pdftotext` output). A form
//! feed (`\x0c`) separates pages, so page numbers survive extraction.

use mentor_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Page separator emitted by text extractors.
pub const PAGE_BREAK: char = '\x0c';

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("txt") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Whether the index builder reads files of this type.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// Parse a source file into pages of clean text.
///
/// Page `i` of the result is page `i + 1` of the book. Pages that are blank
/// after cleaning are kept as empty strings so numbering stays aligned.
pub fn parse_pages(path: &Path) -> AppResult<Vec<String>> {
    let content_type = ContentType::from_path(path);
    if !content_type.is_supported() {
        return Err(AppError::Index(format!(
            "Unsupported source file type: {:?}",
            path
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Index(format!("Failed to read {:?}: {}", path, e)))?;

    if raw.contains('\0') {
        tracing::warn!("Skipping likely binary file: {:?}", path);
        return Err(AppError::Index(format!("Binary file not supported: {:?}", path)));
    }

    Ok(split_pages(&raw, content_type))
}

fn split_pages(raw: &str, content_type: ContentType) -> Vec<String> {
    let mut pages: Vec<String> = raw
        .split(PAGE_BREAK)
        .map(|page| match content_type {
            ContentType::Markdown => clean_markdown(page),
            _ => page.trim().to_string(),
        })
        .collect();

    // pdftotext ends the last page with a form feed
    if pages.len() > 1 && pages.last().is_some_and(|p| p.is_empty()) {
        pages.pop();
    }

    pages
}

/// Clean markdown by removing excess formatting.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        // Skip horizontal rules and code fences
        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}
