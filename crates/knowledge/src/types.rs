//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};

/// Page reference carried by a chunk.
///
/// Serialized untagged: `null`, an integer, or a string label.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageRef {
    /// No page information
    #[default]
    None,
    /// Numeric page (1-based for indexes built by this crate)
    Number(i64),
    /// Free-form label such as "xii" or "capa"
    Label(String),
}

impl PageRef {
    /// Whether the reference carries any page information.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl From<i64> for PageRef {
    fn from(page: i64) -> Self {
        Self::Number(page)
    }
}

impl std::fmt::Display for PageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "-"),
            Self::Number(n) => write!(f, "{}", n),
            Self::Label(label) => write!(f, "{}", label),
        }
    }
}

/// A contiguous span of text from one source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content
    pub content: String,

    /// Page the text came from
    #[serde(default)]
    pub page: PageRef,

    /// Author of the source book
    #[serde(default)]
    pub author: Option<String>,

    /// Title of the source book
    #[serde(default)]
    pub book_title: Option<String>,

    /// Source file name the chunk was cut from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Chunk {
    /// Create a chunk with no provenance.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            page: PageRef::None,
            author: None,
            book_title: None,
            source: None,
        }
    }

    /// Set the page reference.
    pub fn with_page(mut self, page: impl Into<PageRef>) -> Self {
        self.page = page.into();
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the book title.
    pub fn with_book_title(mut self, title: impl Into<String>) -> Self {
        self.book_title = Some(title.into());
        self
    }

    /// Set the source file name.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// An embedding vector paired with its chunk.
#[derive(Debug, Clone)]
pub struct IndexedVector {
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

/// A chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}
