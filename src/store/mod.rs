//! Passage persistence and the query log.
//!
//! The pipeline talks to storage through two narrow traits so orchestrators
//! and tests can swap backends freely:
//!
//! * [`PassageStore`] — append-only passage CRUD plus filtered bulk delete.
//! * [`QueryLog`] — fire-and-forget persistence of incoming questions.
//!
//! Two backends are provided: [`memory::MemoryStore`] for tests and small
//! corpora, and [`sqlite::SqlitePassageStore`] for durable storage.
//!
//! Passages are immutable once stored. Re-ingesting a document deletes its
//! prior passages via [`PassageStore::delete_where`] first; nothing mutates
//! in place.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::RagError;

pub use memory::MemoryStore;
pub use sqlite::SqlitePassageStore;

/// A stored chunk of source text plus its embedding and provenance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Passage {
    /// Opaque unique identifier, assigned at creation.
    pub id: String,
    /// Human label, by convention `"<source_document> (Part i/N)"`.
    pub title: String,
    /// The chunk text. Non-empty; bounded by the configured chunk size.
    pub content: String,
    /// Optional classification tag, used only as a bulk-delete filter.
    pub category: Option<String>,
    pub metadata: PassageMetadata,
}

/// Provenance and retrieval metadata attached to every ingested passage.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PassageMetadata {
    /// Zero-based position within the source document's ingestion run.
    pub chunk_index: usize,
    /// Passage count of the ingestion run; identical across the run.
    pub total_chunks: usize,
    /// Embedding vector. Passages without one score 0 in ranking.
    pub embedding: Option<Vec<f32>>,
    /// Title of the originating text.
    pub source_document: String,
    /// Length of this chunk in characters.
    pub chunk_size: usize,
    /// Configured word overlap for the ingestion run.
    pub overlap_size: usize,
    /// Byte offset of the chunk within the normalized source, best effort.
    pub start_position: usize,
    pub end_position: usize,
    pub word_count: usize,
}

impl Passage {
    /// Create a passage with a fresh id and empty metadata.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            category: None,
            metadata: PassageMetadata::default(),
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: PassageMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Embedding vector, when the passage carries one.
    pub fn embedding(&self) -> Option<&[f32]> {
        self.metadata.embedding.as_deref()
    }
}

/// Filter for [`PassageStore::delete_where`]. An empty filter matches every
/// passage, so `delete_where(DeleteFilter::default())` clears the store.
#[derive(Clone, Debug, Default)]
pub struct DeleteFilter {
    pub category: Option<String>,
    pub title_prefix: Option<String>,
}

impl DeleteFilter {
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn title_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.title_prefix = Some(prefix.into());
        self
    }

    /// Whether a passage matches this filter. Every provided field must
    /// match; missing fields match anything.
    pub fn matches(&self, passage: &Passage) -> bool {
        if let Some(category) = &self.category {
            if passage.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(prefix) = &self.title_prefix {
            if !passage.title.starts_with(prefix.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Append-only storage for passages.
#[async_trait]
pub trait PassageStore: Send + Sync {
    /// Persist one passage.
    async fn insert(&self, passage: Passage) -> Result<(), RagError>;

    /// Every stored passage, in insertion order. Ranking scans this linearly;
    /// a persistent vector index is deliberately out of scope.
    async fn select_all(&self) -> Result<Vec<Passage>, RagError>;

    /// Delete passages matching the filter, returning the count removed.
    async fn delete_where(&self, filter: DeleteFilter) -> Result<usize, RagError>;

    /// Total number of stored passages.
    async fn count(&self) -> Result<usize, RagError>;
}

/// Fire-and-forget persistence of user questions.
#[async_trait]
pub trait QueryLog: Send + Sync {
    /// Record a question verbatim. Callers treat failure as non-fatal.
    async fn record(&self, question: &str) -> Result<(), RagError>;
}
