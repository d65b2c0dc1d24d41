//! Error taxonomy and shared result types for the pipeline.

use thiserror::Error;

/// Errors surfaced by the retrieval pipeline and its collaborators.
///
/// Propagation rules:
///
/// * [`Validation`](RagError::Validation) and [`NotFound`](RagError::NotFound)
///   fail fast with no retry.
/// * [`Embedding`](RagError::Embedding) is only produced after the embedding
///   client has exhausted its internal retries.
/// * [`Generation`](RagError::Generation) means every candidate model was
///   tried and none produced a usable answer.
/// * Per-chunk ingestion failures are folded into [`IngestStats`] rather than
///   aborting the run, see [`crate::ingest`].
///
/// [`IngestStats`]: crate::ingest::IngestStats
#[derive(Debug, Error)]
pub enum RagError {
    /// A required input was missing or empty.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The embedding service failed after exhausting retries.
    #[error("embedding service error: {0}")]
    Embedding(String),

    /// Every candidate generation model failed or returned empty text.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The passage store or query log reported a persistence failure.
    #[error("storage error: {0}")]
    Store(String),

    /// No stored passage cleared the similarity floor for the query.
    #[error("no passage cleared the similarity floor")]
    NotFound,

    /// Transport-level failure talking to an external service.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Outcome channel for best-effort operations.
///
/// Cleanup before re-ingestion and query logging are deliberately decoupled
/// from the primary result: their failure is reported here and logged, never
/// propagated as a [`RagError`]. Tests can assert the primary flow without
/// caring whether the side effect landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// The operation completed.
    Completed,
    /// The operation failed; the primary flow continued regardless.
    Failed(String),
    /// The operation was not requested.
    Skipped,
}

impl SideEffect {
    /// Returns `true` when the side effect ran to completion.
    pub fn is_completed(&self) -> bool {
        matches!(self, SideEffect::Completed)
    }
}
