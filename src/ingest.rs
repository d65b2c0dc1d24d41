//! Ingestion orchestration: raw text to stored, embedded passages.
//!
//! One ingestion run takes the raw text(s) of a source document through
//! normalization and chunking, then embeds and stores the chunks in
//! fixed-size batches. Batches run strictly in sequence; inside a batch the
//! embed+store calls fan out concurrently and are recombined by index, so
//! chunk numbering is deterministic regardless of completion order. A short
//! pause between batches keeps the embedding service's rate limits happy.
//!
//! Failures are tolerated per chunk: a transient embedding error loses that
//! chunk alone, never its siblings or the run.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{info, warn};

use crate::chunker::chunk;
use crate::config::PipelineConfig;
use crate::preprocess::normalize;
use crate::services::EmbeddingService;
use crate::store::{DeleteFilter, Passage, PassageMetadata, PassageStore};
use crate::types::{RagError, SideEffect};

/// Separator used when a document arrives as multiple raw texts.
const DOCUMENT_JOIN_SEPARATOR: &str = "\n\n---\n\n";

/// Per-run options. Chunking knobs default to the pipeline configuration.
#[derive(Clone, Debug)]
pub struct IngestOptions {
    /// Source document title; becomes `metadata.source_document` and the
    /// `"<title> (Part i/N)"` passage titles.
    pub title: String,
    /// Classification tag stored on every passage of the run.
    pub category: Option<String>,
    /// Delete prior passages matching `category` + `title` prefix before
    /// ingesting. Best effort: failure is reported, not fatal.
    pub cleanup_first: bool,
    pub chunk_size: Option<usize>,
    pub overlap_words: Option<usize>,
}

impl IngestOptions {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            category: None,
            cleanup_first: true,
            chunk_size: None,
            overlap_words: None,
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_cleanup(mut self, cleanup_first: bool) -> Self {
        self.cleanup_first = cleanup_first;
        self
    }

    #[must_use]
    pub fn with_chunking(mut self, chunk_size: usize, overlap_words: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self.overlap_words = Some(overlap_words);
        self
    }
}

/// Aggregate result of one ingestion run.
#[derive(Clone, Debug)]
pub struct IngestStats {
    pub chunks_total: usize,
    pub chunks_succeeded: usize,
    pub chunks_failed: usize,
    /// Words across successfully stored chunks.
    pub total_words: usize,
    /// Characters in the normalized source text.
    pub total_characters: usize,
    /// Outcome of the best-effort pre-ingestion cleanup.
    pub cleanup: SideEffect,
}

/// Drives Preprocessor -> Chunker -> Embedding Client -> storage.
pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingService>,
    store: Arc<dyn PassageStore>,
    config: PipelineConfig,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingService>,
        store: Arc<dyn PassageStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Ingests a source document provided as one or more raw texts.
    ///
    /// Fails fast with [`RagError::Validation`] when the joined input is
    /// empty; everything past validation degrades per chunk instead of
    /// failing the run.
    pub async fn ingest(
        &self,
        raw_texts: &[String],
        options: IngestOptions,
    ) -> Result<IngestStats, RagError> {
        let raw = raw_texts.join(DOCUMENT_JOIN_SEPARATOR);
        if raw.trim().is_empty() {
            return Err(RagError::Validation(
                "document content is required".to_string(),
            ));
        }

        let cleanup = if options.cleanup_first {
            self.cleanup_previous(&options).await
        } else {
            SideEffect::Skipped
        };

        let cleaned = normalize(&raw);
        let chunk_size = options.chunk_size.unwrap_or(self.config.chunk_size);
        let overlap_words = options.overlap_words.unwrap_or(self.config.overlap_words);
        let chunks = chunk(&cleaned, chunk_size, overlap_words);
        info!(
            title = %options.title,
            characters = cleaned.len(),
            chunks = chunks.len(),
            "ingesting document"
        );

        let total = chunks.len();
        let mut succeeded = 0usize;
        let mut failed = 0usize;
        let mut total_words = 0usize;

        for batch_start in (0..total).step_by(self.config.batch_size) {
            let batch_end = (batch_start + self.config.batch_size).min(total);
            let outcomes = join_all(chunks[batch_start..batch_end].iter().enumerate().map(
                |(offset, text)| {
                    self.process_chunk(
                        batch_start + offset,
                        total,
                        text,
                        &cleaned,
                        overlap_words,
                        &options,
                    )
                },
            ))
            .await;

            for (offset, outcome) in outcomes.into_iter().enumerate() {
                match outcome {
                    Ok(word_count) => {
                        succeeded += 1;
                        total_words += word_count;
                    }
                    Err(err) => {
                        failed += 1;
                        warn!(
                            chunk_index = batch_start + offset,
                            error = %err,
                            "chunk failed, continuing with siblings"
                        );
                    }
                }
            }

            if batch_end < total {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }

        Ok(IngestStats {
            chunks_total: total,
            chunks_succeeded: succeeded,
            chunks_failed: failed,
            total_words,
            total_characters: cleaned.len(),
            cleanup,
        })
    }

    async fn cleanup_previous(&self, options: &IngestOptions) -> SideEffect {
        let mut filter = DeleteFilter::default().title_prefix(options.title.clone());
        if let Some(category) = &options.category {
            filter = filter.category(category.clone());
        }
        match self.store.delete_where(filter).await {
            Ok(deleted) => {
                info!(deleted, title = %options.title, "cleaned up prior passages");
                SideEffect::Completed
            }
            Err(err) => {
                warn!(error = %err, "cleanup failed, continuing with ingestion");
                SideEffect::Failed(err.to_string())
            }
        }
    }

    /// Embeds and stores one chunk, returning its word count on success.
    #[allow(clippy::too_many_arguments)]
    async fn process_chunk(
        &self,
        chunk_index: usize,
        total_chunks: usize,
        text: &str,
        cleaned: &str,
        overlap_words: usize,
        options: &IngestOptions,
    ) -> Result<usize, RagError> {
        let embedding = self.embedder.embed(text).await?;

        let word_count = text.split_whitespace().count();
        let prefix: String = text.chars().take(50).collect();
        let start_position = cleaned.find(&prefix);
        let metadata = PassageMetadata {
            chunk_index,
            total_chunks,
            embedding: Some(embedding),
            source_document: options.title.clone(),
            chunk_size: text.len(),
            overlap_size: overlap_words,
            start_position: start_position.unwrap_or(0),
            end_position: start_position.map(|s| s + text.len()).unwrap_or(0),
            word_count,
        };

        let mut passage = Passage::new(
            format!(
                "{} (Part {}/{})",
                options.title,
                chunk_index + 1,
                total_chunks
            ),
            text,
        )
        .with_metadata(metadata);
        if let Some(category) = &options.category {
            passage = passage.with_category(category.clone());
        }

        self.store.insert(passage).await?;
        Ok(word_count)
    }
}
