//! Retrieval-augmented question answering over a policy handbook corpus.
//!
//! The crate covers both sides of a small RAG deployment:
//!
//! ```text
//!   ingestion                                query
//!   ---------                                -----
//!   raw text                                 question
//!      |                                        |
//!   preprocess::normalize                    EmbeddingService::embed
//!      |                                        |
//!   chunker::chunk                           ranker::rank_for_answer
//!      |                                        |
//!   EmbeddingService::embed (batched)        ranker::expand_context
//!      |                                        |
//!   PassageStore::insert                     synthesizer::synthesize
//!                                               |
//!                                            grounded answer + sources
//! ```
//!
//! Retrieval is a linear cosine scan over every stored passage. That is a
//! deliberate choice for corpora of hundreds of chunks: it keeps storage a
//! plain table, makes ranking exactly reproducible, and removes the index
//! maintenance that re-ingestion would otherwise require.
//!
//! External services sit behind the [`services::EmbeddingService`] and
//! [`services::GenerativeService`] traits; storage behind
//! [`store::PassageStore`] and [`store::QueryLog`]. The production
//! implementations speak the Gemini REST API ([`services::gemini`]) and
//! SQLite ([`store::sqlite`]); tests swap in [`services::MockEmbedder`] and
//! [`store::MemoryStore`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use handbook_rag::config::{PipelineConfig, ServiceConfig};
//! use handbook_rag::ingest::{IngestOptions, IngestionPipeline};
//! use handbook_rag::query::QueryPipeline;
//! use handbook_rag::services::{GeminiEmbedder, GeminiGenerator};
//! use handbook_rag::store::SqlitePassageStore;
//!
//! # async fn run() -> Result<(), handbook_rag::types::RagError> {
//! let service = ServiceConfig::from_env()?;
//! let config = PipelineConfig::default();
//! let store = Arc::new(SqlitePassageStore::open("handbook.db").await?);
//! let embedder = Arc::new(GeminiEmbedder::from_config(service.clone(), &config));
//!
//! let ingestion = IngestionPipeline::new(embedder.clone(), store.clone(), config.clone());
//! let stats = ingestion
//!     .ingest(
//!         &[std::fs::read_to_string("handbook.txt")
//!             .map_err(|e| handbook_rag::types::RagError::Validation(e.to_string()))?],
//!         IngestOptions::new("Student Handbook"),
//!     )
//!     .await?;
//! println!("stored {} of {} chunks", stats.chunks_succeeded, stats.chunks_total);
//!
//! let queries = QueryPipeline::new(
//!     embedder,
//!     Arc::new(GeminiGenerator::new(service)),
//!     store.clone(),
//!     config,
//! )
//! .with_query_log(store);
//! let outcome = queries.answer("What attendance is required?", 3).await?;
//! println!("{}", outcome.answer);
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod config;
pub mod ingest;
pub mod preprocess;
pub mod query;
pub mod ranker;
pub mod services;
pub mod store;
pub mod synthesizer;
pub mod types;

pub use config::{PipelineConfig, ServiceConfig};
pub use ingest::{IngestOptions, IngestStats, IngestionPipeline};
pub use query::{AnswerOutcome, QueryPipeline, SearchHit, SourceRef, APOLOGY};
pub use store::{Passage, PassageMetadata};
pub use types::{RagError, SideEffect};
