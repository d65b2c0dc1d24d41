//! Query orchestration: question in, grounded answer (or hits) out.
//!
//! Two read paths share the storage and embedding seams:
//!
//! * [`QueryPipeline::answer`] — embed the question, rank with heuristic
//!   boosts, expand neighbor context, and synthesize a grounded answer. A
//!   primary pass that comes up empty, fails synthesis, or declines with the
//!   no-answer sentinel is retried through a broader unboosted pass; only
//!   when that also produces nothing does the caller get the fixed apology
//!   text instead of an error.
//! * [`QueryPipeline::search`] — embed and rank only, returning scored hits
//!   with no synthesis step.
//!
//! Question logging is best effort and never blocks or fails an answer.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::ranker::{expand_context, rank_for_answer, rank_for_search};
use crate::services::{EmbeddingService, GenerativeService};
use crate::store::{Passage, PassageStore, QueryLog};
use crate::synthesizer::{synthesize, NO_ANSWER_SENTINEL};
use crate::types::{RagError, SideEffect};

/// Returned verbatim when neither ranking pass finds relevant passages.
pub const APOLOGY: &str =
    "I could not find relevant information in the document to answer your question.";

/// Provenance of one passage that contributed to an answer.
#[derive(Clone, Debug)]
pub struct SourceRef {
    pub id: String,
    pub title: String,
    pub chunk_index: usize,
    pub similarity: f32,
}

/// A complete answer-path result.
#[derive(Clone, Debug)]
pub struct AnswerOutcome {
    /// Synthesized answer, or [`APOLOGY`] when nothing relevant was stored.
    pub answer: String,
    /// Model that produced the answer; `None` on the apology path.
    pub used_model: Option<String>,
    /// Ranked passages behind the answer, best first.
    pub sources: Vec<SourceRef>,
    /// Whether the question reached the query log.
    pub query_logged: SideEffect,
}

/// One scored hit on the exploratory search path.
#[derive(Clone, Debug)]
pub struct SearchHit {
    pub passage: Passage,
    pub similarity: f32,
}

/// Read-side orchestrator over storage, embeddings, and generation.
pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingService>,
    generator: Arc<dyn GenerativeService>,
    store: Arc<dyn PassageStore>,
    query_log: Option<Arc<dyn QueryLog>>,
    config: PipelineConfig,
}

impl QueryPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingService>,
        generator: Arc<dyn GenerativeService>,
        store: Arc<dyn PassageStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            embedder,
            generator,
            store,
            query_log: None,
            config,
        }
    }

    /// Attaches a query log. Logging failures are folded into
    /// [`AnswerOutcome::query_logged`], never propagated.
    #[must_use]
    pub fn with_query_log(mut self, log: Arc<dyn QueryLog>) -> Self {
        self.query_log = Some(log);
        self
    }

    /// Answers `question` from the stored passages.
    ///
    /// `top_k` is clamped into the configured range before ranking. The
    /// primary pass ranks with heuristic boosts and expands neighbor
    /// context; any synthesis failure or a no-answer sentinel there is
    /// treated as recoverable and retried through the broader fallback pass
    /// with raw passage contents. Only validation, embedding, and storage
    /// failures surface as errors; when both passes come up empty the
    /// caller gets the apology outcome instead of a raw internal failure.
    pub async fn answer(&self, question: &str, top_k: usize) -> Result<AnswerOutcome, RagError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::Validation("question is required".to_string()));
        }

        let query_logged = self.log_question(question).await;
        let query_vector = self.embedder.embed(question).await?;
        let passages = self.store.select_all().await?;

        let ranked = rank_for_answer(&query_vector, &passages, top_k, &self.config);
        if !ranked.is_empty() {
            let context = expand_context(&ranked, &passages, &self.config);
            match synthesize(self.generator.as_ref(), question, &context, &self.config).await {
                Ok(synthesis) if synthesis.answer.trim() != NO_ANSWER_SENTINEL => {
                    return Ok(AnswerOutcome {
                        answer: synthesis.answer,
                        used_model: Some(synthesis.model),
                        sources: source_refs(&ranked),
                        query_logged,
                    });
                }
                Ok(_) => debug!("primary synthesis declined to answer, trying fallback pass"),
                Err(err) => warn!(error = %err, "primary synthesis failed, trying fallback pass"),
            }
        }

        // Broader unboosted pass over the search floor; raw contents, no
        // neighbor expansion.
        let fallback = rank_for_search(
            &query_vector,
            &passages,
            self.config.fallback_limit,
            &self.config,
        );
        if !fallback.is_empty() {
            debug!(hits = fallback.len(), "running fallback pass");
            let context: Vec<String> = fallback.iter().map(|(p, _)| p.content.clone()).collect();
            match synthesize(self.generator.as_ref(), question, &context, &self.config).await {
                Ok(synthesis) if synthesis.answer.trim() != NO_ANSWER_SENTINEL => {
                    return Ok(AnswerOutcome {
                        answer: synthesis.answer,
                        used_model: Some(synthesis.model),
                        sources: source_refs(&fallback),
                        query_logged,
                    });
                }
                Ok(_) => debug!("fallback synthesis declined to answer"),
                Err(err) => warn!(error = %err, "fallback synthesis failed"),
            }
        }

        info!(%question, "neither pass produced an answer, returning apology");
        Ok(AnswerOutcome {
            answer: APOLOGY.to_string(),
            used_model: None,
            sources: Vec::new(),
            query_logged,
        })
    }

    /// Exploratory search: scored hits over the search floor, best first.
    /// Questions are not logged on this path.
    pub async fn search(&self, question: &str, limit: usize) -> Result<Vec<SearchHit>, RagError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::Validation("question is required".to_string()));
        }

        let query_vector = self.embedder.embed(question).await?;
        let passages = self.store.select_all().await?;
        let ranked = rank_for_search(&query_vector, &passages, limit, &self.config);
        Ok(ranked
            .into_iter()
            .map(|(passage, similarity)| SearchHit {
                passage,
                similarity,
            })
            .collect())
    }

    async fn log_question(&self, question: &str) -> SideEffect {
        match &self.query_log {
            None => SideEffect::Skipped,
            Some(log) => match log.record(question).await {
                Ok(()) => SideEffect::Completed,
                Err(err) => {
                    warn!(error = %err, "query log write failed, continuing");
                    SideEffect::Failed(err.to_string())
                }
            },
        }
    }
}

fn source_refs(ranked: &[(Passage, f32)]) -> Vec<SourceRef> {
    ranked
        .iter()
        .map(|(p, score)| SourceRef {
            id: p.id.clone(),
            title: p.title.clone(),
            chunk_index: p.metadata.chunk_index,
            similarity: *score,
        })
        .collect()
}
