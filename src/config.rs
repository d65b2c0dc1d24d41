//! Explicitly constructed configuration for the pipeline and its clients.
//!
//! Nothing in this crate reads ambient process state at call time: service
//! endpoints and tuning knobs are captured in these structs at construction,
//! which lets tests point every component at fake endpoints. The only
//! environment access is the opt-in [`ServiceConfig::from_env`] helper.

use std::time::Duration;

/// Connection settings for the external embedding/generation service.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// API key passed to the service.
    pub api_key: String,
    /// Base URL, e.g. `https://generativelanguage.googleapis.com`.
    /// Overridable so tests can target a local mock server.
    pub base_url: String,
    /// Embedding model identifier, without the `models/` prefix.
    pub embedding_model: String,
}

impl ServiceConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            embedding_model: "text-embedding-004".to_string(),
        }
    }

    /// Reads `GEMINI_API_KEY` (and optionally `GEMINI_BASE_URL`) from the
    /// environment, loading a `.env` file when present.
    pub fn from_env() -> Result<Self, crate::types::RagError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            crate::types::RagError::Validation("GEMINI_API_KEY not found".to_string())
        })?;
        let base_url = std::env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
        Ok(Self::new(api_key, base_url))
    }

    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }
}

/// Tuning knobs for chunking, batching, ranking, and synthesis.
///
/// Defaults mirror the production deployment; every field is plain data so
/// a test can tighten or relax a single knob without touching the rest.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Soft upper bound on chunk size, in characters.
    pub chunk_size: usize,
    /// Words carried over from one chunk into the next.
    pub overlap_words: usize,
    /// Chunks embedded-and-stored concurrently per ingestion batch.
    pub batch_size: usize,
    /// Pause between ingestion batches, to respect service rate limits.
    pub batch_delay: Duration,
    /// Embedding retry attempts before surfacing the failure.
    pub embed_retries: u32,
    /// Base for the exponential embedding backoff (`base * 2^attempt`).
    pub embed_backoff_base: Duration,
    /// Similarity floor for the answer path. Scores at or below are dropped.
    pub answer_floor: f32,
    /// Similarity floor for the exploratory search path. Kept separate from
    /// `answer_floor`: the divergence is inherited and deliberate.
    pub search_floor: f32,
    /// Clamp range for `top_k` on the answer path.
    pub answer_top_k_min: usize,
    pub answer_top_k_max: usize,
    /// Hard cap on the assembled context set after neighbor expansion.
    pub max_context_passages: usize,
    /// Passages pulled through the broader search floor by the fallback path.
    pub fallback_limit: usize,
    /// Generation model candidates, most preferred first. Entries carry the
    /// full `models/` prefix as reported by the service.
    pub preferred_models: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1200,
            overlap_words: 120,
            batch_size: 5,
            batch_delay: Duration::from_secs(1),
            embed_retries: 3,
            embed_backoff_base: Duration::from_secs(1),
            answer_floor: 0.05,
            search_floor: 0.1,
            answer_top_k_min: 3,
            answer_top_k_max: 6,
            max_context_passages: 10,
            fallback_limit: 8,
            preferred_models: vec![
                "models/gemini-2.5-flash".to_string(),
                "models/gemini-2.5-flash-lite".to_string(),
                "models/gemini-1.5-flash".to_string(),
                "models/gemini-1.5-flash-latest".to_string(),
            ],
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn with_chunking(mut self, chunk_size: usize, overlap_words: usize) -> Self {
        self.chunk_size = chunk_size;
        self.overlap_words = overlap_words;
        self
    }

    #[must_use]
    pub fn with_batching(mut self, batch_size: usize, batch_delay: Duration) -> Self {
        self.batch_size = batch_size;
        self.batch_delay = batch_delay;
        self
    }

    #[must_use]
    pub fn with_embed_backoff(mut self, retries: u32, base: Duration) -> Self {
        self.embed_retries = retries;
        self.embed_backoff_base = base;
        self
    }
}
