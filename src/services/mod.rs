//! External service seams: embeddings and text generation.
//!
//! The pipeline only ever sees these traits; the production implementations
//! in [`gemini`] speak the Gemini REST wire format, and [`MockEmbedder`]
//! provides deterministic vectors for tests and offline demos.

pub mod gemini;

use async_trait::async_trait;
use serde::Deserialize;

use crate::types::RagError;

pub use gemini::{GeminiEmbedder, GeminiGenerator};

/// Converts a text into a fixed-length embedding vector.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
}

/// A generation model advertised by the external service.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Fully qualified name, e.g. `models/gemini-2.5-flash`.
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Whether the model advertises text-generation support.
    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}

/// Generative-text service: model discovery plus prompt completion.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, RagError>;

    /// Completes `prompt` with the given model. An empty completion is a
    /// valid `Ok`; callers decide whether to fall through to the next
    /// candidate.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, RagError>;
}

/// Deterministic hash-seeded embedder for tests and demos.
///
/// Identical inputs always produce identical vectors; distinct inputs
/// produce distinct ones with overwhelming probability. The vectors carry no
/// semantic signal, so tests asserting on ranking should construct passage
/// embeddings explicitly instead.
#[derive(Clone, Debug, Default)]
pub struct MockEmbedder {
    dims: usize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self { dims: 8 }
    }

    #[must_use]
    pub fn with_dims(mut self, dims: usize) -> Self {
        self.dims = dims;
        self
    }
}

#[async_trait]
impl EmbeddingService for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();
        Ok((0..self.dims)
            .map(|i| {
                let bits = seed.rotate_left((i * 8) as u32) ^ ((i as u64) << 24);
                (bits as f32) / u32::MAX as f32
            })
            .collect())
    }
}
