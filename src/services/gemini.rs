//! Gemini REST clients for embeddings and text generation.
//!
//! Both clients take their endpoint from [`ServiceConfig`], so tests can
//! point them at a local mock server. The embedding client owns the retry
//! policy; the generation client is a thin wire adapter and leaves candidate
//! selection to the synthesizer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{EmbeddingService, GenerativeService, ModelInfo};
use crate::config::{PipelineConfig, ServiceConfig};
use crate::types::RagError;

/// The embedding endpoint rejects oversized inputs; anything longer is cut
/// at this many characters before submission.
const MAX_EMBED_INPUT_CHARS: usize = 30_000;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: std::borrow::Cow<'a, str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Embedding client with bounded retry and exponential backoff.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Client,
    service: ServiceConfig,
    retries: u32,
    backoff_base: Duration,
}

impl GeminiEmbedder {
    pub fn new(service: ServiceConfig) -> Self {
        Self {
            client: Client::new(),
            service,
            retries: 3,
            backoff_base: Duration::from_secs(1),
        }
    }

    /// Builds an embedder whose retry policy comes from the pipeline
    /// configuration (`embed_retries`, `embed_backoff_base`).
    pub fn from_config(service: ServiceConfig, config: &PipelineConfig) -> Self {
        Self::new(service).with_backoff(config.embed_retries, config.embed_backoff_base)
    }

    /// Overrides the retry count and backoff base (`base * 2^attempt`).
    #[must_use]
    pub fn with_backoff(mut self, retries: u32, base: Duration) -> Self {
        self.retries = retries.max(1);
        self.backoff_base = base;
        self
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let url = format!(
            "{}/v1beta/models/{}:embedContent?key={}",
            self.service.base_url, self.service.embedding_model, self.service.api_key
        );
        let body = EmbedRequest {
            model: format!("models/{}", self.service.embedding_model),
            content: Content {
                parts: vec![Part {
                    text: truncate_chars(text, MAX_EMBED_INPUT_CHARS).into(),
                }],
            },
        };
        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!("status {status}: {detail}")));
        }
        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|err| RagError::Embedding(format!("malformed response: {err}")))?;
        Ok(parsed.embedding.values)
    }
}

#[async_trait]
impl EmbeddingService for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut last_failure = String::new();
        for attempt in 1..=self.retries {
            match self.embed_once(text).await {
                Ok(vector) => return Ok(vector),
                Err(err) => {
                    last_failure = err.to_string();
                    if attempt < self.retries {
                        let delay = self.backoff_base * 2u32.pow(attempt);
                        warn!(attempt, ?delay, error = %last_failure, "embedding attempt failed, backing off");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(RagError::Embedding(last_failure))
    }
}

/// Cuts `text` at a character (not byte) boundary.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<TurnContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct TurnContent<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<OwnedPart>,
}

#[derive(Deserialize)]
struct OwnedPart {
    #[serde(default)]
    text: String,
}

/// Generation client: model discovery plus single-shot completion.
#[derive(Clone)]
pub struct GeminiGenerator {
    client: Client,
    service: ServiceConfig,
}

impl GeminiGenerator {
    pub fn new(service: ServiceConfig) -> Self {
        Self {
            client: Client::new(),
            service,
        }
    }
}

#[async_trait]
impl GenerativeService for GeminiGenerator {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, RagError> {
        let url = format!("{}/v1beta/models", self.service.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.service.api_key)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(RagError::Generation(format!(
                "list models failed: status {status}: {detail}"
            )));
        }
        let parsed: ListModelsResponse = response
            .json()
            .await
            .map_err(|err| RagError::Generation(format!("malformed model list: {err}")))?;
        debug!(count = parsed.models.len(), "listed generation models");
        Ok(parsed.models)
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, RagError> {
        // `model` already carries the `models/` prefix as reported by the
        // listing endpoint.
        let url = format!("{}/v1beta/{}:generateContent", self.service.base_url, model);
        let body = GenerateRequest {
            contents: vec![TurnContent {
                role: "user",
                parts: vec![Part {
                    text: prompt.into(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 192,
            },
        };
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.service.api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(RagError::Generation(format!("status {status}: {detail}")));
        }
        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|err| RagError::Generation(format!("malformed response: {err}")))?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();
        Ok(text)
    }
}
