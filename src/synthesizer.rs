//! Grounded answer synthesis with model fallback.
//!
//! The prompt pins the model to the retrieved excerpts and a strict output
//! shape; candidate models are discovered at call time and tried in
//! preference order, because model availability varies by deployment and
//! account and must never be a hard dependency on one model name.

use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::services::{GenerativeService, ModelInfo};
use crate::types::RagError;

/// Literal the model must emit when no excerpt answers the question.
pub const NO_ANSWER_SENTINEL: &str = "I don't know based on the provided document.";

/// Separator between excerpts inside the prompt.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// A synthesized answer and the model that produced it.
#[derive(Clone, Debug)]
pub struct Synthesis {
    pub answer: String,
    pub model: String,
}

/// Builds the grounded prompt for a question and its context excerpts.
pub fn build_prompt(query: &str, context: &[String]) -> String {
    let excerpts = context.join(CONTEXT_DELIMITER);
    format!(
        r#"You are a helpful assistant. Answer ONLY using the provided excerpts from the policy handbook. If there is truly no relevant information in the excerpts, reply exactly: "{NO_ANSWER_SENTINEL}" Otherwise, give a concise, clear answer. Be decisive if the excerpts contain relevant rules.

Rules (plain text, no markdown tables):
- First line: state the exact numeric requirement(s) if present (e.g., "Eligible with >=80% attendance per course").
- Then up to 4 bullets (start with "- ") covering: counting period, relaxations/allowances, documentation deadlines, consequences of shortfall.
- Prefer concrete rules, numbers, limits, and eligibility criteria.
- Total length <= 120 words.
- No introductions, no disclaimers, no references to "document" or "context".
- Paraphrase; do not quote large passages.

Question:
"""{query}"""

Excerpts:
"""
{excerpts}
"""

Answer:"#
    )
}

/// Orders generation-capable models: exact preference matches first, then
/// any remaining `flash` model, then anything else that can generate.
///
/// Vendor naming is only touched here; the rest of the pipeline works with
/// opaque model names.
pub fn rank_candidates(models: &[ModelInfo], preferred: &[String]) -> Vec<String> {
    let usable: Vec<&str> = models
        .iter()
        .filter(|m| m.supports_generation())
        .map(|m| m.name.as_str())
        .collect();

    let mut ranked: Vec<String> = Vec::new();
    for p in preferred {
        if usable.contains(&p.as_str()) && !ranked.iter().any(|r| r == p) {
            ranked.push(p.clone());
        }
    }
    for u in &usable {
        let lowered = u.to_lowercase();
        if lowered.contains("gemini") && lowered.contains("flash") && !ranked.iter().any(|r| r == u)
        {
            ranked.push((*u).to_string());
        }
    }
    for u in &usable {
        if !ranked.iter().any(|r| r == u) {
            ranked.push((*u).to_string());
        }
    }
    ranked
}

/// Synthesizes an answer for `query` from `context`, trying ranked model
/// candidates until one returns non-empty text.
///
/// Fails with [`RagError::Generation`] carrying the last observed failure
/// once every candidate has been tried.
pub async fn synthesize(
    service: &dyn GenerativeService,
    query: &str,
    context: &[String],
    config: &PipelineConfig,
) -> Result<Synthesis, RagError> {
    let prompt = build_prompt(query, context);
    let models = service.list_models().await?;
    let candidates = rank_candidates(&models, &config.preferred_models);
    if candidates.is_empty() {
        return Err(RagError::Generation("no usable model".to_string()));
    }

    let mut last_failure = String::new();
    for model in &candidates {
        match service.generate(model, &prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                debug!(%model, "synthesis succeeded");
                return Ok(Synthesis {
                    answer: text,
                    model: model.clone(),
                });
            }
            Ok(_) => {
                last_failure = "empty response".to_string();
                warn!(%model, "candidate returned empty text, trying next");
            }
            Err(err) => {
                last_failure = err.to_string();
                warn!(%model, error = %last_failure, "candidate failed, trying next");
            }
        }
    }
    Err(RagError::Generation(last_failure))
}
