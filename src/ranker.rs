//! Similarity ranking and context expansion over stored passages.
//!
//! Every stored passage is scored linearly against the query vector; there
//! is no vector index by design. Two heuristic boosts bias the answer path
//! toward rule-bearing passages (ones quoting percentages or eligibility
//! language) over narrative ones. The exploratory search path applies raw
//! cosine only, over its own broader floor.
//!
//! After ranking, [`expand_context`] pulls in chunk-index neighbors from the
//! same source document: a single chunk may hold only half of a
//! multi-sentence rule, and the neighbors recover the missing half without
//! requiring larger (and embedding-diluting) chunks.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::PipelineConfig;
use crate::store::Passage;

/// Matches a percentage-like numeral, e.g. `75%`.
static PERCENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,3}%").expect("valid percent pattern"));

/// Stems associated with eligibility/attendance/examination rules.
const RULE_KEYWORDS: [&str; 3] = ["attend", "examin", "eligib"];

/// Additive score bonus per matched heuristic.
const HEURISTIC_BOOST: f32 = 0.02;

/// Dedup key length for near-duplicate context suppression, in characters.
const DEDUP_PREFIX_CHARS: usize = 120;

/// Cosine similarity in [-1, 1]. Mismatched dimensions or a zero-magnitude
/// vector yield 0 rather than NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|y| y * y).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

/// Ranks passages for the answer path: cosine similarity plus heuristic
/// boosts, filtered by the answer floor, truncated to `top_k` clamped into
/// the configured range.
///
/// The sort is stable, so equal scores keep storage order and repeated calls
/// return identical orderings.
pub fn rank_for_answer(
    query: &[f32],
    passages: &[Passage],
    top_k: usize,
    config: &PipelineConfig,
) -> Vec<(Passage, f32)> {
    let mut scored: Vec<(Passage, f32)> = passages
        .iter()
        .map(|p| {
            let base = p
                .embedding()
                .map(|emb| cosine_similarity(query, emb))
                .unwrap_or(0.0);
            (p.clone(), base + heuristic_boost(&p.content))
        })
        .filter(|(_, score)| *score > config.answer_floor)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let k = top_k.clamp(config.answer_top_k_min, config.answer_top_k_max);
    scored.truncate(k);
    scored
}

/// Ranks passages for exploratory search: raw cosine over the broader
/// search floor, no boosts, truncated to `limit`.
pub fn rank_for_search(
    query: &[f32],
    passages: &[Passage],
    limit: usize,
    config: &PipelineConfig,
) -> Vec<(Passage, f32)> {
    let mut scored: Vec<(Passage, f32)> = passages
        .iter()
        .map(|p| {
            let score = p
                .embedding()
                .map(|emb| cosine_similarity(query, emb))
                .unwrap_or(0.0);
            (p.clone(), score)
        })
        .filter(|(_, score)| *score > config.search_floor)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(limit);
    scored
}

/// Boost applied on the answer path only: passages quoting percentages or
/// eligibility language tend to carry the actual rule.
fn heuristic_boost(content: &str) -> f32 {
    let mut boost = 0.0;
    if PERCENT_PATTERN.is_match(content) {
        boost += HEURISTIC_BOOST;
    }
    let lowered = content.to_lowercase();
    if RULE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        boost += HEURISTIC_BOOST;
    }
    boost
}

/// Assembles the context set for synthesis: each ranked hit's content plus
/// its chunk-index neighbors (offsets -1, +1, -2, +2) from the same source
/// document, regardless of their own similarity.
///
/// Near-duplicates are suppressed by a fixed-length content prefix, and the
/// set is capped at `config.max_context_passages`.
pub fn expand_context(
    ranked: &[(Passage, f32)],
    passages: &[Passage],
    config: &PipelineConfig,
) -> Vec<String> {
    let mut by_source: HashMap<&str, Vec<&Passage>> = HashMap::new();
    for passage in passages {
        by_source
            .entry(passage.metadata.source_document.as_str())
            .or_default()
            .push(passage);
    }
    for group in by_source.values_mut() {
        group.sort_by_key(|p| p.metadata.chunk_index);
    }

    let cap = config.max_context_passages;
    let mut context: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    let mut push = |context: &mut Vec<String>, seen: &mut Vec<String>, content: &str| {
        if context.len() >= cap {
            return;
        }
        let key: String = content.chars().take(DEDUP_PREFIX_CHARS).collect();
        if seen.contains(&key) {
            return;
        }
        seen.push(key);
        context.push(content.to_string());
    };

    for (passage, _) in ranked {
        push(&mut context, &mut seen, &passage.content);
        let group = by_source
            .get(passage.metadata.source_document.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let idx = passage.metadata.chunk_index as isize;
        for offset in [-1, 1, -2, 2] {
            let wanted = idx + offset;
            if wanted < 0 {
                continue;
            }
            if let Some(neighbor) = group
                .iter()
                .find(|p| p.metadata.chunk_index == wanted as usize)
            {
                push(&mut context, &mut seen, &neighbor.content);
            }
        }
        if context.len() >= cap {
            break;
        }
    }

    context
}
