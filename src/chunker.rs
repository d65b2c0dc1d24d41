//! Content-adaptive chunking of normalized text.
//!
//! Chunk boundaries follow the document rather than a fixed width: text is
//! split on paragraph separators, paragraphs into sentences, and sentences
//! accumulate into a buffer that flushes near the size bound. A word-level
//! overlap is carried from each flushed chunk into the next so a rule split
//! across a boundary stays fully readable from at least one chunk.

static PARAGRAPH_SPLIT: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
    regex::Regex::new(r"\n{2,}").expect("valid paragraph-split pattern")
});

/// Splits `text` into overlapping chunks of at most roughly `max_size`
/// characters, carrying the last `overlap_words` words across boundaries.
///
/// The bound is soft: a sentence appended to a near-empty buffer may push a
/// chunk slightly past `max_size`, since sentences are never cut mid-word.
/// Chunks shorter than `min(60, max_size * 8%)` characters are discarded as
/// degenerate trailing fragments.
pub fn chunk(text: &str, max_size: usize, overlap_words: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for paragraph in PARAGRAPH_SPLIT.split(text) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        for sentence in split_sentences(paragraph) {
            push_with_overlap(&mut chunks, &mut current, sentence, max_size, overlap_words);
        }
        // Paragraph boundaries are preferred cut points: flush early rather
        // than straddle one when the buffer is nearly full.
        if current.len() as f64 > max_size as f64 * 0.9 {
            chunks.push(current.trim().to_string());
            current.clear();
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    let min_len = 60.min((max_size as f64 * 0.08).floor() as usize);
    chunks.retain(|c| c.len() > min_len);
    chunks
}

/// Appends a sentence to the running buffer, flushing the buffer first when
/// the sentence would push it past `max_size`. The flushed buffer's last
/// `overlap_words` words seed the next buffer.
fn push_with_overlap(
    chunks: &mut Vec<String>,
    current: &mut String,
    sentence: &str,
    max_size: usize,
    overlap_words: usize,
) {
    let add_len = sentence.len() + if current.is_empty() { 0 } else { 1 };
    if current.len() + add_len > max_size && !current.is_empty() {
        chunks.push(current.trim().to_string());
        if overlap_words > 0 {
            let words: Vec<&str> = current.split_whitespace().collect();
            let carry = words.len().min(overlap_words);
            *current = words[words.len() - carry..].join(" ");
        } else {
            current.clear();
        }
    }
    if !current.is_empty() {
        current.push(' ');
    }
    current.push_str(sentence);
}

/// Splits a paragraph into sentences on end-of-sentence punctuation followed
/// by whitespace and a capital letter, digit, quote, opening bracket, or
/// asterisk.
///
/// The continuation check keeps abbreviations like "approx. two weeks"
/// intact; this is a boundary heuristic, not a full sentence tokenizer.
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut iter = paragraph.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let after_punct = i + c.len_utf8();
        let rest = &paragraph[after_punct..];
        let trimmed = rest.trim_start();
        let ws_len = rest.len() - trimmed.len();
        if ws_len == 0 {
            continue;
        }
        let Some(next) = trimmed.chars().next() else {
            continue;
        };
        if starts_sentence(next) {
            let sentence = paragraph[start..after_punct].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = after_punct + ws_len;
            while iter.peek().is_some_and(|&(j, _)| j < start) {
                iter.next();
            }
        }
    }

    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn starts_sentence(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '(' | '"' | '\'' | '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk(
            "Minimum 75% attendance is mandatory for appearing in examinations.",
            1200,
            120,
        );
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn sentence_boundary_heuristic_skips_lowercase_continuations() {
        let sentences =
            split_sentences("Submit within approx. two weeks. Late entries are rejected.");
        assert_eq!(
            sentences,
            vec![
                "Submit within approx. two weeks.",
                "Late entries are rejected."
            ]
        );
    }

    #[test]
    fn sentence_boundary_accepts_digits_and_quotes() {
        let sentences = split_sentences("Rule one applies. 75% is the floor. \"Exceptions\" need approval.");
        assert_eq!(sentences.len(), 3);
    }

    #[test]
    fn overlap_carries_trailing_words() {
        let text = "Attendance below the floor leads to debarment from examinations. \
                    Medical certificates must be submitted within seven days of absence. \
                    Approved certificates restore eligibility for the affected courses.";
        let chunks = chunk(text, 80, 5);
        assert!(chunks.len() >= 2, "expected multiple chunks, got {chunks:?}");
        for pair in chunks.windows(2) {
            let prev_words: Vec<&str> = pair[0].split_whitespace().collect();
            let carry: Vec<&str> = prev_words[prev_words.len().saturating_sub(5)..].to_vec();
            assert!(
                pair[1].starts_with(&carry.join(" ")),
                "chunk should begin with the previous chunk's overlap words"
            );
        }
    }

    #[test]
    fn overlap_never_exceeds_configured_words() {
        let text = "One two three four five six. Seven eight nine ten eleven twelve. \
                    Thirteen fourteen fifteen sixteen seventeen eighteen.";
        let overlap = 3;
        let chunks = chunk(text, 40, overlap);
        for pair in chunks.windows(2) {
            let prev_words: Vec<&str> = pair[0].split_whitespace().collect();
            let next_words: Vec<&str> = pair[1].split_whitespace().collect();
            let mut shared = 0;
            for n in (1..=prev_words.len().min(next_words.len())).rev() {
                if prev_words[prev_words.len() - n..] == next_words[..n] {
                    shared = n;
                    break;
                }
            }
            assert!(shared <= overlap, "overlap {shared} exceeds limit {overlap}");
        }
    }

    #[test]
    fn discards_degenerate_fragments() {
        let max_size = 1200;
        let min_len = 60.min((max_size as f64 * 0.08).floor() as usize);
        let chunks = chunk("Tiny.", max_size, 120);
        assert!(chunks.is_empty());
        let chunks = chunk(
            "This sentence is comfortably longer than the minimum fragment filter threshold.",
            max_size,
            120,
        );
        assert!(chunks.iter().all(|c| c.len() > min_len));
    }

    #[test]
    fn paragraph_near_capacity_flushes_at_boundary() {
        let para_a = "This paragraph carries enough text to pass ninety percent of the bound easily.";
        let para_b = "A fresh paragraph should then start its own chunk cleanly.";
        let text = format!("{para_a}\n\n{para_b}");
        let chunks = chunk(&text, 85, 0);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], para_a);
        assert_eq!(chunks[1], para_b);
    }

    // Ingesting a small policy blurb with a tight bound must keep whole
    // sentences per chunk.
    #[test]
    fn tight_bound_preserves_sentence_boundaries() {
        let text = "Attendance: 75% required. Submit medical certificates within 7 days.";
        let chunks = chunk(text, 40, 2);
        assert!(chunks.len() >= 2, "expected at least two chunks: {chunks:?}");
        for c in &chunks {
            assert!(
                c.ends_with('.') || c.ends_with('?') || c.ends_with('!'),
                "chunk should end on a sentence boundary: {c:?}"
            );
        }
        assert!(chunks[0].contains("75% required."));
        assert!(chunks.last().unwrap().contains("within 7 days."));
    }
}
