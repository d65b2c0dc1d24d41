#[macro_use]
extern crate proptest;

use std::collections::HashSet;

use proptest::prelude::{Strategy, prop};

use handbook_rag::chunker::chunk;

// Generators for synthetic sentence-structured documents

/// One sentence: a capitalized lead word, lowercase words, terminal period.
/// Matches what the splitter recognizes as a boundary, so generated
/// documents decompose back into exactly these sentences.
fn sentence_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::string::string_regex("[a-z]{1,8}").unwrap(), 1..12)
        .prop_map(|words| format!("Rule {}.", words.join(" ")))
}

fn sentences_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(sentence_strategy(), 1..20)
}

proptest! {
    #[test]
    fn prop_chunking_is_deterministic(
        sentences in sentences_strategy(),
        max_size in 40usize..400,
        overlap in 0usize..8,
    ) {
        let doc = sentences.join(" ");
        prop_assert_eq!(
            chunk(&doc, max_size, overlap),
            chunk(&doc, max_size, overlap)
        );
    }

    #[test]
    fn prop_chunks_clear_the_fragment_filter(
        sentences in sentences_strategy(),
        max_size in 40usize..400,
        overlap in 0usize..8,
    ) {
        let doc = sentences.join(" ");
        let min_len = 60.min((max_size as f64 * 0.08).floor() as usize);
        for c in chunk(&doc, max_size, overlap) {
            prop_assert!(!c.trim().is_empty());
            prop_assert!(c.len() > min_len);
        }
    }

    #[test]
    fn prop_chunk_words_come_from_the_document(
        sentences in sentences_strategy(),
        max_size in 40usize..400,
        overlap in 0usize..8,
    ) {
        let doc = sentences.join(" ");
        let vocabulary: HashSet<&str> = doc.split_whitespace().collect();
        for c in chunk(&doc, max_size, overlap) {
            for word in c.split_whitespace() {
                prop_assert!(
                    vocabulary.contains(word),
                    "chunk word {:?} not present in source", word
                );
            }
        }
    }

    // The size bound is soft: a chunk may exceed it only by what a single
    // sentence appended to the overlap seed can contribute.
    #[test]
    fn prop_size_bound_is_soft_but_bounded(
        sentences in sentences_strategy(),
        max_size in 40usize..400,
        overlap in 0usize..8,
    ) {
        let doc = sentences.join(" ");
        let longest_sentence = sentences.iter().map(String::len).max().unwrap_or(0);
        // Generated words are at most 9 chars including a terminal period,
        // plus a joining space each.
        let overlap_chars = overlap * 10;
        let ceiling = max_size.max(overlap_chars + 1 + longest_sentence);
        for c in chunk(&doc, max_size, overlap) {
            prop_assert!(
                c.len() <= ceiling,
                "chunk of {} exceeds ceiling {}", c.len(), ceiling
            );
        }
    }

    // With zero overlap and sentences long enough that the fragment filter
    // can never trigger, the chunks partition the document: concatenating
    // their words reproduces the source word for word.
    #[test]
    fn prop_zero_overlap_chunks_cover_the_document(
        sentences in prop::collection::vec(
            prop::collection::vec(
                prop::string::string_regex("[a-z]{4,8}").unwrap(),
                4..10,
            )
            .prop_map(|words| format!("Rule {}.", words.join(" "))),
            1..20,
        ),
        max_size in 40usize..300,
    ) {
        let doc = sentences.join(" ");
        let chunks = chunk(&doc, max_size, 0);
        let rebuilt: Vec<&str> = chunks
            .iter()
            .flat_map(|c| c.split_whitespace())
            .collect();
        let original: Vec<&str> = doc.split_whitespace().collect();
        prop_assert_eq!(rebuilt, original);
    }

    #[test]
    fn prop_generous_bound_yields_the_whole_document(
        sentences in sentences_strategy(),
        overlap in 0usize..8,
    ) {
        let doc = sentences.join(" ");
        prop_assume!(doc.len() > 60);
        let chunks = chunk(&doc, doc.len() + 10, overlap);
        prop_assert_eq!(chunks, vec![doc]);
    }
}
