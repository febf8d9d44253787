//! Confidence scoring from retrieval quality.
//!
//! ```text
//! confidence = clamp(round(70 * s0 + 10 * c - p), 0, 100)
//! ```
//!
//! - `s0`: score of the top result (0 when nothing was retrieved)
//! - `c`: results other than the top scoring at least the relevance floor,
//!   capped at 3
//! - `p`: 15 when the answer references none of the retrieved snippets
//!
//! An answer references a snippet when it carries that snippet's `[S<n>]`
//! tag, or shares a number token or at least two content words with it.

use campus_knowledge::text::{content_words, number_tokens};
use campus_knowledge::RetrievalResult;
use std::collections::HashSet;

const TOP_SCORE_WEIGHT: f32 = 70.0;
const CORROBORATION_WEIGHT: f32 = 10.0;
const MAX_CORROBORATING: usize = 3;
const UNREFERENCED_PENALTY: f32 = 15.0;
const MIN_CONTENT_WORD_CHARS: usize = 4;
const MIN_SHARED_WORDS: usize = 2;

/// Score an answer produced from `results` (ranked best first).
pub fn score(results: &[RetrievalResult], answer: &str, floor: f32) -> u8 {
    let Some(top) = results.first() else {
        return 0;
    };

    let corroborating = results[1..]
        .iter()
        .filter(|r| r.score >= floor)
        .count()
        .min(MAX_CORROBORATING);
    let penalty = if references_any(answer, results) {
        0.0
    } else {
        UNREFERENCED_PENALTY
    };

    let raw = TOP_SCORE_WEIGHT * top.score.clamp(0.0, 1.0)
        + CORROBORATION_WEIGHT * corroborating as f32
        - penalty;
    raw.round().clamp(0.0, 100.0) as u8
}

/// Whether `answer` draws on any of `results`.
pub fn references_any(answer: &str, results: &[RetrievalResult]) -> bool {
    let answer_words: HashSet<String> = content_words(answer, MIN_CONTENT_WORD_CHARS)
        .into_iter()
        .collect();
    let answer_numbers: HashSet<String> = number_tokens(answer).into_iter().collect();

    results.iter().enumerate().any(|(i, result)| {
        if answer.contains(&citation_tag(i)) {
            return true;
        }

        let snippet = &result.item.text;
        if number_tokens(snippet)
            .iter()
            .any(|n| answer_numbers.contains(n))
        {
            return true;
        }

        let shared: HashSet<String> = content_words(snippet, MIN_CONTENT_WORD_CHARS)
            .into_iter()
            .filter(|w| answer_words.contains(w))
            .collect();
        shared.len() >= MIN_SHARED_WORDS
    })
}

/// Citation tag of the result at `index` in the prompt.
pub fn citation_tag(index: usize) -> String {
    format!("[S{}]", index + 1)
}
