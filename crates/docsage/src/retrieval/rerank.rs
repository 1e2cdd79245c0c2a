//! Lexical cross-scorer for re-ranking
//!
//! Scores a (question, passage) pair by weighted term overlap: each query
//! term found in the passage contributes, rarer (longer) terms and repeated
//! occurrences count for more, with diminishing returns. Runs in-process
//! with no model download; the scoring seam is where a cross-encoder would
//! plug in.

use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

/// Lexical (question, passage) scorer
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossScorer;

impl CrossScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score how well a passage answers a question; higher is better.
    pub fn score(&self, question: &str, passage: &str) -> f32 {
        let query_terms: Vec<String> = question
            .unicode_words()
            .map(|w| w.to_lowercase())
            .filter(|w| w.len() >= 2)
            .collect();
        if query_terms.is_empty() {
            return 0.0;
        }

        let mut passage_counts: HashMap<String, usize> = HashMap::new();
        for word in passage.unicode_words() {
            *passage_counts.entry(word.to_lowercase()).or_default() += 1;
        }

        let mut score = 0.0f32;
        for term in &query_terms {
            let count = passage_counts.get(term).copied().unwrap_or(0);
            if count > 0 {
                // Longer terms are rarer and carry more signal; repeats
                // saturate logarithmically.
                let weight = (term.len() as f32).sqrt();
                score += weight * (1.0 + (count as f32).ln());
            }
        }

        score / query_terms.len() as f32
    }
}
