//! Citation linking
//!
//! Maps `[n]` markers in generated text back to the supplied passages.
//! Markers outside the supplied range are dropped, never turned into
//! fabricated citations. When the text carries no markers at all but
//! passages were supplied, the top passages are cited so an answer built
//! from context is never returned unattributed.

use regex::Regex;
use std::sync::OnceLock;

use crate::retrieval::Passage;
use crate::types::Citation;

/// How many top passages to cite when the answer has no explicit markers
const IMPLICIT_CITATIONS: usize = 3;

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[(\d+)\]").expect("valid marker regex"))
}

/// Extract the citations an answer actually drew upon.
///
/// Returns the answer unchanged alongside the linked citations, ordered by
/// first reference and deduplicated by chunk id.
pub fn link_citations(answer: &str, passages: &[Passage]) -> (String, Vec<Citation>) {
    let mut citations: Vec<Citation> = Vec::new();

    for capture in marker_pattern().captures_iter(answer) {
        let Ok(marker) = capture[1].parse::<usize>() else {
            continue;
        };
        // Markers are 1-based; anything out of range was not supplied.
        if marker == 0 || marker > passages.len() {
            continue;
        }
        let citation = passages[marker - 1].payload.citation();
        if !citations.iter().any(|c| c.chunk_id == citation.chunk_id) {
            citations.push(citation);
        }
    }

    if citations.is_empty() && !passages.is_empty() {
        for passage in passages.iter().take(IMPLICIT_CITATIONS) {
            citations.push(passage.payload.citation());
        }
    }

    (answer.to_string(), citations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ChunkPayload;
    use uuid::Uuid;

    fn passages(n: usize) -> Vec<Passage> {
        let doc = Uuid::new_v4();
        (0..n)
            .map(|i| Passage {
                payload: ChunkPayload {
                    chunk_id: format!("c-{}", i),
                    document_id: doc,
                    filename: "notes.pdf".to_string(),
                    page_start: i as u32 + 1,
                    page_end: i as u32 + 1,
                    position: i as u32,
                    text: format!("passage {}", i),
                },
                similarity: 1.0 - i as f32 * 0.1,
                rerank_score: None,
            })
            .collect()
    }

    #[test]
    fn markers_link_in_first_reference_order() {
        let passages = passages(3);
        let (_, citations) = link_citations("See [2] and also [1]. Again [2].", &passages);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].chunk_id, "c-1");
        assert_eq!(citations[1].chunk_id, "c-0");
    }

    #[test]
    fn out_of_range_markers_are_dropped_not_invented() {
        let passages = passages(2);
        let (_, citations) = link_citations("Claim [1], bogus [7], zero [0].", &passages);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].chunk_id, "c-0");
    }

    #[test]
    fn no_markers_falls_back_to_top_passages() {
        let passages = passages(5);
        let (_, citations) = link_citations("An answer with no markers.", &passages);
        assert_eq!(citations.len(), IMPLICIT_CITATIONS);
        assert_eq!(citations[0].chunk_id, "c-0");
    }

    #[test]
    fn no_passages_means_no_citations() {
        let (_, citations) = link_citations("Nothing indexed [1].", &[]);
        assert!(citations.is_empty());
    }
}
