//! Deterministic templated generator
//!
//! Fallback used when no language-model credential is configured. Builds an
//! answer directly from the top passage(s) with `[n]` markers and no
//! invented prose. Also the generator every test runs against, since it
//! needs no network.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;
use crate::retrieval::Passage;

use super::{GeneratorBackend, HistoryTurns};

/// Answer returned when retrieval produced nothing
pub const NO_CONTEXT_ANSWER: &str =
    "No relevant context was found in the indexed documents for this question.";

/// How many leading sentences of the top passage the template quotes
const LEAD_SENTENCES: usize = 2;

/// Deterministic generator templating answers from retrieved passages
pub struct TemplateGenerator;

impl TemplateGenerator {
    pub fn new() -> Self {
        Self
    }

    fn render(&self, passages: &[Passage]) -> String {
        let Some(top) = passages.first() else {
            return NO_CONTEXT_ANSWER.to_string();
        };

        let lead: String = top
            .payload
            .text
            .split_sentence_bounds()
            .take(LEAD_SENTENCES)
            .collect::<String>()
            .trim()
            .to_string();

        let mut answer = format!("Based on the indexed documents: {} [1]", lead);
        if passages.len() > 1 {
            answer.push_str(" See also [2].");
        }
        answer
    }
}

impl Default for TemplateGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GeneratorBackend for TemplateGenerator {
    async fn generate(
        &self,
        _question: &str,
        passages: &[Passage],
        _history: &HistoryTurns,
    ) -> Result<String> {
        Ok(self.render(passages))
    }

    async fn generate_stream(
        &self,
        question: &str,
        passages: &[Passage],
        history: &HistoryTurns,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let answer = self.generate(question, passages, history).await?;
        // Flush word by word so the transport path is exercised the same way
        // a token stream would.
        let fragments: Vec<Result<String>> = answer
            .split_inclusive(' ')
            .map(|fragment| Ok(fragment.to_string()))
            .collect();
        Ok(futures_util::stream::iter(fragments).boxed())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "template"
    }

    fn model(&self) -> &str {
        "template"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ChunkPayload;
    use uuid::Uuid;

    fn passage(text: &str) -> Passage {
        Passage {
            payload: ChunkPayload {
                chunk_id: "c-0".to_string(),
                document_id: Uuid::new_v4(),
                filename: "a.txt".to_string(),
                page_start: 1,
                page_end: 1,
                position: 0,
                text: text.to_string(),
            },
            similarity: 0.8,
            rerank_score: None,
        }
    }

    #[tokio::test]
    async fn empty_passages_yield_no_context_answer() {
        let generator = TemplateGenerator::new();
        let answer = generator.generate("anything", &[], &[]).await.unwrap();
        assert_eq!(answer, NO_CONTEXT_ANSWER);
        assert!(!answer.is_empty());
    }

    #[tokio::test]
    async fn answer_quotes_top_passage_with_marker() {
        let generator = TemplateGenerator::new();
        let passages = vec![passage("Refunds are issued within thirty days. Contact support to start one. Further details follow.")];
        let answer = generator.generate("refunds?", &passages, &[]).await.unwrap();
        assert!(answer.contains("Refunds are issued within thirty days."));
        assert!(answer.contains("[1]"));
        assert!(!answer.contains("Further details follow"));
    }

    #[tokio::test]
    async fn stream_concatenates_to_full_answer() {
        let generator = TemplateGenerator::new();
        let passages = vec![passage("Alpha beta gamma.")];
        let full = generator.generate("q", &passages, &[]).await.unwrap();

        let mut stream = generator.generate_stream("q", &passages, &[]).await.unwrap();
        let mut collected = String::new();
        while let Some(fragment) = stream.next().await {
            collected.push_str(&fragment.unwrap());
        }
        assert_eq!(collected, full);
    }
}
