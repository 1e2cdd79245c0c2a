//! Retrieval: embed the question, search the index, optionally re-rank
//!
//! Over-fetches `top_k * rerank_multiplier` candidates when re-ranking is
//! enabled, re-scores each (question, passage) pair, then truncates to
//! `top_k`. Without re-ranking the index's own ordering is returned,
//! truncated. An empty collection yields an empty result, never an error.

mod rerank;

pub use rerank::CrossScorer;

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingBackend;
use crate::error::Result;
use crate::index::{ChunkPayload, VectorIndex};

/// A retrieved passage with its citation metadata and scores
#[derive(Debug, Clone)]
pub struct Passage {
    /// Chunk payload (text + citation fields)
    pub payload: ChunkPayload,
    /// Similarity score from the index
    pub similarity: f32,
    /// Cross-scorer score; set only when re-ranking ran
    pub rerank_score: Option<f32>,
}

/// Embeds questions and fetches the best-matching passages
pub struct Retriever {
    embedder: Arc<dyn EmbeddingBackend>,
    index: Arc<dyn VectorIndex>,
    collection: String,
    scorer: CrossScorer,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingBackend>,
        index: Arc<dyn VectorIndex>,
        collection: impl Into<String>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            collection: collection.into(),
            scorer: CrossScorer::new(),
            config,
        }
    }

    /// Retrieve the top passages for a question.
    ///
    /// `top_k` and `rerank` default to the configured values when `None`.
    pub async fn retrieve(
        &self,
        question: &str,
        top_k: Option<usize>,
        rerank: Option<bool>,
    ) -> Result<Vec<Passage>> {
        let top_k = top_k.unwrap_or(self.config.top_k).max(1);
        let rerank = rerank.unwrap_or(self.config.rerank);

        let query = self.embedder.embed(question).await?;

        let fetch_k = if rerank {
            top_k * self.config.rerank_multiplier.max(1)
        } else {
            top_k
        };

        let hits = self.index.search(&self.collection, &query, fetch_k).await?;
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let mut passages: Vec<Passage> = hits
            .into_iter()
            .map(|hit| Passage {
                similarity: hit.score,
                rerank_score: None,
                payload: hit.payload,
            })
            .collect();

        if rerank {
            for passage in &mut passages {
                passage.rerank_score = Some(self.scorer.score(question, &passage.payload.text));
            }
            // Stable sort: candidates with exactly equal scores keep the
            // index's return order.
            passages.sort_by(|a, b| {
                b.rerank_score
                    .partial_cmp(&a.rerank_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        passages.truncate(top_k);
        Ok(passages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::embedding::LocalEmbedder;
    use crate::index::{MemoryIndex, PointRecord};
    use crate::types::Chunk;
    use uuid::Uuid;

    async fn seed(index: &MemoryIndex, embedder: &LocalEmbedder, texts: &[&str]) -> Uuid {
        let doc_id = Uuid::new_v4();
        let points: Vec<PointRecord> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let chunk = Chunk::new(doc_id, "seed.txt", text.to_string(), 1, 1, i as u32);
                PointRecord::new(&chunk, embedder.embed_text(text))
            })
            .collect();
        index.upsert("docs", points).await.unwrap();
        doc_id
    }

    fn retriever(index: Arc<MemoryIndex>, embedder: Arc<LocalEmbedder>) -> Retriever {
        Retriever::new(embedder, index, "docs", RetrievalConfig::default())
    }

    #[tokio::test]
    async fn empty_collection_returns_empty() {
        let index = Arc::new(MemoryIndex::new());
        let embedder = Arc::new(LocalEmbedder::new(64));
        let retriever = retriever(index, embedder);

        let passages = retriever.retrieve("anything at all", None, None).await.unwrap();
        assert!(passages.is_empty());
    }

    #[tokio::test]
    async fn relevant_passage_ranks_first() {
        let index = Arc::new(MemoryIndex::new());
        let embedder = Arc::new(LocalEmbedder::new(256));
        seed(
            &index,
            &embedder,
            &[
                "the office cafeteria serves lunch between noon and two",
                "vacation requests must be filed two weeks in advance",
                "the refund policy covers damaged items within thirty days",
            ],
        )
        .await;
        let retriever = retriever(index, embedder);

        let passages = retriever
            .retrieve("what is the refund policy for damaged items", Some(2), Some(true))
            .await
            .unwrap();

        assert_eq!(passages.len(), 2);
        assert!(passages[0].payload.text.contains("refund policy"));
        assert!(passages[0].rerank_score.is_some());
    }

    #[tokio::test]
    async fn top_k_truncates() {
        let index = Arc::new(MemoryIndex::new());
        let embedder = Arc::new(LocalEmbedder::new(128));
        seed(&index, &embedder, &["one fish", "two fish", "red fish", "blue fish"]).await;
        let retriever = retriever(index, embedder);

        let passages = retriever.retrieve("fish", Some(3), Some(false)).await.unwrap();
        assert_eq!(passages.len(), 3);
        assert!(passages.iter().all(|p| p.rerank_score.is_none()));
    }
}
