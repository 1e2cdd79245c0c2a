//! In-memory vector index
//!
//! Brute-force cosine similarity over all stored vectors. Serves as the
//! index backend when no `VECTOR_INDEX_URL` is configured and as the test
//! double for the whole retrieval path. Not durable across restarts.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::{PointRecord, ScoredPoint, VectorIndex};

struct MemoryCollection {
    /// Fixed on the first vector written
    dim: usize,
    points: Vec<PointRecord>,
}

/// In-memory vector index with lazily created collections
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, collection: &str, points: Vec<PointRecord>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let mut collections = self.collections.write();
        let entry = collections
            .entry(collection.to_string())
            .or_insert_with(|| MemoryCollection {
                dim: points[0].vector.len(),
                points: Vec::new(),
            });

        for point in &points {
            if point.vector.len() != entry.dim {
                return Err(Error::DimensionMismatch {
                    expected: entry.dim,
                    actual: point.vector.len(),
                });
            }
        }

        for point in points {
            entry
                .points
                .retain(|existing| existing.payload.chunk_id != point.payload.chunk_id);
            entry.points.push(point);
        }

        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read();
        let entry = match collections.get(collection) {
            Some(entry) => entry,
            None => return Ok(Vec::new()),
        };

        if query.len() != entry.dim {
            return Err(Error::DimensionMismatch {
                expected: entry.dim,
                actual: query.len(),
            });
        }

        let mut hits: Vec<ScoredPoint> = entry
            .points
            .iter()
            .map(|point| ScoredPoint {
                score: cosine_similarity(query, &point.vector),
                payload: point.payload.clone(),
            })
            .collect();

        // Stable sort keeps insertion order for exact ties.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn delete(&self, collection: &str, chunk_ids: &[String]) -> Result<usize> {
        let mut collections = self.collections.write();
        let entry = match collections.get_mut(collection) {
            Some(entry) => entry,
            None => return Ok(0),
        };
        let before = entry.points.len();
        entry
            .points
            .retain(|point| !chunk_ids.contains(&point.payload.chunk_id));
        Ok(before - entry.points.len())
    }

    async fn delete_by_document(&self, collection: &str, document_id: Uuid) -> Result<usize> {
        let mut collections = self.collections.write();
        let entry = match collections.get_mut(collection) {
            Some(entry) => entry,
            None => return Ok(0),
        };
        let before = entry.points.len();
        entry
            .points
            .retain(|point| point.payload.document_id != document_id);
        Ok(before - entry.points.len())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map(|entry| entry.points.len())
            .unwrap_or(0))
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ChunkPayload;

    fn record(chunk_id: &str, document_id: Uuid, vector: Vec<f32>) -> PointRecord {
        PointRecord {
            id: Uuid::new_v4(),
            vector,
            payload: ChunkPayload {
                chunk_id: chunk_id.to_string(),
                document_id,
                filename: "test.txt".to_string(),
                page_start: 1,
                page_end: 1,
                position: 0,
                text: format!("text for {}", chunk_id),
            },
        }
    }

    #[tokio::test]
    async fn self_similarity_is_maximal() {
        let index = MemoryIndex::new();
        let doc = Uuid::new_v4();
        index
            .upsert(
                "docs",
                vec![
                    record("c-0", doc, vec![1.0, 0.0, 0.0]),
                    record("c-1", doc, vec![0.0, 1.0, 0.0]),
                    record("c-2", doc, vec![0.7, 0.7, 0.0]),
                ],
            )
            .await
            .unwrap();

        let hits = index.search("docs", &[1.0, 0.0, 0.0], 3).await.unwrap();
        assert_eq!(hits[0].payload.chunk_id, "c-0");
        assert!((hits[0].score - 1.0).abs() < 1e-5);
        assert!(hits[0].score >= hits[1].score && hits[1].score >= hits[2].score);
    }

    #[tokio::test]
    async fn missing_collection_searches_empty() {
        let index = MemoryIndex::new();
        let hits = index.search("nope", &[1.0, 0.0], 5).await.unwrap();
        assert!(hits.is_empty());
        assert_eq!(index.count("nope").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dimension_is_fixed_by_first_write() {
        let index = MemoryIndex::new();
        let doc = Uuid::new_v4();
        index
            .upsert("docs", vec![record("c-0", doc, vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        let err = index
            .upsert("docs", vec![record("c-1", doc, vec![1.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));

        let err = index.search("docs", &[1.0], 5).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn upsert_replaces_by_chunk_id() {
        let index = MemoryIndex::new();
        let doc = Uuid::new_v4();
        index
            .upsert("docs", vec![record("c-0", doc, vec![1.0, 0.0])])
            .await
            .unwrap();
        index
            .upsert("docs", vec![record("c-0", doc, vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(index.count("docs").await.unwrap(), 1);

        let hits = index.search("docs", &[0.0, 1.0], 1).await.unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn delete_by_document_removes_only_that_document() {
        let index = MemoryIndex::new();
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();
        index
            .upsert(
                "docs",
                vec![
                    record("a-0", doc_a, vec![1.0, 0.0]),
                    record("a-1", doc_a, vec![0.9, 0.1]),
                    record("b-0", doc_b, vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let removed = index.delete_by_document("docs", doc_a).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(index.count("docs").await.unwrap(), 1);

        let removed = index.delete("docs", &["b-0".to_string()]).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(index.count("docs").await.unwrap(), 0);
    }
}
