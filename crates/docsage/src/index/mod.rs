//! Vector index clients
//!
//! Chunk vectors live in a named collection. The collection is created
//! lazily on first upsert with dimensionality fixed to the first vector
//! written; later writes with a different dimensionality fail with
//! `DimensionMismatch`. An unreachable backing service surfaces as
//! `IndexUnavailable` so callers can degrade instead of crashing.

mod memory;
mod qdrant;

pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::IndexConfig;
use crate::error::Result;
use crate::types::{Chunk, Citation};

/// Payload stored alongside each vector: everything needed to rebuild a
/// citation without consulting another store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkPayload {
    /// Chunk id, unique within the collection
    pub chunk_id: String,
    /// Parent document id
    pub document_id: Uuid,
    /// Source filename
    pub filename: String,
    /// First page covered (1-indexed)
    pub page_start: u32,
    /// Last page covered (1-indexed)
    pub page_end: u32,
    /// Ordinal position within the document
    pub position: u32,
    /// Raw chunk text
    pub text: String,
}

impl ChunkPayload {
    /// Citation pointing back at this chunk
    pub fn citation(&self) -> Citation {
        Citation {
            filename: self.filename.clone(),
            page_start: self.page_start,
            page_end: self.page_end,
            chunk_id: self.chunk_id.clone(),
        }
    }
}

impl From<&Chunk> for ChunkPayload {
    fn from(chunk: &Chunk) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            document_id: chunk.document_id,
            filename: chunk.filename.clone(),
            page_start: chunk.page_start,
            page_end: chunk.page_end,
            position: chunk.position,
            text: chunk.text.clone(),
        }
    }
}

/// A vector plus payload, addressed by a point id
#[derive(Debug, Clone)]
pub struct PointRecord {
    /// Point id in the collection
    pub id: Uuid,
    /// Embedding vector
    pub vector: Vec<f32>,
    /// Chunk payload
    pub payload: ChunkPayload,
}

impl PointRecord {
    /// Build a record from a chunk and its embedding
    pub fn new(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            vector,
            payload: ChunkPayload::from(chunk),
        }
    }
}

/// A search hit, ordered by descending similarity
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Similarity score (cosine; higher is more similar)
    pub score: f32,
    /// Chunk payload
    pub payload: ChunkPayload,
}

/// Store and search chunk vectors in named collections
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace points. Creates the collection on first write.
    async fn upsert(&self, collection: &str, points: Vec<PointRecord>) -> Result<()>;

    /// Top-k nearest points by descending score; exact ties keep insertion
    /// order. A missing or empty collection returns an empty vec.
    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>>;

    /// Remove points by chunk id; returns how many were removed
    async fn delete(&self, collection: &str, chunk_ids: &[String]) -> Result<usize>;

    /// Remove every point belonging to a document; returns how many
    async fn delete_by_document(&self, collection: &str, document_id: Uuid) -> Result<usize>;

    /// Number of points in the collection (0 when it does not exist)
    async fn count(&self, collection: &str) -> Result<usize>;

    /// True when the backing service responds
    async fn health_check(&self) -> bool;

    /// Implementation name for logging
    fn name(&self) -> &str;
}

/// Build the vector index the configuration selects
pub fn from_config(config: &IndexConfig) -> Arc<dyn VectorIndex> {
    match &config.url {
        Some(url) => Arc::new(QdrantIndex::new(url, config)),
        None => Arc::new(MemoryIndex::new()),
    }
}
