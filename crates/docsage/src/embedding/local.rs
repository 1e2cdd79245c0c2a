//! Local deterministic embedding backend
//!
//! Feature-hashing embedder: each word (and adjacent word pair) hashes to a
//! bucket of a fixed-length vector, which is then L2-normalized. Runs
//! in-process with no model download or network dependency, so identical
//! input always produces the identical vector. Texts sharing vocabulary land
//! near each other under cosine similarity, which is enough for retrieval
//! over small corpora and for exercising the whole pipeline in tests.

use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;

use super::EmbeddingBackend;

/// In-process feature-hashing embedder
pub struct LocalEmbedder {
    dim: usize,
}

impl LocalEmbedder {
    /// Create a local embedder with the given dimensionality
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }

    /// Embed one text (synchronous; no suspension points)
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];

        let words: Vec<String> = text
            .unicode_words()
            .map(|w| w.to_lowercase())
            .collect();

        for word in &words {
            let bucket = fnv1a(word.as_bytes()) as usize % self.dim;
            vector[bucket] += 1.0;
        }
        // Bigrams give word order a small signal.
        for pair in words.windows(2) {
            let key = format!("{} {}", pair[0], pair[1]);
            let bucket = fnv1a(key.as_bytes()) as usize % self.dim;
            vector[bucket] += 0.5;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingBackend for LocalEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// FNV-1a hash, the bucket function for feature hashing
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
