//! Embedding backends
//!
//! Two interchangeable implementations behind one trait, selected once at
//! startup: a hosted OpenAI-compatible API (present credential) or a local
//! deterministic embedder (no credential, no network). Swapping backends
//! after documents are indexed changes dimensionality and is rejected by the
//! vector index, never silently accepted.

mod hosted;
mod local;

pub use hosted::HostedEmbedder;
pub use local::LocalEmbedder;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::EmbeddingConfig;
use crate::error::Result;

/// Maps text to fixed-length vectors.
///
/// Every call against one instance returns vectors of the same
/// dimensionality, one per input, in input order.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_batch(&texts).await?;
        vectors
            .pop()
            .ok_or_else(|| crate::error::Error::BackendUnavailable("empty embedding response".into()))
    }

    /// Vector dimensionality
    fn dim(&self) -> usize;

    /// Backend name for logging
    fn name(&self) -> &str;

    /// True when the backend can serve requests
    async fn health_check(&self) -> bool;
}

/// Build the embedding backend the configuration selects
pub fn from_config(config: &EmbeddingConfig) -> Arc<dyn EmbeddingBackend> {
    match &config.api_key {
        Some(key) => Arc::new(HostedEmbedder::new(config, key.clone())),
        None => Arc::new(LocalEmbedder::new(config.local_dim)),
    }
}
