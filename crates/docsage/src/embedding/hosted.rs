//! Hosted embedding backend (OpenAI-compatible API)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::EmbeddingBackend;

/// Embedding client for an OpenAI-compatible `/v1/embeddings` endpoint.
///
/// Batched; transient failures (network, 429, 5xx) retry with exponential
/// backoff up to the configured budget. Other 4xx responses fail
/// immediately.
pub struct HostedEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dim: usize,
    batch_size: usize,
    max_retries: u32,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedItem>,
}

#[derive(Deserialize)]
struct EmbedItem {
    index: usize,
    embedding: Vec<f32>,
}

impl HostedEmbedder {
    /// Create a new hosted embedder from configuration
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            dim: config.hosted_dim,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
        }
    }

    async fn embed_one_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(
                    "embedding request failed (attempt {}/{}), retrying in {:?}",
                    attempt,
                    self.max_retries + 1,
                    delay
                );
                sleep(delay).await;
            }

            let request = EmbedRequest {
                model: &self.model,
                input: texts,
            };

            let response = match self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(Error::BackendUnavailable(format!(
                        "embedding request failed: {}",
                        e
                    )));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                let parsed: EmbedResponse = response.json().await.map_err(|e| {
                    Error::BackendUnavailable(format!("malformed embedding response: {}", e))
                })?;
                let mut items = parsed.data;
                items.sort_by_key(|item| item.index);
                let vectors: Vec<Vec<f32>> = items.into_iter().map(|item| item.embedding).collect();
                if vectors.len() != texts.len() {
                    return Err(Error::BackendUnavailable(format!(
                        "embedding response returned {} vectors for {} inputs",
                        vectors.len(),
                        texts.len()
                    )));
                }
                return Ok(vectors);
            }

            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 || status.is_server_error() {
                last_error = Some(Error::BackendUnavailable(format!(
                    "embedding API {}: {}",
                    status, body
                )));
                continue;
            }

            // Deterministic client error, do not retry
            return Err(Error::BackendUnavailable(format!(
                "embedding API {}: {}",
                status, body
            )));
        }

        Err(last_error
            .unwrap_or_else(|| Error::BackendUnavailable("embedding failed after retries".into())))
    }
}

#[async_trait]
impl EmbeddingBackend for HostedEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_one_batch(batch).await?);
        }
        Ok(vectors)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &str {
        "hosted"
    }

    async fn health_check(&self) -> bool {
        // One tiny embedding doubles as the connectivity probe.
        self.embed_one_batch(&["ping".to_string()]).await.is_ok()
    }
}
