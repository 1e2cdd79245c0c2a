//! Qdrant REST client
//!
//! Talks to a Qdrant-compatible vector database over its HTTP API. The
//! collection is created lazily on the first upsert; an existing collection
//! whose vector size differs from the embedding backend's dimensionality is
//! a configuration error (`DimensionMismatch`) and is never retried. A
//! service that cannot be reached surfaces as `IndexUnavailable`.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

use crate::config::IndexConfig;
use crate::error::{Error, Result};

use super::{ChunkPayload, PointRecord, ScoredPoint, VectorIndex};

/// Vector index client over the Qdrant REST API
pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
    /// Vector size of the collection once verified, keyed per process
    verified_dim: RwLock<Option<usize>>,
}

impl QdrantIndex {
    /// Create a client for the index service at `url`
    pub fn new(url: &str, config: &IndexConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            verified_dim: RwLock::new(None),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    /// Send with retry on network errors and 5xx; other statuses return as-is
    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(4));
                tracing::warn!(
                    "vector index request failed (attempt {}/{}), retrying in {:?}",
                    attempt,
                    self.max_retries + 1,
                    delay
                );
                sleep(delay).await;
            }

            match build().send().await {
                Ok(response) if response.status().is_server_error() => {
                    last_error = Some(Error::IndexUnavailable(format!(
                        "index returned {}",
                        response.status()
                    )));
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    last_error = Some(Error::IndexUnavailable(format!(
                        "index unreachable: {}",
                        e
                    )));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::IndexUnavailable("request failed".into())))
    }

    /// Verify the collection exists with the expected vector size, creating
    /// it when absent. The result is cached for the process lifetime.
    async fn ensure_collection(&self, collection: &str, dim: usize) -> Result<()> {
        if let Some(verified) = *self.verified_dim.read() {
            if verified == dim {
                return Ok(());
            }
            return Err(Error::DimensionMismatch {
                expected: verified,
                actual: dim,
            });
        }

        let path = format!("/collections/{}", collection);
        let response = self
            .send_with_retry(|| self.request(reqwest::Method::GET, &path))
            .await?;

        match response.status().as_u16() {
            200 => {
                let body: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| Error::IndexUnavailable(format!("malformed collection info: {}", e)))?;
                let existing = body
                    .pointer("/result/config/params/vectors/size")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as usize;
                if existing != dim {
                    return Err(Error::DimensionMismatch {
                        expected: existing,
                        actual: dim,
                    });
                }
            }
            404 => {
                let body = json!({
                    "vectors": { "size": dim, "distance": "Cosine" }
                });
                let response = self
                    .send_with_retry(|| {
                        self.request(reqwest::Method::PUT, &path).json(&body)
                    })
                    .await?;
                if !response.status().is_success() {
                    return Err(Error::IndexUnavailable(format!(
                        "failed to create collection '{}': {}",
                        collection,
                        response.status()
                    )));
                }
                tracing::info!("created vector collection '{}' (dim {})", collection, dim);
            }
            status => {
                return Err(Error::IndexUnavailable(format!(
                    "collection check returned {}",
                    status
                )));
            }
        }

        *self.verified_dim.write() = Some(dim);
        Ok(())
    }

    /// Count points matching an optional filter
    async fn count_filtered(
        &self,
        collection: &str,
        filter: Option<serde_json::Value>,
    ) -> Result<usize> {
        let path = format!("/collections/{}/points/count", collection);
        let mut body = json!({ "exact": true });
        if let Some(filter) = filter {
            body["filter"] = filter;
        }

        let response = self
            .send_with_retry(|| self.request(reqwest::Method::POST, &path).json(&body))
            .await?;

        if response.status().as_u16() == 404 {
            return Ok(0);
        }
        if !response.status().is_success() {
            return Err(Error::IndexUnavailable(format!(
                "count returned {}",
                response.status()
            )));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::IndexUnavailable(format!("malformed count response: {}", e)))?;
        Ok(parsed
            .pointer("/result/count")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize)
    }

    /// Delete points matching a filter, returning the prior match count
    async fn delete_filtered(&self, collection: &str, filter: serde_json::Value) -> Result<usize> {
        let matched = self.count_filtered(collection, Some(filter.clone())).await?;
        if matched == 0 {
            return Ok(0);
        }

        let path = format!("/collections/{}/points/delete?wait=true", collection);
        let body = json!({ "filter": filter });
        let response = self
            .send_with_retry(|| self.request(reqwest::Method::POST, &path).json(&body))
            .await?;

        if !response.status().is_success() {
            return Err(Error::IndexUnavailable(format!(
                "delete returned {}",
                response.status()
            )));
        }
        Ok(matched)
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, collection: &str, points: Vec<PointRecord>) -> Result<()> {
        let Some(first) = points.first() else {
            return Ok(());
        };
        let dim = first.vector.len();
        for point in &points {
            if point.vector.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: point.vector.len(),
                });
            }
        }

        self.ensure_collection(collection, dim).await?;

        let body = json!({
            "points": points
                .iter()
                .map(|point| {
                    json!({
                        "id": point.id.to_string(),
                        "vector": point.vector,
                        "payload": point.payload,
                    })
                })
                .collect::<Vec<_>>()
        });

        let path = format!("/collections/{}/points?wait=true", collection);
        let response = self
            .send_with_retry(|| self.request(reqwest::Method::PUT, &path).json(&body))
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::IndexUnavailable(format!(
                "upsert returned {}: {}",
                status, detail
            )));
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let path = format!("/collections/{}/points/search", collection);
        let body = json!({
            "vector": query,
            "limit": top_k,
            "with_payload": true,
        });

        let response = self
            .send_with_retry(|| self.request(reqwest::Method::POST, &path).json(&body))
            .await?;

        // Collection not created yet: nothing indexed, not an error.
        if response.status().as_u16() == 404 {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            if detail.contains("dimension") || detail.contains("Vector dimension") {
                if let Some(expected) = *self.verified_dim.read() {
                    return Err(Error::DimensionMismatch {
                        expected,
                        actual: query.len(),
                    });
                }
            }
            return Err(Error::IndexUnavailable(format!(
                "search returned {}: {}",
                status, detail
            )));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::IndexUnavailable(format!("malformed search response: {}", e)))?;

        let mut hits = Vec::new();
        if let Some(results) = parsed.pointer("/result").and_then(|v| v.as_array()) {
            for hit in results {
                let score = hit.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;
                let Some(payload) = hit.get("payload") else {
                    continue;
                };
                match serde_json::from_value::<ChunkPayload>(payload.clone()) {
                    Ok(payload) => hits.push(ScoredPoint { score, payload }),
                    Err(e) => tracing::warn!("skipping point with malformed payload: {}", e),
                }
            }
        }
        Ok(hits)
    }

    async fn delete(&self, collection: &str, chunk_ids: &[String]) -> Result<usize> {
        if chunk_ids.is_empty() {
            return Ok(0);
        }
        let filter = json!({
            "must": [{ "key": "chunk_id", "match": { "any": chunk_ids } }]
        });
        self.delete_filtered(collection, filter).await
    }

    async fn delete_by_document(&self, collection: &str, document_id: Uuid) -> Result<usize> {
        let filter = json!({
            "must": [{ "key": "document_id", "match": { "value": document_id.to_string() } }]
        });
        self.delete_filtered(collection, filter).await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.count_filtered(collection, None).await
    }

    async fn health_check(&self) -> bool {
        match self.request(reqwest::Method::GET, "/collections").send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
