//! Service configuration
//!
//! All settings are read from the environment once at startup into a plain
//! struct that gets passed into constructors. Nothing reads the environment
//! after `AppConfig::from_env` returns.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Embedding backend settings
    pub embedding: EmbeddingConfig,
    /// Chunking settings
    pub chunking: ChunkingConfig,
    /// Answer generation settings
    pub llm: LlmConfig,
    /// Vector index settings
    pub index: IndexConfig,
    /// Retrieval settings
    pub retrieval: RetrievalConfig,
    /// SQLite database path
    pub database_path: PathBuf,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Maximum upload size in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Embedding backend configuration
///
/// When `api_key` is set the hosted backend is used; otherwise the local
/// deterministic embedder runs in-process with `local_dim` dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Hosted embedding model name
    pub model: String,
    /// API credential; absence selects the local backend
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Dimensionality of the hosted model's vectors
    pub hosted_dim: usize,
    /// Dimensionality of the local embedder
    pub local_dim: usize,
    /// Batch size per embedding request
    pub batch_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retry budget for transient failures
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            hosted_dim: 1536,
            local_dim: 384,
            batch_size: 64,
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

impl EmbeddingConfig {
    /// Dimensionality of the backend this config selects
    pub fn dim(&self) -> usize {
        if self.api_key.is_some() {
            self.hosted_dim
        } else {
            self.local_dim
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in words
    pub target_tokens: usize,
    /// Overlap between consecutive chunks in words
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_tokens: 400,
            overlap_tokens: 80,
        }
    }
}

/// Answer generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat model name
    pub model: String,
    /// API credential; absence selects the templated fallback
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retry budget for transient failures
    pub max_retries: u32,
    /// Number of prior turns included when history is enabled
    pub history_turns: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            temperature: 0.0,
            timeout_secs: 60,
            max_retries: 2,
            history_turns: 6,
        }
    }
}

/// Vector index configuration
///
/// `url` set selects the remote Qdrant-compatible index; absent, an
/// in-memory index runs in-process (useful for tests and demos, not
/// durable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Base URL of the vector index service
    pub url: Option<String>,
    /// Optional API key for the index service
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    /// Collection name holding chunk vectors
    pub collection: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retry budget for transient failures
    pub max_retries: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            collection: "docs".to_string(),
            timeout_secs: 10,
            max_retries: 2,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of passages returned to the synthesizer
    pub top_k: usize,
    /// Whether to re-rank candidates with the cross-scorer
    pub rerank: bool,
    /// Over-fetch factor when re-ranking is enabled
    pub rerank_multiplier: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            rerank: true,
            rerank_multiplier: 4,
        }
    }
}

impl AppConfig {
    /// Build the configuration from environment variables.
    ///
    /// Recognized keys: `API_KEY_FOR_LLM`, `LLM_BASE_URL`, `LLM_MODEL`,
    /// `EMBED_MODEL`, `EMBED_DIM`, `VECTOR_INDEX_URL`, `VECTOR_INDEX_API_KEY`,
    /// `COLLECTION_NAME`, `DATABASE_PATH`, `HOST`, `PORT`, `CHUNK_TOKENS`,
    /// `CHUNK_OVERLAP_TOKENS`, `TOP_K`, `RERANK`, `RERANK_MULTIPLIER`,
    /// `HISTORY_TURNS`, `MAX_UPLOAD_BYTES`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        let api_key = env_opt("API_KEY_FOR_LLM");
        config.embedding.api_key = api_key.clone();
        config.llm.api_key = api_key;

        if let Some(url) = env_opt("LLM_BASE_URL") {
            config.embedding.base_url = url.clone();
            config.llm.base_url = url;
        }
        if let Some(model) = env_opt("LLM_MODEL") {
            config.llm.model = model;
        }
        if let Some(model) = env_opt("EMBED_MODEL") {
            config.embedding.model = model;
        }
        if let Some(dim) = env_opt("EMBED_DIM") {
            config.embedding.hosted_dim = parse_env("EMBED_DIM", &dim)?;
        }

        config.index.url = env_opt("VECTOR_INDEX_URL");
        config.index.api_key = env_opt("VECTOR_INDEX_API_KEY");
        if let Some(name) = env_opt("COLLECTION_NAME") {
            config.index.collection = name;
        }

        if let Some(path) = env_opt("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(host) = env_opt("HOST") {
            config.server.host = host;
        }
        if let Some(port) = env_opt("PORT") {
            config.server.port = parse_env("PORT", &port)?;
        }
        if let Some(v) = env_opt("MAX_UPLOAD_BYTES") {
            config.server.max_upload_bytes = parse_env("MAX_UPLOAD_BYTES", &v)?;
        }

        if let Some(v) = env_opt("CHUNK_TOKENS") {
            config.chunking.target_tokens = parse_env("CHUNK_TOKENS", &v)?;
        }
        if let Some(v) = env_opt("CHUNK_OVERLAP_TOKENS") {
            config.chunking.overlap_tokens = parse_env("CHUNK_OVERLAP_TOKENS", &v)?;
        }
        if config.chunking.overlap_tokens >= config.chunking.target_tokens {
            return Err(Error::Config(format!(
                "CHUNK_OVERLAP_TOKENS ({}) must be smaller than CHUNK_TOKENS ({})",
                config.chunking.overlap_tokens, config.chunking.target_tokens
            )));
        }

        if let Some(v) = env_opt("TOP_K") {
            config.retrieval.top_k = parse_env("TOP_K", &v)?;
        }
        if let Some(v) = env_opt("RERANK") {
            config.retrieval.rerank = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = env_opt("RERANK_MULTIPLIER") {
            config.retrieval.rerank_multiplier = parse_env("RERANK_MULTIPLIER", &v)?;
        }
        if let Some(v) = env_opt("HISTORY_TURNS") {
            config.llm.history_turns = parse_env("HISTORY_TURNS", &v)?;
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            embedding: EmbeddingConfig::default(),
            chunking: ChunkingConfig::default(),
            llm: LlmConfig::default(),
            index: IndexConfig::default(),
            retrieval: RetrievalConfig::default(),
            database_path: PathBuf::from("docsage.db"),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("invalid value for {}: {}", key, value)))
}
