//! Shared application state
//!
//! Built once at startup from the configuration; every handle inside is
//! read-only afterwards and safely shared across concurrent requests.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::embedding::{self, EmbeddingBackend};
use crate::error::Result;
use crate::generation::{self, AnswerSynthesizer, GeneratorBackend};
use crate::index::{self, VectorIndex};
use crate::retrieval::Retriever;
use crate::storage::ConversationStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    store: Arc<ConversationStore>,
    embedder: Arc<dyn EmbeddingBackend>,
    index: Arc<dyn VectorIndex>,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
}

impl AppState {
    /// Build state from configuration, opening the database and selecting
    /// the embedding, index, and generator backends.
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = Arc::new(ConversationStore::open(&config.database_path)?);
        let embedder = embedding::from_config(&config.embedding);
        let index = index::from_config(&config.index);
        let generator = generation::from_config(&config.llm);
        Self::assemble(config, store, embedder, index, generator)
    }

    /// Build state over caller-supplied components (used by tests)
    pub fn with_components(
        config: AppConfig,
        store: Arc<ConversationStore>,
        embedder: Arc<dyn EmbeddingBackend>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn GeneratorBackend>,
    ) -> Result<Self> {
        Self::assemble(config, store, embedder, index, generator)
    }

    fn assemble(
        config: AppConfig,
        store: Arc<ConversationStore>,
        embedder: Arc<dyn EmbeddingBackend>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn GeneratorBackend>,
    ) -> Result<Self> {
        tracing::info!(
            "backends selected: embedding={} (dim {}), index={}, generator={} ({})",
            embedder.name(),
            embedder.dim(),
            index.name(),
            generator.name(),
            generator.model(),
        );

        let retriever = Retriever::new(
            Arc::clone(&embedder),
            Arc::clone(&index),
            config.index.collection.clone(),
            config.retrieval.clone(),
        );
        let synthesizer = AnswerSynthesizer::new(
            generator,
            Arc::clone(&store),
            config.llm.history_turns,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                embedder,
                index,
                retriever,
                synthesizer,
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.inner.store
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingBackend> {
        &self.inner.embedder
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.inner.index
    }

    pub fn retriever(&self) -> &Retriever {
        &self.inner.retriever
    }

    pub fn synthesizer(&self) -> &AnswerSynthesizer {
        &self.inner.synthesizer
    }

    /// Collection name holding chunk vectors
    pub fn collection(&self) -> &str {
        &self.inner.config.index.collection
    }
}
