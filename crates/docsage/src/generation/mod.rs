//! Answer generation with citations
//!
//! A `GeneratorBackend` turns a question plus retrieved passages (and
//! optional prior turns) into answer text. The hosted backend calls an
//! OpenAI-compatible chat API; the templated backend is deterministic and
//! runs with no external dependency. Citation linking maps the `[n]`
//! markers in the answer back to the supplied passages and never invents a
//! citation that was not supplied.

mod citation;
mod hosted;
mod prompt;
mod synthesizer;
mod template;

pub use citation::link_citations;
pub use hosted::HostedGenerator;
pub use prompt::PromptBuilder;
pub use synthesizer::{AnswerSynthesizer, SynthesizedAnswer};
pub use template::TemplateGenerator;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::Result;
use crate::retrieval::Passage;

/// Prior (question, answer) pairs, oldest first
pub type HistoryTurns = [(String, String)];

/// Produces answer text from a question, passages, and history
#[async_trait]
pub trait GeneratorBackend: Send + Sync {
    /// Generate the full answer text, with `[n]` markers referencing passages
    async fn generate(
        &self,
        question: &str,
        passages: &[Passage],
        history: &HistoryTurns,
    ) -> Result<String>;

    /// Generate the answer as a stream of text fragments
    async fn generate_stream(
        &self,
        question: &str,
        passages: &[Passage],
        history: &HistoryTurns,
    ) -> Result<BoxStream<'static, Result<String>>>;

    /// True when the backend can serve requests
    async fn health_check(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &str;

    /// Model identifier
    fn model(&self) -> &str;
}

/// Build the generator backend the configuration selects
pub fn from_config(config: &LlmConfig) -> Arc<dyn GeneratorBackend> {
    match &config.api_key {
        Some(key) => Arc::new(HostedGenerator::new(config, key.clone())),
        None => Arc::new(TemplateGenerator::new()),
    }
}
