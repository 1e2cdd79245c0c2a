//! Answer synthesizer
//!
//! Orchestrates one question/answer exchange: resolve the session (creating
//! one when none is supplied), load prior turns, generate the answer, link
//! citations to the supplied passages, and record both the user and
//! assistant messages in the conversation store.

use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::retrieval::Passage;
use crate::storage::ConversationStore;
use crate::types::{Citation, Role};

use super::{link_citations, GeneratorBackend};

/// A completed exchange
#[derive(Debug, Clone)]
pub struct SynthesizedAnswer {
    /// Answer text
    pub text: String,
    /// Passages the answer drew upon
    pub citations: Vec<Citation>,
    /// Session the exchange was recorded under
    pub session_id: Uuid,
}

/// Generates answers and records the conversation
pub struct AnswerSynthesizer {
    generator: Arc<dyn GeneratorBackend>,
    store: Arc<ConversationStore>,
    history_turns: usize,
}

impl AnswerSynthesizer {
    pub fn new(
        generator: Arc<dyn GeneratorBackend>,
        store: Arc<ConversationStore>,
        history_turns: usize,
    ) -> Self {
        Self {
            generator,
            store,
            history_turns,
        }
    }

    /// The generator this synthesizer runs on
    pub fn generator(&self) -> &Arc<dyn GeneratorBackend> {
        &self.generator
    }

    /// Resolve the session to record under, creating one when needed.
    ///
    /// A supplied id that does not exist yet is created under that id, so a
    /// client may mint its own session ids.
    fn resolve_session(&self, question: &str, session_id: Option<Uuid>) -> Result<Uuid> {
        match session_id {
            Some(id) => match self.store.get_session(id) {
                Ok(session) => Ok(session.id),
                Err(Error::NotFound { .. }) => Ok(self
                    .store
                    .create_session_with_id(id, Some(&title_from_question(question)))?
                    .id),
                Err(e) => Err(e),
            },
            None => Ok(self
                .store
                .create_session(Some(&title_from_question(question)))?
                .id),
        }
    }

    fn load_history(&self, session_id: Uuid, use_history: bool) -> Result<Vec<(String, String)>> {
        if !use_history {
            return Ok(Vec::new());
        }
        self.store.recent_turns(session_id, self.history_turns)
    }

    /// Answer a question and record both sides of the exchange.
    pub async fn answer(
        &self,
        question: &str,
        passages: &[Passage],
        session_id: Option<Uuid>,
        use_history: bool,
    ) -> Result<SynthesizedAnswer> {
        let session_id = self.resolve_session(question, session_id)?;
        let history = self.load_history(session_id, use_history)?;

        self.store
            .append_message(session_id, Role::User, question, &[])?;

        let raw = self.generator.generate(question, passages, &history).await?;
        let (text, citations) = link_citations(&raw, passages);

        self.store
            .append_message(session_id, Role::Assistant, &text, &citations)?;

        Ok(SynthesizedAnswer {
            text,
            citations,
            session_id,
        })
    }

    /// Answer a question as a stream of text fragments.
    ///
    /// The producer task forwards fragments into the returned channel and
    /// stops promptly when the receiver is dropped. Whatever was generated
    /// before disconnection is still recorded as the assistant message.
    pub async fn answer_stream(
        &self,
        question: &str,
        passages: &[Passage],
        session_id: Option<Uuid>,
        use_history: bool,
    ) -> Result<(Uuid, mpsc::Receiver<Result<String>>)> {
        let session_id = self.resolve_session(question, session_id)?;
        let history = self.load_history(session_id, use_history)?;

        self.store
            .append_message(session_id, Role::User, question, &[])?;

        let (tx, rx) = mpsc::channel::<Result<String>>(32);
        let generator = Arc::clone(&self.generator);
        let store = Arc::clone(&self.store);
        let question = question.to_string();
        let passages = passages.to_vec();

        tokio::spawn(async move {
            let mut generated = String::new();

            match generator
                .generate_stream(&question, &passages, &history)
                .await
            {
                Ok(mut stream) => {
                    while let Some(item) = stream.next().await {
                        match item {
                            Ok(fragment) => {
                                generated.push_str(&fragment);
                                if tx.send(Ok(fragment)).await.is_err() {
                                    tracing::debug!(
                                        "stream consumer disconnected, stopping generation"
                                    );
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!("generation stream failed: {}", e);
                                let _ = tx.send(Err(e)).await;
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                }
            }

            if !generated.is_empty() {
                let (text, citations) = link_citations(&generated, &passages);
                if let Err(e) =
                    store.append_message(session_id, Role::Assistant, &text, &citations)
                {
                    tracing::error!("failed to record streamed answer: {}", e);
                }
            }
        });

        Ok((session_id, rx))
    }
}

/// Derive a session title from the first words of a question
fn title_from_question(question: &str) -> String {
    let title: String = question
        .split_whitespace()
        .take(6)
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        "New Conversation".to_string()
    } else {
        title
    }
}
