//! Hosted generator (OpenAI-compatible chat completions)

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::retrieval::Passage;

use super::{GeneratorBackend, HistoryTurns, PromptBuilder};

/// Chat-completions client for an OpenAI-compatible API.
///
/// Transient failures (network, 429, 5xx) retry with exponential backoff;
/// other client errors fail immediately.
pub struct HostedGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl HostedGenerator {
    /// Create a new hosted generator from configuration
    pub fn new(config: &LlmConfig, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        }
    }

    fn build_messages(
        &self,
        question: &str,
        passages: &[Passage],
        history: &HistoryTurns,
    ) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: "system".to_string(),
                content: PromptBuilder::system_prompt().to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: PromptBuilder::build_user_prompt(question, passages, history),
            },
        ]
    }

    async fn send_chat(&self, request: &ChatRequest<'_>) -> Result<reqwest::Response> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(
                    "generation request failed (attempt {}/{}), retrying in {:?}",
                    attempt,
                    self.max_retries + 1,
                    delay
                );
                sleep(delay).await;
            }

            let response = match self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(request)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(Error::BackendUnavailable(format!(
                        "generation request failed: {}",
                        e
                    )));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 || status.is_server_error() {
                last_error = Some(Error::BackendUnavailable(format!(
                    "generation API {}: {}",
                    status, body
                )));
                continue;
            }
            return Err(Error::BackendUnavailable(format!(
                "generation API {}: {}",
                status, body
            )));
        }

        Err(last_error
            .unwrap_or_else(|| Error::BackendUnavailable("generation failed after retries".into())))
    }
}

#[async_trait]
impl GeneratorBackend for HostedGenerator {
    async fn generate(
        &self,
        question: &str,
        passages: &[Passage],
        history: &HistoryTurns,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: self.build_messages(question, passages, history),
            temperature: self.temperature,
            stream: false,
        };

        let response = self.send_chat(&request).await?;
        let parsed: ChatResponse = response.json().await.map_err(|e| {
            Error::BackendUnavailable(format!("malformed generation response: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| Error::BackendUnavailable("generation returned no choices".into()))
    }

    async fn generate_stream(
        &self,
        question: &str,
        passages: &[Passage],
        history: &HistoryTurns,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let request = ChatRequest {
            model: &self.model,
            messages: self.build_messages(question, passages, history),
            temperature: self.temperature,
            stream: true,
        };

        let response = self.send_chat(&request).await?;
        let bytes = response.bytes_stream().boxed();

        // Reassemble SSE lines across byte-chunk boundaries and pull the
        // delta text out of each `data:` event.
        let stream = futures_util::stream::unfold(
            (bytes, String::new()),
            |(mut bytes, mut buffer)| async move {
                loop {
                    if let Some(newline) = buffer.find('\n') {
                        let line = buffer[..newline].trim().to_string();
                        buffer.drain(..=newline);

                        let Some(data) = line.strip_prefix("data:").map(str::trim) else {
                            continue;
                        };
                        if data == "[DONE]" {
                            return None;
                        }
                        let Ok(event) = serde_json::from_str::<serde_json::Value>(data) else {
                            continue;
                        };
                        if let Some(content) = event
                            .pointer("/choices/0/delta/content")
                            .and_then(|c| c.as_str())
                        {
                            if !content.is_empty() {
                                return Some((Ok(content.to_string()), (bytes, buffer)));
                            }
                        }
                        continue;
                    }

                    match bytes.next().await {
                        Some(Ok(chunk)) => buffer.push_str(&String::from_utf8_lossy(&chunk)),
                        Some(Err(e)) => {
                            return Some((
                                Err(Error::BackendUnavailable(format!("stream error: {}", e))),
                                (bytes, buffer),
                            ))
                        }
                        None => return None,
                    }
                }
            },
        );

        Ok(stream.boxed())
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/v1/models", self.base_url);
        match self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn name(&self) -> &str {
        "hosted"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
