//! A minimal OpenAI-compatible [`LlmClient`]. The actual model/provider
//! integration is out of scope for this crate; this is a thin reference
//! implementation of the trait boundary, grounded on
//! `querymt-querymt/crates/providers/openai`'s request/response shape
//! without its plugin machinery.

use crate::llm::{ChatMessage, CompletionChunk, LlmClient, MessageRole};
use async_trait::async_trait;
use dagctl_core::OrchestratorError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

fn role_str(role: &MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Calls a configured OpenAI-compatible `/chat/completions` endpoint.
/// Streaming is implemented by completing the full response, then
/// replaying it as word-sized chunks: the wire protocol's SSE delta
/// framing is a provider-specific detail out of scope here.
pub struct HttpLlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpLlmClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), api_key: api_key.into(), model: model.into() }
    }

    /// Build from the standard `OPENAI_BASE_URL` / `OPENAI_API_KEY` /
    /// `OPENAI_MODEL` environment variables, defaulting the base url and
    /// model to common values.
    pub fn from_env() -> Self {
        let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        Self::new(base_url, api_key, model)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, OrchestratorError> {
        let wire: Vec<WireMessage> = messages.iter().map(|m| WireMessage { role: role_str(&m.role), content: &m.content }).collect();
        let request = ChatRequest { model: &self.model, messages: wire, stream: false };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| OrchestratorError::ToolFailure { tool: "llm".to_string(), message: format!("request failed: {e}") })?;

        if !response.status().is_success() {
            return Err(OrchestratorError::ToolFailure { tool: "llm".to_string(), message: format!("returned status {}", response.status()) });
        }

        let body: ChatResponse = response.json().await.map_err(|e| OrchestratorError::ToolFailure { tool: "llm".to_string(), message: format!("response decode failed: {e}") })?;

        Ok(body.choices.into_iter().next().and_then(|c| c.message.content).unwrap_or_default())
    }

    async fn stream(&self, messages: &[ChatMessage], tx: mpsc::Sender<CompletionChunk>) -> Result<(), OrchestratorError> {
        let full = self.complete(messages).await?;
        for word in full.split_whitespace() {
            if tx.send(CompletionChunk { delta: format!("{word} "), done: false }).await.is_err() {
                return Ok(());
            }
        }
        let _ = tx.send(CompletionChunk { delta: String::new(), done: true }).await;
        Ok(())
    }
}
