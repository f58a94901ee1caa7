//! LLM client boundary. The actual model/provider integration is a
//! collaborator outside this crate's scope; this trait is the seam the
//! Agent Runtime calls through.

use async_trait::async_trait;
use dagctl_core::OrchestratorError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: MessageRole::System, content: content.into() }
    }
}

/// A chunk of a streaming completion.
#[derive(Debug, Clone)]
pub struct CompletionChunk {
    pub delta: String,
    pub done: bool,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Request a full (non-streaming) completion.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, OrchestratorError>;

    /// Request a streaming completion; chunks are pushed onto `tx` as
    /// they arrive. The final chunk has `done = true`.
    async fn stream(&self, messages: &[ChatMessage], tx: mpsc::Sender<CompletionChunk>) -> Result<(), OrchestratorError>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;

    /// A deterministic stand-in for integration tests: echoes a fixed
    /// response, optionally split into chunks for streaming.
    pub struct FakeLlmClient {
        pub response: String,
    }

    impl FakeLlmClient {
        pub fn new(response: impl Into<String>) -> Self {
            Self { response: response.into() }
        }
    }

    #[async_trait]
    impl LlmClient for FakeLlmClient {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, OrchestratorError> {
            Ok(self.response.clone())
        }

        async fn stream(&self, _messages: &[ChatMessage], tx: mpsc::Sender<CompletionChunk>) -> Result<(), OrchestratorError> {
            for word in self.response.split_whitespace() {
                let _ = tx.send(CompletionChunk { delta: format!("{word} "), done: false }).await;
            }
            let _ = tx.send(CompletionChunk { delta: String::new(), done: true }).await;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeLlmClient;
    use super::*;

    #[tokio::test]
    async fn fake_client_completes_with_fixed_response() {
        let client = FakeLlmClient::new("hello world");
        let out = client.complete(&[ChatMessage::user("hi")]).await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn fake_client_streams_and_terminates() {
        let client = FakeLlmClient::new("a b c");
        let (tx, mut rx) = mpsc::channel(8);
        client.stream(&[], tx).await.unwrap();

        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            let done = chunk.done;
            chunks.push(chunk);
            if done {
                break;
            }
        }
        assert!(chunks.last().unwrap().done);
    }
}
