//! Turn-scoped conversation history with automatic compaction (spec §4.E).

use crate::compactor::Compactor;
use dagctl_adapters::{ChatMessage, LlmClient};
use dagctl_core::OrchestratorError;

pub struct HistoryConfig {
    pub max_tokens: usize,
    pub compact_threshold: f64,
    pub keep_ratio: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_tokens: 128_000, compact_threshold: 0.8, keep_ratio: 0.1 }
    }
}

pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
    config: HistoryConfig,
    compactor: Compactor,
}

impl ConversationHistory {
    pub fn new(config: HistoryConfig) -> Result<Self, OrchestratorError> {
        Ok(Self { messages: Vec::new(), config, compactor: Compactor::new()? })
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn token_count(&self) -> usize {
        self.compactor.count_tokens(&self.messages)
    }

    /// Compact the history in place if it has crossed the configured
    /// threshold. Returns whether compaction ran.
    pub async fn compact_if_needed(&mut self, summarizer: &dyn LlmClient) -> Result<bool, OrchestratorError> {
        if !self.compactor.should_compact(&self.messages, self.config.max_tokens, self.config.compact_threshold) {
            return Ok(false);
        }

        self.messages = self
            .compactor
            .compact(&self.messages, self.config.max_tokens, self.config.keep_ratio, summarizer)
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagctl_adapters::fake::FakeLlmClient;

    #[tokio::test]
    async fn compact_if_needed_is_a_no_op_below_threshold() {
        let mut history = ConversationHistory::new(HistoryConfig::default()).unwrap();
        history.push(ChatMessage::user("hello"));
        let summarizer = FakeLlmClient::new("unused");

        let compacted = history.compact_if_needed(&summarizer).await.unwrap();
        assert!(!compacted);
        assert_eq!(history.messages().len(), 1);
    }

    #[tokio::test]
    async fn compact_if_needed_shrinks_history_past_threshold() {
        let config = HistoryConfig { max_tokens: 50, compact_threshold: 0.5, keep_ratio: 0.2 };
        let mut history = ConversationHistory::new(config).unwrap();
        for i in 0..50 {
            history.push(ChatMessage::user(format!("message number {i} with some padding text")));
        }
        let summarizer = FakeLlmClient::new("summary of early messages");

        let compacted = history.compact_if_needed(&summarizer).await.unwrap();
        assert!(compacted);
        assert!(history.messages().len() < 50);
    }
}
