//! Conversation history compaction (spec §4.E, §8). Grounded on
//! `original_source/agent/compactor.py::ConversationCompactor`: counts
//! tokens with `cl100k_base`, triggers once usage crosses a
//! percentage-of-budget threshold, and replaces the oldest messages with
//! an LLM-generated summary while keeping a configurable tail verbatim.

use dagctl_adapters::{ChatMessage, LlmClient, MessageRole};
use dagctl_core::OrchestratorError;
use tiktoken_rs::CoreBPE;

/// Per-message token overhead charged on top of content length, matching
/// the original's flat `+4` allowance for role/metadata framing.
const PER_MESSAGE_OVERHEAD: usize = 4;

const COMPACT_PROMPT: &str = "Summarize the conversation so far in a few dense sentences, \
preserving any facts, decisions, or identifiers a continuation would need.";

pub struct Compactor {
    bpe: CoreBPE,
}

impl Compactor {
    pub fn new() -> Result<Self, OrchestratorError> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| OrchestratorError::CompactionFailed(e.to_string()))?;
        Ok(Self { bpe })
    }

    fn count_text(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    pub fn count_tokens(&self, messages: &[ChatMessage]) -> usize {
        messages.iter().map(|m| self.count_text(&m.content) + PER_MESSAGE_OVERHEAD).sum()
    }

    /// Whether usage has crossed `threshold` (e.g. `0.8`) of `max_tokens`.
    pub fn should_compact(&self, messages: &[ChatMessage], max_tokens: usize, threshold: f64) -> bool {
        let budget = (max_tokens as f64 * threshold) as usize;
        self.count_tokens(messages) >= budget
    }

    /// Replace the oldest messages with a generated summary, keeping
    /// roughly `keep_ratio` of `max_tokens` worth of the most recent
    /// messages verbatim. The kept tail always starts on a user message.
    pub async fn compact(
        &self,
        messages: &[ChatMessage],
        max_tokens: usize,
        keep_ratio: f64,
        summarizer: &dyn LlmClient,
    ) -> Result<Vec<ChatMessage>, OrchestratorError> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        let keep_budget = (max_tokens as f64 * keep_ratio) as usize;
        let mut kept: Vec<&ChatMessage> = Vec::new();
        let mut used = 0usize;

        for message in messages.iter().rev() {
            let cost = self.count_text(&message.content) + PER_MESSAGE_OVERHEAD;
            if used + cost > keep_budget && !kept.is_empty() {
                break;
            }
            used += cost;
            kept.push(message);
        }
        kept.reverse();

        let split_at = messages.len() - kept.len();
        let dropped = &messages[..split_at];

        let kept = ensure_start_with_user(kept);

        if dropped.is_empty() {
            return Ok(kept.into_iter().cloned().collect());
        }

        let summary = self.generate_summary(dropped, summarizer).await?;
        let mut result = vec![ChatMessage::system(format!("Earlier conversation summary: {summary}"))];
        result.extend(kept.into_iter().cloned());
        Ok(result)
    }

    async fn generate_summary(&self, dropped: &[ChatMessage], summarizer: &dyn LlmClient) -> Result<String, OrchestratorError> {
        let mut prompt_messages: Vec<ChatMessage> = dropped.to_vec();
        prompt_messages.push(ChatMessage::user(COMPACT_PROMPT));
        summarizer.complete(&prompt_messages).await
    }
}

/// Drop leading non-user messages so the kept tail can stand alone as a
/// valid conversation prefix for the LLM.
fn ensure_start_with_user(kept: Vec<&ChatMessage>) -> Vec<&ChatMessage> {
    let start = kept.iter().position(|m| m.role == MessageRole::User).unwrap_or(0);
    kept[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagctl_adapters::fake::FakeLlmClient;

    fn msgs(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| if i % 2 == 0 { ChatMessage::user(format!("question {i}")) } else { ChatMessage::assistant(format!("answer {i}")) })
            .collect()
    }

    #[test]
    fn should_compact_triggers_past_threshold() {
        let compactor = Compactor::new().unwrap();
        let messages = msgs(2000);
        assert!(compactor.should_compact(&messages, 100, 0.8));
        assert!(!compactor.should_compact(&msgs(1), 1_000_000, 0.8));
    }

    #[tokio::test]
    async fn compact_keeps_a_verbatim_tail_starting_with_user() {
        let compactor = Compactor::new().unwrap();
        let messages = msgs(40);
        let summarizer = FakeLlmClient::new("the user asked several numbered questions");

        let result = compactor.compact(&messages, 2000, 0.1, &summarizer).await.unwrap();

        assert!(result.len() < messages.len());
        assert_eq!(result[0].role, MessageRole::System);
        assert!(result[0].content.contains("summary"));
        let first_kept = result.iter().skip(1).next().unwrap();
        assert_eq!(first_kept.role, MessageRole::User);
    }

    #[tokio::test]
    async fn compacting_short_history_keeps_everything_without_summary() {
        let compactor = Compactor::new().unwrap();
        let messages = msgs(2);
        let summarizer = FakeLlmClient::new("unused");

        let result = compactor.compact(&messages, 1_000_000, 0.99, &summarizer).await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].role, MessageRole::User);
    }
}
