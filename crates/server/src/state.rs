//! Shared application state handed to every handler (spec §6).

use dagctl_adapters::LlmClient;
use dagctl_core::{ModeManager, OrchestratorError, SessionRegistry};
use dagctl_runtime::{AgentRuntime, ConversationHistory, HistoryConfig};
use dagctl_storage::ConfigLoader;
use dagctl_tools::ToolRegistry;
use std::collections::HashMap;
use std::sync::Arc;

pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub tools: Arc<ToolRegistry>,
    pub modes: Arc<ModeManager>,
    pub runtime: Arc<AgentRuntime>,
    pub config: Arc<ConfigLoader>,
    pub llm: Arc<dyn LlmClient>,
    histories: parking_lot::Mutex<HashMap<String, ConversationHistory>>,
}

impl AppState {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        tools: Arc<ToolRegistry>,
        modes: Arc<ModeManager>,
        runtime: Arc<AgentRuntime>,
        config: Arc<ConfigLoader>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self { sessions, tools, modes, runtime, config, llm, histories: parking_lot::Mutex::new(HashMap::new()) }
    }

    /// Append `message` to the session's history, compacting it first if
    /// it has a history entry that crosses the configured threshold.
    pub async fn push_and_compact(&self, session_id: &str, message: dagctl_adapters::ChatMessage) -> Result<Vec<dagctl_adapters::ChatMessage>, OrchestratorError> {
        let mut history = {
            let mut histories = self.histories.lock();
            histories.remove(session_id).map(Ok).unwrap_or_else(|| ConversationHistory::new(HistoryConfig::default()))?
        };

        history.push(message);
        history.compact_if_needed(self.llm.as_ref()).await?;
        let snapshot = history.messages().to_vec();

        self.histories.lock().insert(session_id.to_string(), history);
        Ok(snapshot)
    }
}
