//! The event stream emitted by a turn: everything pushed over SSE/WS and
//! fanned out by the Event Bus (spec §4.D, §6). Tagged-union shape
//! ported from `oj-core::event::Event`.

use crate::mode::ModeConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "thinking")]
    Thinking { text: String },

    #[serde(rename = "tool_call")]
    ToolCall { step: usize, tool: String, args: Value },

    #[serde(rename = "tool_result")]
    ToolResult { step: usize, tool: String, preview: String, truncated: bool },

    #[serde(rename = "subagent_tool_call")]
    SubagentToolCall { label: String, step: usize, tool: String, args: Value },

    #[serde(rename = "subagent_tool_result")]
    SubagentToolResult { label: String, step: usize, tool: String, preview: String },

    #[serde(rename = "message")]
    Message { role: String, text: String },

    #[serde(rename = "node_start")]
    NodeStart { node_id: String, tool: String },

    #[serde(rename = "node_complete")]
    NodeComplete { node_id: String, status: String },

    #[serde(rename = "confirmation_request")]
    ConfirmationRequest { id: String, tool: String, description: String, preview: Option<String> },

    #[serde(rename = "confirmation_resolved")]
    ConfirmationResolved { id: String, outcome: String },

    #[serde(rename = "modes_changed")]
    ModesChanged { modes: ModeConfig },

    #[serde(rename = "error")]
    Error { kind: String, message: String },

    #[serde(rename = "done")]
    Done { turn_id: String },
}

impl Event {
    /// The `type` tag as it appears on the wire, for logging/filtering.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Thinking { .. } => "thinking",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::SubagentToolCall { .. } => "subagent_tool_call",
            Self::SubagentToolResult { .. } => "subagent_tool_result",
            Self::Message { .. } => "message",
            Self::NodeStart { .. } => "node_start",
            Self::NodeComplete { .. } => "node_complete",
            Self::ConfirmationRequest { .. } => "confirmation_request",
            Self::ConfirmationResolved { .. } => "confirmation_resolved",
            Self::ModesChanged { .. } => "modes_changed",
            Self::Error { .. } => "error",
            Self::Done { .. } => "done",
        }
    }

    /// Whether this event terminates the turn's stream for a subscriber.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_union_round_trips_through_json() {
        let event = Event::ToolCall { step: 0, tool: "query_database".into(), args: serde_json::json!({"sql": "select 1"}) };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"tool_call\""));

        let decoded: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.kind(), "tool_call");
    }

    #[test]
    fn done_is_the_only_terminal_event() {
        assert!(Event::Done { turn_id: "t1".into() }.is_terminal());
        assert!(!Event::Message { role: "assistant".into(), text: "hi".into() }.is_terminal());
    }
}
