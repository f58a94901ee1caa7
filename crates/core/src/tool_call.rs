//! Tool call history: a persistent record of what a turn actually did
//! (spec §3, §4.E). Grounded on `original_source/agent/middleware/subagent_monitor.py`
//! for the truncated-result/sub-agent-label shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Truncate a tool result preview to a fixed character budget, matching the
/// original's 1000-character truncation for monitored sub-agent calls.
pub const RESULT_PREVIEW_CHARS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub step: usize,
    pub tool: String,
    pub args: Value,
    pub result_preview: String,
    pub truncated: bool,
    pub timestamp_ms: u64,
    /// Set when the call was issued by a monitored sub-agent rather than
    /// the top-level turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subagent_label: Option<String>,
}

impl ToolCallRecord {
    pub fn new(step: usize, tool: impl Into<String>, args: Value, result: &str, timestamp_ms: u64) -> Self {
        let truncated = result.chars().count() > RESULT_PREVIEW_CHARS;
        let result_preview = if truncated {
            result.chars().take(RESULT_PREVIEW_CHARS).collect()
        } else {
            result.to_string()
        };

        Self {
            step,
            tool: tool.into(),
            args,
            result_preview,
            truncated,
            timestamp_ms,
            subagent_label: None,
        }
    }

    crate::setters! {
        option { subagent_label: String }
    }
}
