//! Forwards sub-agent tool-call activity onto the Event Bus as
//! `subagent_tool_call`/`subagent_tool_result` events (spec §4.E).
//! Grounded on `original_source/agent/middleware/subagent_monitor.py`'s
//! `SubAgentToolMonitor`.

use crate::event_bus::EventBus;
use dagctl_core::event::Event;
use dagctl_tools::ToolMiddleware;
use serde_json::Value;
use std::sync::Arc;

pub struct SubAgentToolMonitor {
    label: String,
    bus: Arc<EventBus>,
}

impl SubAgentToolMonitor {
    pub fn new(label: impl Into<String>, bus: Arc<EventBus>) -> Self {
        Self { label: label.into(), bus }
    }
}

impl ToolMiddleware for SubAgentToolMonitor {
    fn before_call(&self, step: usize, tool: &str, params: &Value) {
        self.bus.publish(Event::SubagentToolCall {
            label: self.label.clone(),
            step,
            tool: tool.to_string(),
            args: params.clone(),
        });
    }

    fn after_call(&self, step: usize, tool: &str, result_preview: &str) {
        self.bus.publish(Event::SubagentToolResult {
            label: self.label.clone(),
            step,
            tool: tool.to_string(),
            preview: result_preview.to_string(),
        });
    }
}
