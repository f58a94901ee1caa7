//! Tool registry: name resolution, aliases, grouping, and enable/disable
//! state (spec §4.C). Grounded on
//! `original_source/agent/executor.py::_build_tool_registry`.

use crate::tool::SharedTool;
use dagctl_core::OrchestratorError;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct RegistryState {
    tools: HashMap<String, SharedTool>,
    aliases: HashMap<String, String>,
    groups: HashMap<String, HashSet<String>>,
    disabled: HashSet<String>,
}

/// Central lookup for tools a DAG node can reference by name.
pub struct ToolRegistry {
    state: RwLock<RegistryState>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { state: RwLock::new(RegistryState::default()) }
    }

    pub fn register(&self, tool: SharedTool) {
        self.state.write().tools.insert(tool.name().to_string(), tool);
    }

    pub fn alias(&self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.state.write().aliases.insert(alias.into(), canonical.into());
    }

    pub fn add_to_group(&self, group: impl Into<String>, tool_name: impl Into<String>) {
        self.state.write().groups.entry(group.into()).or_default().insert(tool_name.into());
    }

    pub fn group_members(&self, group: &str) -> Vec<String> {
        self.state.read().groups.get(group).map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn disable(&self, tool_name: impl Into<String>) {
        self.state.write().disabled.insert(tool_name.into());
    }

    pub fn enable(&self, tool_name: &str) {
        self.state.write().disabled.remove(tool_name);
    }

    pub fn is_enabled(&self, tool_name: &str) -> bool {
        !self.state.read().disabled.contains(tool_name)
    }

    /// Resolve a name, following at most one alias hop, and return the
    /// tool only if it is registered and enabled.
    pub fn resolve(&self, name: &str) -> Result<SharedTool, OrchestratorError> {
        let state = self.state.read();
        let canonical = state.aliases.get(name).map(String::as_str).unwrap_or(name);

        if state.disabled.contains(canonical) {
            return Err(OrchestratorError::ToolNotFound(format!("{name} is disabled")));
        }

        state
            .tools
            .get(canonical)
            .cloned()
            .ok_or_else(|| OrchestratorError::ToolNotFound(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Apply a bulk enable/disable list, e.g. loaded from `agents.yaml`'s
    /// `tools:` section.
    pub fn apply_config(&self, disabled_tools: &[String]) {
        let mut state = self.state.write();
        state.disabled.clear();
        state.disabled.extend(disabled_tools.iter().cloned());
    }
}
