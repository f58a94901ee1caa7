//! The tool contract (spec §4.C). Grounded on
//! `original_source/agent/executor.py`'s `_prepare_inputs`, which merges a
//! node's literal params with `database_url` and the resolved outputs of
//! its dependencies before a tool runs.

use async_trait::async_trait;
use dagctl_core::OrchestratorError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a tool call needs besides its own parameters: the
/// session's database handle (if any) and the already-resolved outputs
/// of the node's dependencies, keyed by dependency node id.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub session_id: String,
    pub database_url: Option<String>,
    pub dependencies_data: HashMap<String, Value>,
}

impl ToolContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), database_url: None, dependencies_data: HashMap::new() }
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn with_dependency_output(mut self, node_id: impl Into<String>, value: Value) -> Self {
        self.dependencies_data.insert(node_id.into(), value);
        self
    }
}

/// A unit of work the scheduler can invoke for a `DAGNode`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn execute(&self, params: HashMap<String, Value>, ctx: &ToolContext) -> Result<Value, OrchestratorError>;
}

pub type SharedTool = Arc<dyn Tool>;

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        async fn execute(&self, params: HashMap<String, Value>, _ctx: &ToolContext) -> Result<Value, OrchestratorError> {
            Ok(Value::Object(params.into_iter().collect()))
        }
    }
}
