//! Stable error kinds for the orchestration layer (spec §7).
//!
//! Fatal kinds (`ConfigError`, `SessionInitFailed`) are meant to terminate
//! the owning process; everything else is recoverable at the turn or node
//! level and is carried in-band (`DAGNode::error`, tool result text) rather
//! than unwound through `?` once it reaches the scheduler/runtime boundary.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("session init failed: {0}")]
    SessionInitFailed(String),

    #[error("cyclic dependency detected among nodes: {0:?}")]
    CyclicDependency(Vec<String>),

    #[error("node {node} references unknown dependency {dependency}")]
    DanglingReference { node: String, dependency: String },

    #[error("duplicate node id: {0}")]
    DuplicateNodeId(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool {tool} failed: {message}")]
    ToolFailure { tool: String, message: String },

    #[error("tool {tool} exceeded its deadline of {deadline_ms}ms")]
    ExecutionTimeout { tool: String, deadline_ms: u64 },

    #[error("user rejected the privileged call: {0}")]
    UserRejected(String),

    #[error("execution interrupted")]
    Interrupted,

    #[error("sandbox unavailable for session {session_id}: {reason}")]
    SandboxUnavailable { session_id: String, reason: String },

    #[error("history compaction failed: {0}")]
    CompactionFailed(String),
}

impl OrchestratorError {
    /// Short stable tag, used in events and API error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "config_error",
            Self::SessionInitFailed(_) => "session_init_failed",
            Self::CyclicDependency(_) => "cyclic_dependency",
            Self::DanglingReference { .. } => "dangling_reference",
            Self::DuplicateNodeId(_) => "duplicate_node_id",
            Self::ToolNotFound(_) => "tool_not_found",
            Self::ToolFailure { .. } => "tool_failure",
            Self::ExecutionTimeout { .. } => "execution_timeout",
            Self::UserRejected(_) => "user_rejected",
            Self::Interrupted => "interrupted",
            Self::SandboxUnavailable { .. } => "sandbox_unavailable",
            Self::CompactionFailed(_) => "compaction_failed",
        }
    }

    /// Fatal kinds terminate the owning process; everything else is
    /// recoverable at the turn or node level.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigError(_) | Self::SessionInitFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
