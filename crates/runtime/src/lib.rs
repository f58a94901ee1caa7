//! Agent turn runtime: event bus, history compaction, privilege gate,
//! plan gate, and the turn state machine that ties them together.

pub mod compactor;
pub mod event_bus;
pub mod history;
pub mod plan_gate;
pub mod privilege_gate;
pub mod runtime;
pub mod subagent_monitor;

pub use compactor::Compactor;
pub use event_bus::EventBus;
pub use history::{ConversationHistory, HistoryConfig};
pub use plan_gate::PlanGate;
pub use privilege_gate::{ConfirmationOutcome, PrivilegeGate};
pub use runtime::{AgentRuntime, AgentRuntimeConfig};
pub use subagent_monitor::SubAgentToolMonitor;
