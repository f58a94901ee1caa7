//! Core data model for the DAG orchestration backbone: sessions, DAG
//! plans, execution plans, modes, events, and the shared error type.

pub mod clock;
pub mod dag;
pub mod error;
pub mod event;
#[macro_use]
pub mod macros;
pub mod mode;
pub mod plan;
pub mod session;
pub mod tool_call;

pub use clock::{Clock, FakeClock, SystemClock};
pub use dag::{DAGNode, DAGPlan, NodeStatus, ParamExpr};
pub use error::{OrchestratorError, Result};
pub use event::Event;
pub use mode::{ModeConfig, ModeManager, PreviewLimit, MODE_DEFINITIONS};
pub use plan::{ExecutionPlan, PlanStep, PlanStepStatus};
pub use session::{DagsterJobHandle, DbConfig, Session, SessionId, SessionRegistry};
pub use tool_call::ToolCallRecord;
