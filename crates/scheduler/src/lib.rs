//! Level-parallel DAG scheduler.

pub mod cancel;
pub mod scheduler;

pub use cancel::CancelSignal;
pub use scheduler::{resolve_params, ExecutionSummary, Scheduler, SchedulerConfig};
