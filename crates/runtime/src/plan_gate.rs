//! Plan Mode: gate DAG execution behind an approved [`ExecutionPlan`]
//! when Plan Mode is on, or whenever a goal's plan crosses the
//! complexity threshold regardless of mode (spec §4.E).

use crate::privilege_gate::{ConfirmationOutcome, PrivilegeGate};
use dagctl_core::event::Event;
use dagctl_core::plan::ExecutionPlan;
use std::time::Duration;

#[derive(Default)]
pub struct PlanGate {
    inner: PrivilegeGate,
}

impl PlanGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `plan` must be shown to the user for approval before any
    /// node runs.
    pub fn requires_approval(&self, plan_mode_enabled: bool, plan: &ExecutionPlan) -> bool {
        plan_mode_enabled || plan.exceeds_complexity_threshold()
    }

    pub async fn request_approval(&self, publish: impl Fn(Event), plan: &ExecutionPlan, timeout: Duration) -> ConfirmationOutcome {
        let preview = plan.steps.iter().map(|s| format!("{}. {}", s.index, s.description)).collect::<Vec<_>>().join("\n");
        self.inner.request(publish, "plan_approval", &plan.goal, Some(preview), timeout).await
    }

    pub fn resolve(&self, id: &str, outcome: ConfirmationOutcome) -> bool {
        self.inner.resolve(id, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagctl_core::plan::PlanStep;

    #[test]
    fn plan_mode_on_always_requires_approval() {
        let gate = PlanGate::new();
        let plan = ExecutionPlan::new("g").with_step(PlanStep::new(0, "a"));
        assert!(gate.requires_approval(true, &plan));
    }

    #[test]
    fn plan_mode_off_still_requires_approval_past_complexity_threshold() {
        let gate = PlanGate::new();
        let mut plan = ExecutionPlan::new("g");
        for i in 0..5 {
            plan = plan.with_step(PlanStep::new(i, format!("step {i}")));
        }
        assert!(gate.requires_approval(false, &plan));
    }

    #[test]
    fn simple_plan_with_plan_mode_off_does_not_require_approval() {
        let gate = PlanGate::new();
        let plan = ExecutionPlan::new("g").with_step(PlanStep::new(0, "a"));
        assert!(!gate.requires_approval(false, &plan));
    }
}
