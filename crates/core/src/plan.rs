//! Execution plans: the human-readable, pre-DAG breakdown of a goal into
//! steps (spec §3, §4.E Plan Mode). Distinct from [`crate::dag::DAGPlan`]:
//! an `ExecutionPlan` is proposed to the user for approval before any tool
//! runs; a `DAGPlan` is the scheduler's executable graph derived from it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStepStatus {
    Pending,
    InProgress,
    Done,
    Skipped,
}

crate::simple_display! {
    PlanStepStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Done => "done",
        Skipped => "skipped",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub index: usize,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_hint: Option<String>,
    pub status: PlanStepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl PlanStep {
    pub fn new(index: usize, description: impl Into<String>) -> Self {
        Self {
            index,
            description: description.into(),
            tool_hint: None,
            status: PlanStepStatus::Pending,
            result: None,
        }
    }

    crate::setters! {
        option { tool_hint: String }
    }
}

/// A proposed breakdown of a user's goal, shown for approval under Plan
/// Mode before any DAG is built or executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub goal: String,
    pub steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    pub fn new(goal: impl Into<String>) -> Self {
        Self { goal: goal.into(), steps: Vec::new() }
    }

    pub fn with_step(mut self, step: PlanStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| matches!(s.status, PlanStepStatus::Done | PlanStepStatus::Skipped))
    }

    /// The step complexity heuristic used by the Plan Gate (spec §4.E): a
    /// goal is routed through Plan Mode confirmation when it would produce
    /// more than this many steps.
    pub const COMPLEXITY_THRESHOLD: usize = 3;

    pub fn exceeds_complexity_threshold(&self) -> bool {
        self.steps.len() > Self::COMPLEXITY_THRESHOLD
    }

    pub fn mark_step_done(&mut self, index: usize, result: impl Into<String>) {
        if let Some(step) = self.steps.iter_mut().find(|s| s.index == index) {
            step.status = PlanStepStatus::Done;
            step.result = Some(result.into());
        }
    }

    pub fn step(&self, index: usize) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.index == index)
    }
}
