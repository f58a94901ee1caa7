//! The Agent Runtime: ties session, tool registry, scheduler, privilege
//! gate, plan gate, history compaction, and event bus together into one
//! turn state machine (spec §4.E). Struct shape grounded on
//! `oj-daemon::engine::runtime::Runtime<A, N, C: Clock>`.

use crate::event_bus::EventBus;
use crate::plan_gate::PlanGate;
use crate::privilege_gate::{ConfirmationOutcome, PrivilegeGate};
use dagctl_core::dag::DAGPlan;
use dagctl_core::event::Event;
use dagctl_core::plan::ExecutionPlan;
use dagctl_core::{ModeConfig, OrchestratorError, Session};
use dagctl_scheduler::{resolve_params, CancelSignal, ExecutionSummary, Scheduler};
use dagctl_tools::ToolRegistry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

pub struct AgentRuntimeConfig {
    pub confirmation_timeout: Duration,
}

impl Default for AgentRuntimeConfig {
    fn default() -> Self {
        Self { confirmation_timeout: Duration::from_secs(120) }
    }
}

/// One long-lived runtime serving many concurrent turns. Each turn gets
/// its own [`EventBus`] so streaming output from one request never
/// leaks into another's subscribers; turns are looked up by id when a
/// `feedback_ack` resolves a pending confirmation.
pub struct AgentRuntime {
    registry: Arc<ToolRegistry>,
    scheduler: Arc<Scheduler>,
    privilege_gate: Arc<PrivilegeGate>,
    plan_gate: Arc<PlanGate>,
    config: AgentRuntimeConfig,
    turns: Mutex<HashMap<String, Arc<EventBus>>>,
}

impl AgentRuntime {
    pub fn new(registry: Arc<ToolRegistry>, scheduler: Arc<Scheduler>, config: AgentRuntimeConfig) -> Self {
        Self {
            registry,
            scheduler,
            privilege_gate: Arc::new(PrivilegeGate::new()),
            plan_gate: Arc::new(PlanGate::new()),
            config,
            turns: Mutex::new(HashMap::new()),
        }
    }

    /// Start a turn and return a receiver streaming its events. The turn
    /// id is embedded in the final [`Event::Done`].
    pub fn begin_turn(&self, turn_id: impl Into<String>) -> (Arc<EventBus>, mpsc::Receiver<Event>) {
        let turn_id = turn_id.into();
        let bus = Arc::new(EventBus::new());
        let rx = bus.subscribe();
        self.turns.lock().insert(turn_id, bus.clone());
        (bus, rx)
    }

    pub fn end_turn(&self, turn_id: &str) {
        self.turns.lock().remove(turn_id);
    }

    /// Resolve a pending confirmation or plan-approval request by id,
    /// e.g. from an incoming WebSocket `feedback_ack` message.
    pub fn resolve_confirmation(&self, id: &str, outcome: ConfirmationOutcome) -> bool {
        self.privilege_gate.resolve(id, outcome.clone()) || self.plan_gate.resolve(id, outcome)
    }

    /// Run an execution plan end to end: Plan Gate approval (if
    /// required), Safe Mode confirmation for any data-modifying node,
    /// then the DAG itself. Returns early with `UserRejected` if either
    /// gate is not approved.
    pub async fn run_dag(
        &self,
        bus: Arc<EventBus>,
        session: Arc<Session>,
        modes: ModeConfig,
        plan: ExecutionPlan,
        mut dag: DAGPlan,
        database_url: Option<String>,
        cancel: CancelSignal,
    ) -> Result<ExecutionSummary, OrchestratorError> {
        if self.plan_gate.requires_approval(modes.plan_mode, &plan) {
            let publish = {
                let bus = bus.clone();
                move |e: Event| bus.publish(e)
            };
            let outcome = self.plan_gate.request_approval(publish, &plan, self.config.confirmation_timeout).await;
            match outcome {
                ConfirmationOutcome::Approved | ConfirmationOutcome::Edited(_) => {}
                ConfirmationOutcome::Rejected => return Err(OrchestratorError::UserRejected("plan rejected".into())),
                ConfirmationOutcome::TimedOut => return Err(OrchestratorError::UserRejected("plan approval timed out".into())),
            }
        }

        for node in &dag.nodes {
            if self.registry.resolve(&node.tool).is_err() {
                continue;
            }
            let resolved = resolve_params(&node.params, &dag);
            if !self.privilege_gate.requires_confirmation(modes.safe_mode, &node.tool, &resolved) {
                continue;
            }
            let preview = resolved.get("query").and_then(|v| v.as_str()).map(|s| s.to_string());
            let publish = {
                let bus = bus.clone();
                move |e: Event| bus.publish(e)
            };
            let description = format!("{} ({})", node.name, node.tool);
            let outcome = self
                .privilege_gate
                .request(publish, &node.tool, &description, preview, self.config.confirmation_timeout)
                .await;
            match outcome {
                ConfirmationOutcome::Approved | ConfirmationOutcome::Edited(_) => {}
                ConfirmationOutcome::Rejected => return Err(OrchestratorError::UserRejected(node.id.clone())),
                ConfirmationOutcome::TimedOut => return Err(OrchestratorError::UserRejected(format!("{} confirmation timed out", node.id))),
            }
        }

        let on_event: Arc<dyn Fn(Event) + Send + Sync> = {
            let bus = bus.clone();
            Arc::new(move |e: Event| bus.publish(e))
        };

        let summary = self
            .scheduler
            .execute(&mut dag, session.id.as_str(), database_url.as_deref(), cancel, Some(on_event))
            .await?;

        info!(session = %session.id, successful = summary.successful, "dag run finished");
        Ok(summary)
    }
}
