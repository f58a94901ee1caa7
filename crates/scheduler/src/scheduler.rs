//! Level-parallel DAG execution (spec §4.D, §5). Grounded on
//! `original_source/agent/executor.py::execute_dag_parallel`: nodes are
//! grouped into dependency levels, each level runs fully concurrently via
//! `asyncio.gather`, and any failure within a level halts the remaining
//! levels without cancelling sibling calls already in flight.

use crate::cancel::CancelSignal;
use dagctl_core::dag::{DAGPlan, NodeStatus, ParamExpr};
use dagctl_core::event::Event;
use dagctl_core::OrchestratorError;
use dagctl_tools::{ToolContext, ToolRegistry};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub default_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { default_timeout: Duration::from_secs(300) }
    }
}

pub struct Scheduler {
    registry: Arc<ToolRegistry>,
    config: SchedulerConfig,
}

/// Outcome of one complete DAG execution: which nodes ran, and whether
/// the overall plan succeeded.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    pub successful: bool,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
}

impl Scheduler {
    pub fn new(registry: Arc<ToolRegistry>, config: SchedulerConfig) -> Self {
        Self { registry, config }
    }

    /// Run every node in `plan` to completion, level by level, halting
    /// remaining levels as soon as any node in a level fails. Structural
    /// problems (cycles, dangling refs, duplicate ids) are returned as an
    /// error before anything runs; per-node tool failures are instead
    /// recorded on the node and reflected in the returned summary.
    pub async fn execute(
        &self,
        plan: &mut DAGPlan,
        session_id: &str,
        database_url: Option<&str>,
        cancel: CancelSignal,
        on_event: Option<Arc<dyn Fn(Event) + Send + Sync>>,
    ) -> Result<ExecutionSummary, OrchestratorError> {
        let errors = plan.validate();
        if let Some(first) = errors.into_iter().next() {
            return Err(first);
        }

        let levels = plan.levels()?;
        let mut failure_halt = false;

        for level in &levels {
            if cancel.is_cancelled() {
                mark_interrupted_nodes(plan);
                return Err(OrchestratorError::Interrupted);
            }
            if failure_halt {
                break;
            }

            let mut join_set: JoinSet<(String, NodeOutcome)> = JoinSet::new();

            for node_id in level {
                if cancel.is_cancelled() {
                    break;
                }

                let node = plan.get_node(node_id).expect("level node must exist in plan");
                let tool_name = node.tool.clone();
                let params = resolve_params(&node.params, plan);
                let mut ctx = ToolContext::new(session_id);
                if let Some(url) = database_url {
                    ctx = ctx.with_database_url(url);
                }
                let registry = self.registry.clone();
                let timeout = self.config.default_timeout;
                let node_id = node_id.clone();

                if let Some(cb) = &on_event {
                    cb(Event::NodeStart { node_id: node_id.clone(), tool: tool_name.clone() });
                }

                join_set.spawn(async move {
                    let outcome = run_one_node(&registry, &tool_name, params, &ctx, timeout).await;
                    (node_id, outcome)
                });
            }

            let mut level_failed = false;
            while let Some(joined) = join_set.join_next().await {
                let (node_id, outcome) = match joined {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "node task panicked");
                        continue;
                    }
                };
                let node = plan.get_node_mut(&node_id).expect("node must exist");
                match outcome {
                    NodeOutcome::Success { value, elapsed } => {
                        node.status = NodeStatus::Completed;
                        node.result = Some(value);
                        node.execution_time = Some(elapsed);
                    }
                    NodeOutcome::Failure { error, elapsed } => {
                        node.status = NodeStatus::Failed;
                        node.error = Some(error.to_string());
                        node.execution_time = Some(elapsed);
                        level_failed = true;
                    }
                }
                if let Some(cb) = &on_event {
                    cb(Event::NodeComplete { node_id: node_id.clone(), status: node.status.to_string() });
                }
            }

            if level_failed {
                // Per spec, any node whose transitive dependency failed
                // stays `pending`: remaining levels simply never run.
                failure_halt = true;
            }

            if cancel.is_cancelled() {
                mark_interrupted_nodes(plan);
                return Err(OrchestratorError::Interrupted);
            }
        }

        Ok(summarize(plan))
    }
}

enum NodeOutcome {
    Success { value: Value, elapsed: Duration },
    Failure { error: OrchestratorError, elapsed: Duration },
}

async fn run_one_node(
    registry: &ToolRegistry,
    tool_name: &str,
    params: HashMap<String, Value>,
    ctx: &ToolContext,
    timeout: Duration,
) -> NodeOutcome {
    let started = Instant::now();

    let tool = match registry.resolve(tool_name) {
        Ok(tool) => tool,
        Err(e) => return NodeOutcome::Failure { error: e, elapsed: started.elapsed() },
    };

    match tokio::time::timeout(timeout, tool.execute(params, ctx)).await {
        Ok(Ok(value)) => NodeOutcome::Success { value, elapsed: started.elapsed() },
        Ok(Err(e)) => NodeOutcome::Failure { error: e, elapsed: started.elapsed() },
        Err(_) => NodeOutcome::Failure {
            error: OrchestratorError::ExecutionTimeout { tool: tool_name.to_string(), deadline_ms: timeout.as_millis() as u64 },
            elapsed: started.elapsed(),
        },
    }
}

/// Substitute `${node_id}` parameter references with the referenced
/// node's result, falling back to the literal value if the dependency
/// hasn't produced one (should not happen once `validate` has run).
pub fn resolve_params(params: &HashMap<String, ParamExpr>, plan: &DAGPlan) -> HashMap<String, Value> {
    params
        .iter()
        .map(|(key, expr)| {
            let value = match expr {
                ParamExpr::Ref(node_id) => plan
                    .get_node(node_id)
                    .and_then(|n| n.result.clone())
                    .unwrap_or(Value::Null),
                ParamExpr::Literal(value) => value.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Cancellation leaves not-yet-started nodes `pending` (spec §4.D, §8) but
/// annotates each with the interrupted-kind error text so callers inspecting
/// the plan after a cancelled run can tell why a node never started.
fn mark_interrupted_nodes(plan: &mut DAGPlan) {
    for node in plan.nodes.iter_mut() {
        if matches!(node.status, NodeStatus::Pending) {
            node.error = Some(OrchestratorError::Interrupted.to_string());
        }
    }
}

fn summarize(plan: &DAGPlan) -> ExecutionSummary {
    let mut completed = Vec::new();
    let mut failed = Vec::new();
    let mut skipped = Vec::new();

    for node in &plan.nodes {
        match node.status {
            NodeStatus::Completed => completed.push(node.id.clone()),
            NodeStatus::Failed => failed.push(node.id.clone()),
            NodeStatus::Skipped => skipped.push(node.id.clone()),
            _ => {}
        }
    }

    let successful = failed.is_empty() && skipped.is_empty();
    if successful {
        info!(nodes = completed.len(), "dag execution completed successfully");
    }

    ExecutionSummary { successful, completed, failed, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dagctl_core::dag::DAGNode;
    use dagctl_tools::Tool;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingTool {
        calls: Arc<Mutex<Vec<String>>>,
        concurrent_peak: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
        delay: Duration,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl Tool for RecordingTool {
        fn name(&self) -> &str {
            "record"
        }

        async fn execute(&self, params: HashMap<String, Value>, _ctx: &ToolContext) -> Result<Value, OrchestratorError> {
            let label = params.get("label").and_then(|v| v.as_str()).unwrap_or("?").to_string();
            self.calls.lock().unwrap().push(label.clone());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.concurrent_peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_on.as_deref() == Some(label.as_str()) {
                return Err(OrchestratorError::ToolFailure { tool: "record".into(), message: "forced failure".into() });
            }
            Ok(Value::String(label))
        }
    }

    fn registry_with(tool: Arc<RecordingTool>) -> Arc<ToolRegistry> {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(tool);
        registry
    }

    fn node(id: &str, deps: &[&str]) -> DAGNode {
        let mut n = DAGNode::new(id, id, "record").with_param("label", Value::String(id.to_string()));
        for d in deps {
            n = n.depends_on(*d);
        }
        n
    }

    #[tokio::test]
    async fn parallel_fan_out_runs_concurrently() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let peak = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let tool = Arc::new(RecordingTool {
            calls: calls.clone(),
            concurrent_peak: peak.clone(),
            in_flight: in_flight.clone(),
            delay: Duration::from_millis(30),
            fail_on: None,
        });

        let mut plan = DAGPlan::new("p", "fan out", "")
            .with_node(node("a", &[]))
            .with_node(node("b", &[]))
            .with_node(node("c", &[]));

        let scheduler = Scheduler::new(registry_with(tool), SchedulerConfig::default());
        let summary = scheduler.execute(&mut plan, "s1", None, CancelSignal::new(), None).await.unwrap();

        assert!(summary.successful);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn halt_on_failure_leaves_downstream_nodes_pending() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let peak = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let tool = Arc::new(RecordingTool {
            calls: calls.clone(),
            concurrent_peak: peak,
            in_flight,
            delay: Duration::from_millis(1),
            fail_on: Some("a".to_string()),
        });

        let mut plan = DAGPlan::new("p", "chain", "")
            .with_node(node("a", &[]))
            .with_node(node("b", &["a"]))
            .with_node(node("c", &["b"]));

        let scheduler = Scheduler::new(registry_with(tool), SchedulerConfig::default());
        let summary = scheduler.execute(&mut plan, "s1", None, CancelSignal::new(), None).await.unwrap();

        assert!(!summary.successful);
        assert_eq!(summary.failed, vec!["a".to_string()]);
        assert!(summary.skipped.is_empty());
        assert_eq!(plan.get_node("b").unwrap().status, NodeStatus::Pending);
        assert_eq!(plan.get_node("c").unwrap().status, NodeStatus::Pending);
        assert!(!calls.lock().unwrap().contains(&"b".to_string()));
    }

    #[tokio::test]
    async fn cancellation_returns_interrupted_and_leaves_rest_pending() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let peak = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let tool = Arc::new(RecordingTool {
            calls: calls.clone(),
            concurrent_peak: peak,
            in_flight,
            delay: Duration::from_millis(30),
            fail_on: None,
        });

        let mut plan = DAGPlan::new("p", "chain", "")
            .with_node(node("a", &[]))
            .with_node(node("b", &["a"]))
            .with_node(node("c", &["b"]))
            .with_node(node("d", &["c"]))
            .with_node(node("e", &["d"]));

        let cancel = CancelSignal::new();
        let scheduler = Scheduler::new(registry_with(tool), SchedulerConfig::default());

        let cancel_clone = cancel.clone();
        let cancel_after = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            cancel_clone.cancel();
        });

        let result = scheduler.execute(&mut plan, "s1", None, cancel, None).await;
        cancel_after.await.unwrap();

        assert!(matches!(result, Err(OrchestratorError::Interrupted)));
        assert_eq!(plan.get_node("a").unwrap().status, NodeStatus::Completed);
        for id in ["b", "c", "d", "e"] {
            let remaining = plan.get_node(id).unwrap();
            if remaining.status == NodeStatus::Pending {
                assert!(remaining.error.as_ref().unwrap().contains("interrupted"));
            }
        }
    }

    #[tokio::test]
    async fn param_ref_resolves_to_dependency_result() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let peak = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let tool = Arc::new(RecordingTool { calls, concurrent_peak: peak, in_flight, delay: Duration::from_millis(1), fail_on: None });

        let mut plan = DAGPlan::new("p", "ref", "")
            .with_node(node("a", &[]))
            .with_node(DAGNode::new("b", "b", "record").with_param("label", serde_json::json!("${a}")).depends_on("a"));

        let scheduler = Scheduler::new(registry_with(tool), SchedulerConfig::default());
        let summary = scheduler.execute(&mut plan, "s1", None, CancelSignal::new(), None).await.unwrap();

        assert!(summary.successful);
        let b = plan.get_node("b").unwrap();
        assert_eq!(b.result, Some(Value::String("a".to_string())));
    }

    #[tokio::test]
    async fn tool_exceeding_deadline_is_recorded_as_timeout() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let peak = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let tool = Arc::new(RecordingTool { calls, concurrent_peak: peak, in_flight, delay: Duration::from_millis(50), fail_on: None });

        let mut plan = DAGPlan::new("p", "slow", "").with_node(node("a", &[]));
        let scheduler = Scheduler::new(registry_with(tool), SchedulerConfig { default_timeout: Duration::from_millis(5) });
        let summary = scheduler.execute(&mut plan, "s1", None, CancelSignal::new(), None).await.unwrap();

        assert!(!summary.successful);
        let a = plan.get_node("a").unwrap();
        assert_eq!(a.status, NodeStatus::Failed);
        assert!(a.error.as_ref().unwrap().contains("deadline"));
    }
}
