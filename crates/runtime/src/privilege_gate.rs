//! Human-in-the-loop confirmation for privileged tool calls (spec §4.D,
//! §4.E.5). Gated by Safe Mode plus whether the *resolved arguments* of
//! a SQL-executing tool amount to a data-modifying statement — not a
//! static per-tool flag. Grounded on `original_source/tools/sql_tools.py`'s
//! `execute_sql_query(query_type)` select-vs-everything-else branch and
//! `oj-core::decision`'s `Decision`/`DecisionOption` shape, adapted to a
//! request/response pair instead of a persisted record.

use dagctl_core::event::Event;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::warn;

/// The tool name used throughout the registry/CLI/spec examples for
/// running a raw SQL statement.
pub const SQL_EXECUTION_TOOL: &str = "execute_sql";

/// Statement verbs that mutate data, matching the original's dangerous-op
/// callout ("DROP/DELETE/UPDATE") plus the rest of its `query_type` enum.
pub const MUTATING_SQL_VERBS: &[&str] =
    &["insert", "update", "delete", "drop", "alter", "truncate", "create", "grant", "revoke"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Approved,
    Edited(String),
    Rejected,
    TimedOut,
}

/// Gates privileged tool calls behind user confirmation when Safe Mode
/// is on. One instance is shared across all turns in a process.
#[derive(Default)]
pub struct PrivilegeGate {
    pending: Mutex<HashMap<String, oneshot::Sender<ConfirmationOutcome>>>,
}

impl PrivilegeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `tool` called with the resolved `args` needs confirmation
    /// under the given Safe Mode setting: it is an SQL tool and its
    /// `query` argument's leading verb mutates data. A `select` through
    /// `execute_sql` is not gated; a mutating statement slipped through
    /// any other tool name is not this gate's concern (spec §4.E.5).
    pub fn requires_confirmation(&self, safe_mode: bool, tool: &str, args: &HashMap<String, Value>) -> bool {
        if !safe_mode || tool != SQL_EXECUTION_TOOL {
            return false;
        }
        let Some(query) = args.get("query").and_then(|v| v.as_str()) else {
            return false;
        };
        let verb = query.trim_start().split_whitespace().next().unwrap_or("").to_ascii_lowercase();
        MUTATING_SQL_VERBS.contains(&verb.as_str())
    }

    /// Publish a confirmation request and block until it is resolved or
    /// `timeout` elapses.
    pub async fn request(
        &self,
        publish: impl Fn(Event),
        tool: &str,
        description: &str,
        preview: Option<String>,
        timeout: Duration,
    ) -> ConfirmationOutcome {
        let id = nanoid::nanoid!(12);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);

        publish(Event::ConfirmationRequest {
            id: id.clone(),
            tool: tool.to_string(),
            description: description.to_string(),
            preview,
        });

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => ConfirmationOutcome::Rejected,
            Err(_) => {
                self.pending.lock().remove(&id);
                warn!(request_id = %id, tool, "confirmation request timed out");
                ConfirmationOutcome::TimedOut
            }
        }
    }

    /// Resolve a pending request, e.g. from an incoming WebSocket
    /// `feedback_ack` message. Returns `true` if a matching request was
    /// found and resolved.
    pub fn resolve(&self, id: &str, outcome: ConfirmationOutcome) -> bool {
        if let Some(tx) = self.pending.lock().remove(id) {
            let _ = tx.send(outcome);
            true
        } else {
            false
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(query: &str) -> HashMap<String, Value> {
        let mut m = HashMap::new();
        m.insert("query".to_string(), Value::String(query.to_string()));
        m
    }

    #[test]
    fn safe_mode_gates_mutating_statements_through_the_sql_tool() {
        let gate = PrivilegeGate::new();
        assert!(gate.requires_confirmation(true, SQL_EXECUTION_TOOL, &args("DELETE FROM orders")));
        assert!(gate.requires_confirmation(true, SQL_EXECUTION_TOOL, &args("  update orders set x=1")));
        assert!(!gate.requires_confirmation(true, SQL_EXECUTION_TOOL, &args("SELECT * FROM orders")));
        assert!(!gate.requires_confirmation(false, SQL_EXECUTION_TOOL, &args("DELETE FROM orders")));
    }

    #[test]
    fn non_sql_tools_and_missing_query_args_are_never_gated() {
        let gate = PrivilegeGate::new();
        assert!(!gate.requires_confirmation(true, "query_database", &args("DELETE FROM orders")));
        assert!(!gate.requires_confirmation(true, SQL_EXECUTION_TOOL, &HashMap::new()));
    }

    #[tokio::test]
    async fn resolved_request_returns_the_given_outcome() {
        let gate = std::sync::Arc::new(PrivilegeGate::new());
        let gate2 = gate.clone();

        let published = std::sync::Arc::new(Mutex::new(None));
        let published2 = published.clone();

        let handle = tokio::spawn(async move {
            gate2
                .request(move |e| *published2.lock() = Some(e), "execute_sql", "DELETE FROM orders", None, Duration::from_secs(5))
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        let id = match published.lock().as_ref().unwrap() {
            Event::ConfirmationRequest { id, .. } => id.clone(),
            _ => unreachable!(),
        };

        assert!(gate.resolve(&id, ConfirmationOutcome::Approved));
        assert_eq!(handle.await.unwrap(), ConfirmationOutcome::Approved);
    }

    #[tokio::test]
    async fn unresolved_request_times_out() {
        let gate = PrivilegeGate::new();
        let outcome = gate.request(|_| {}, "execute_sql", "DELETE FROM orders", None, Duration::from_millis(10)).await;
        assert_eq!(outcome, ConfirmationOutcome::TimedOut);
        assert_eq!(gate.pending_count(), 0);
    }
}
