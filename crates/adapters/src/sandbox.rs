//! Sandbox execution boundary: a session-scoped code execution handle
//! (the "fallback interpreter" or external sandbox service, spec §3,
//! §5). Grounded on `original_source/session/manager.py`'s
//! `get_sandbox_name`/`mark_sandbox_unavailable` one-way flag.

use async_trait::async_trait;
use dagctl_core::{OrchestratorError, Session};
use std::sync::Arc;

/// The result of running code in a sandbox: captured stdout and an
/// optional structured value the tool can hand back to the DAG node.
#[derive(Debug, Clone, Default)]
pub struct SandboxOutput {
    pub stdout: String,
    pub value: Option<serde_json::Value>,
}

#[async_trait]
pub trait SandboxClient: Send + Sync {
    async fn run(&self, sandbox_name: &str, code: &str) -> Result<SandboxOutput, OrchestratorError>;
}

/// Acquires a session's sandbox for the scope of one call, marking it
/// unavailable on failure so subsequent calls in the same session fail
/// fast instead of retrying a dead sandbox.
pub struct SandboxHandle {
    session: Arc<Session>,
    client: Arc<dyn SandboxClient>,
}

impl SandboxHandle {
    pub fn new(session: Arc<Session>, client: Arc<dyn SandboxClient>) -> Self {
        Self { session, client }
    }

    pub async fn run(&self, code: &str) -> Result<SandboxOutput, OrchestratorError> {
        if !self.session.is_sandbox_available() {
            return Err(OrchestratorError::SandboxUnavailable {
                session_id: self.session.id.as_str().to_string(),
                reason: self.session.sandbox_error().unwrap_or_else(|| "unknown".to_string()),
            });
        }

        match self.client.run(&self.session.sandbox_name(), code).await {
            Ok(out) => Ok(out),
            Err(e) => {
                self.session.mark_sandbox_unavailable(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;

    pub struct FakeSandboxClient {
        pub fail: bool,
    }

    #[async_trait]
    impl SandboxClient for FakeSandboxClient {
        async fn run(&self, _sandbox_name: &str, code: &str) -> Result<SandboxOutput, OrchestratorError> {
            if self.fail {
                return Err(OrchestratorError::ToolFailure { tool: "sandbox".into(), message: "simulated failure".into() });
            }
            Ok(SandboxOutput { stdout: format!("ran: {code}"), value: None })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeSandboxClient;
    use super::*;
    use dagctl_core::SessionRegistry;

    #[tokio::test]
    async fn successful_run_leaves_sandbox_available() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(tmp.path());
        let session = registry.create(None).unwrap();
        let handle = SandboxHandle::new(session.clone(), Arc::new(FakeSandboxClient { fail: false }));

        let out = handle.run("print(1)").await.unwrap();
        assert_eq!(out.stdout, "ran: print(1)");
        assert!(session.is_sandbox_available());
    }

    #[tokio::test]
    async fn failed_run_marks_sandbox_unavailable_and_fails_fast_next_time() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(tmp.path());
        let session = registry.create(None).unwrap();
        let handle = SandboxHandle::new(session.clone(), Arc::new(FakeSandboxClient { fail: true }));

        assert!(handle.run("boom").await.is_err());
        assert!(!session.is_sandbox_available());

        let err = handle.run("print(1)").await.unwrap_err();
        assert_eq!(err.kind(), "sandbox_unavailable");
    }
}
