#[cfg(test)]
mod tests {
    use crate::router;
    use crate::state::AppState;
    use dagctl_adapters::fake::FakeLlmClient;
    use dagctl_core::{ModeManager, SessionRegistry};
    use dagctl_runtime::{AgentRuntime, AgentRuntimeConfig};
    use dagctl_scheduler::{Scheduler, SchedulerConfig};
    use dagctl_storage::ConfigLoader;
    use dagctl_tools::ToolRegistry;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
        let tmp = tempfile::tempdir().unwrap();
        let sessions = Arc::new(SessionRegistry::new(tmp.path()));
        let tools = Arc::new(ToolRegistry::new());
        let modes = Arc::new(ModeManager::new(dagctl_core::ModeConfig::default()));
        let scheduler = Arc::new(Scheduler::new(tools.clone(), SchedulerConfig::default()));
        let runtime = Arc::new(AgentRuntime::new(tools.clone(), scheduler, AgentRuntimeConfig::default()));
        let config = Arc::new(ConfigLoader::load(tmp.path().join("agents.yaml")).unwrap());
        let llm = Arc::new(FakeLlmClient::new("ok"));

        (tmp, Arc::new(AppState::new(sessions, tools, modes, runtime, config, llm)))
    }

    #[tokio::test]
    async fn chat_round_trip_returns_fake_reply() {
        let (_tmp, state) = test_state();
        let session = state.sessions.create(None).unwrap();

        let app = router(state.clone());
        let body = serde_json::json!({ "session_id": session.id.as_str(), "message": "hi" });

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/chat")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
