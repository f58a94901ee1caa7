//! `/api/database` (spec §6): per-session database connection config.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use dagctl_core::{DbConfig, OrchestratorError};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}

fn find_session(state: &AppState, session_id: &str) -> Result<std::sync::Arc<dagctl_core::Session>, ApiError> {
    state
        .sessions
        .get(session_id)
        .ok_or_else(|| ApiError(OrchestratorError::SessionInitFailed(format!("unknown session {session_id}"))))
}

pub async fn get_database_config(State(state): State<Arc<AppState>>, Query(q): Query<SessionQuery>) -> Result<Json<Option<DbConfig>>, ApiError> {
    let session = find_session(&state, &q.session_id)?;
    Ok(Json(session.db_config()))
}

#[derive(Deserialize)]
pub struct SetDatabaseConfigBody {
    pub session_id: String,
    #[serde(flatten)]
    pub config: DbConfig,
}

pub async fn set_database_config(State(state): State<Arc<AppState>>, Json(body): Json<SetDatabaseConfigBody>) -> Result<Json<bool>, ApiError> {
    let session = find_session(&state, &body.session_id)?;
    session.set_db_config(body.config);
    Ok(Json(true))
}

pub async fn clear_database_config(State(state): State<Arc<AppState>>, Query(q): Query<SessionQuery>) -> Result<Json<bool>, ApiError> {
    let session = find_session(&state, &q.session_id)?;
    session.clear_db_config();
    Ok(Json(true))
}

#[derive(serde::Serialize)]
pub struct ConnectionTestResult {
    pub reachable: bool,
    pub detail: String,
}

/// Check that `host:port` from the session's stored descriptor accepts a
/// TCP connection. Actual SQL execution against the database is out of
/// scope (spec §1); this only confirms the descriptor points somewhere
/// live, the way a client would sanity-check before wiring up a tool.
pub async fn test_database_config(State(state): State<Arc<AppState>>, Query(q): Query<SessionQuery>) -> Result<Json<ConnectionTestResult>, ApiError> {
    let session = find_session(&state, &q.session_id)?;
    let config = session
        .db_config()
        .ok_or_else(|| ApiError(OrchestratorError::ConfigError("no database config set for session".into())))?;

    let addr = format!("{}:{}", config.host, config.port);
    let result = tokio::time::timeout(std::time::Duration::from_secs(5), tokio::net::TcpStream::connect(&addr)).await;

    let (reachable, detail) = match result {
        Ok(Ok(_)) => (true, format!("connected to {addr}")),
        Ok(Err(e)) => (false, format!("could not connect to {addr}: {e}")),
        Err(_) => (false, format!("timed out connecting to {addr}")),
    };

    Ok(Json(ConnectionTestResult { reachable, detail }))
}
