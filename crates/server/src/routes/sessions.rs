//! `/api/sessions` (spec §6): session lifecycle and export directory
//! listing/preview/download. Grounded on
//! `original_source/api/routes/sessions.py`'s `get_exports`/`preview_export`/
//! `download_export`.

use crate::error::ApiError;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dagctl_core::OrchestratorError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct CreateSessionBody {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Serialize)]
pub struct SessionView {
    pub id: String,
    pub sandbox_name: String,
    pub sandbox_available: bool,
}

pub async fn create_session(State(state): State<Arc<AppState>>, Json(body): Json<CreateSessionBody>) -> Result<Json<SessionView>, ApiError> {
    let session = state.sessions.create(body.id)?;
    Ok(Json(SessionView {
        id: session.id.as_str().to_string(),
        sandbox_name: session.sandbox_name(),
        sandbox_available: session.is_sandbox_available(),
    }))
}

pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.sessions.ids())
}

pub async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Json<bool> {
    match state.sessions.get(&id) {
        Some(session) => {
            state.sessions.cleanup(&session);
            Json(true)
        }
        None => Json(false),
    }
}

#[derive(Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}

fn find_session(state: &AppState, session_id: &str) -> Result<Arc<dagctl_core::Session>, ApiError> {
    state
        .sessions
        .get(session_id)
        .ok_or_else(|| ApiError(OrchestratorError::SessionInitFailed(format!("unknown session {session_id}"))))
}

fn sanitize_filename(name: &str) -> Option<String> {
    let base = std::path::Path::new(name).file_name()?.to_str()?.to_string();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base)
}

pub async fn list_exports(State(state): State<Arc<AppState>>, Query(q): Query<SessionQuery>) -> Result<Json<Vec<String>>, ApiError> {
    let session = find_session(&state, &q.session_id)?;
    let entries = session.list_exports().map_err(|e| ApiError(OrchestratorError::ConfigError(e.to_string())))?;
    Ok(Json(entries.into_iter().map(|p| p.display().to_string()).collect()))
}

#[derive(Deserialize)]
pub struct PreviewQuery {
    pub session_id: String,
    #[serde(default)]
    pub max_rows: Option<usize>,
}

#[derive(Serialize)]
pub struct ExportPreview {
    pub filename: String,
    pub total_lines: usize,
    pub preview_lines: Vec<String>,
    pub truncated: bool,
}

pub async fn preview_export(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    Query(q): Query<PreviewQuery>,
) -> Result<Json<ExportPreview>, ApiError> {
    let session = find_session(&state, &q.session_id)?;
    let Some(filename) = sanitize_filename(&filename) else {
        return Err(ApiError(OrchestratorError::ConfigError("unsafe filename".into())));
    };
    let path = session.export_dir.join(&filename);
    let content = std::fs::read_to_string(&path).map_err(|e| ApiError(OrchestratorError::ConfigError(format!("cannot read {filename}: {e}"))))?;

    let max_rows = q.max_rows.unwrap_or(10).max(1);
    let all_lines: Vec<&str> = content.lines().collect();
    let total_lines = all_lines.len();
    let preview_lines = all_lines.iter().take(max_rows).map(|s| s.to_string()).collect();

    Ok(Json(ExportPreview { filename, total_lines, preview_lines, truncated: total_lines > max_rows }))
}

pub async fn download_export(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    Query(q): Query<SessionQuery>,
) -> Result<Response, ApiError> {
    let session = find_session(&state, &q.session_id)?;
    let Some(filename) = sanitize_filename(&filename) else {
        return Err(ApiError(OrchestratorError::ConfigError("unsafe filename".into())));
    };
    let path = session.export_dir.join(&filename);
    let bytes = std::fs::read(&path).map_err(|e| ApiError(OrchestratorError::ConfigError(format!("cannot read {filename}: {e}"))))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        Body::from(bytes),
    )
        .into_response())
}
