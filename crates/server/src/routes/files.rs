//! `/api/files` (spec §6): import file upload, listing, preview, and
//! download. Grounded on `original_source/api/routes/files.py`'s
//! `upload_file`/`preview_import`/`download_import`, scaled down to a
//! raw line preview since no tabular (Excel/CSV) parsing crate is part
//! of this stack — the actual data-frame analysis tool is out of scope
//! (spec §1).

use crate::error::ApiError;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dagctl_core::OrchestratorError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const ALLOWED_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];
const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;
const DEFAULT_MAX_ROWS: usize = 10;

#[derive(Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}

#[derive(Deserialize)]
pub struct PreviewQuery {
    pub session_id: String,
    #[serde(default)]
    pub max_rows: Option<usize>,
}

fn find_session(state: &AppState, session_id: &str) -> Result<Arc<dagctl_core::Session>, ApiError> {
    state
        .sessions
        .get(session_id)
        .ok_or_else(|| ApiError(OrchestratorError::SessionInitFailed(format!("unknown session {session_id}"))))
}

/// Strip any directory components so an uploaded or requested filename
/// can never escape the session's import directory.
fn sanitize_filename(name: &str) -> Option<String> {
    let base = std::path::Path::new(name).file_name()?.to_str()?.to_string();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base)
}

fn is_allowed(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[derive(Serialize)]
pub struct UploadResult {
    pub filename: String,
    pub size: usize,
}

pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SessionQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadResult>, ApiError> {
    let session = find_session(&state, &q.session_id)?;

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError(OrchestratorError::ConfigError(e.to_string())))? {
        let Some(original_name) = field.file_name().map(|s| s.to_string()) else { continue };
        let Some(filename) = sanitize_filename(&original_name) else {
            return Err(ApiError(OrchestratorError::ConfigError(format!("unsafe filename: {original_name}"))));
        };
        if !is_allowed(&filename) {
            return Err(ApiError(OrchestratorError::ConfigError(format!(
                "unsupported file type, allowed: {}",
                ALLOWED_EXTENSIONS.join(",")
            ))));
        }

        let bytes = field.bytes().await.map_err(|e| ApiError(OrchestratorError::ConfigError(e.to_string())))?;
        if bytes.len() > MAX_FILE_SIZE {
            return Err(ApiError(OrchestratorError::ConfigError(format!("file too large, max {MAX_FILE_SIZE} bytes"))));
        }

        let path = session.import_dir.join(&filename);
        std::fs::write(&path, &bytes).map_err(|e| ApiError(OrchestratorError::ConfigError(format!("failed to save {filename}: {e}"))))?;

        return Ok(Json(UploadResult { filename, size: bytes.len() }));
    }

    Err(ApiError(OrchestratorError::ConfigError("multipart body carried no file field".into())))
}

pub async fn list_imports(State(state): State<Arc<AppState>>, Query(q): Query<SessionQuery>) -> Result<Json<Vec<String>>, ApiError> {
    let session = find_session(&state, &q.session_id)?;
    let entries = session.list_imports().map_err(|e| ApiError(OrchestratorError::ConfigError(e.to_string())))?;
    Ok(Json(entries.into_iter().map(|p| p.display().to_string()).collect()))
}

#[derive(Serialize)]
pub struct FilePreview {
    pub filename: String,
    pub total_lines: usize,
    pub preview_lines: Vec<String>,
    pub truncated: bool,
}

pub async fn preview_import(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    Query(q): Query<PreviewQuery>,
) -> Result<Json<FilePreview>, ApiError> {
    let session = find_session(&state, &q.session_id)?;
    let Some(filename) = sanitize_filename(&filename) else {
        return Err(ApiError(OrchestratorError::ConfigError("unsafe filename".into())));
    };
    let path = session.import_dir.join(&filename);
    let content = std::fs::read_to_string(&path).map_err(|e| ApiError(OrchestratorError::ConfigError(format!("cannot read {filename}: {e}"))))?;

    let max_rows = q.max_rows.unwrap_or(DEFAULT_MAX_ROWS).max(1);
    let all_lines: Vec<&str> = content.lines().collect();
    let total_lines = all_lines.len();
    let preview_lines = all_lines.iter().take(max_rows).map(|s| s.to_string()).collect();

    Ok(Json(FilePreview { filename, total_lines, preview_lines, truncated: total_lines > max_rows }))
}

pub async fn delete_import(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    Query(q): Query<SessionQuery>,
) -> Result<Json<bool>, ApiError> {
    let session = find_session(&state, &q.session_id)?;
    let Some(filename) = sanitize_filename(&filename) else {
        return Err(ApiError(OrchestratorError::ConfigError("unsafe filename".into())));
    };
    let path = session.import_dir.join(&filename);
    std::fs::remove_file(&path).map_err(|e| ApiError(OrchestratorError::ConfigError(format!("cannot delete {filename}: {e}"))))?;
    Ok(Json(true))
}

pub async fn download_import(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    Query(q): Query<SessionQuery>,
) -> Result<Response, ApiError> {
    let session = find_session(&state, &q.session_id)?;
    let Some(filename) = sanitize_filename(&filename) else {
        return Err(ApiError(OrchestratorError::ConfigError("unsafe filename".into())));
    };
    let path = session.import_dir.join(&filename);
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
