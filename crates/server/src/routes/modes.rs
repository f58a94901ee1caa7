//! `/api/modes` (spec §6).

use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use dagctl_core::{ModeConfig, PreviewLimit};
use std::sync::Arc;

pub async fn get_modes(State(state): State<Arc<AppState>>) -> Json<ModeConfig> {
    Json(state.modes.get_all())
}

pub async fn toggle_mode(State(state): State<Arc<AppState>>, Path(field): Path<String>) -> Json<ModeConfig> {
    match field.as_str() {
        "plan_mode" => state.modes.toggle_plan_mode(),
        "auto_execute" => state.modes.toggle_auto_execute(),
        "safe_mode" => state.modes.toggle_safe_mode(),
        "verbose" => state.modes.toggle_verbose(),
        "export_mode" => state.modes.toggle_export_mode(),
        _ => {}
    }
    Json(state.modes.get_all())
}

#[derive(serde::Deserialize)]
pub struct SetPreviewLimitBody {
    pub preview_limit: PreviewLimit,
}

pub async fn set_preview_limit(State(state): State<Arc<AppState>>, Json(body): Json<SetPreviewLimitBody>) -> Json<ModeConfig> {
    state.modes.set_preview_limit(body.preview_limit);
    Json(state.modes.get_all())
}

pub async fn reset_modes(State(state): State<Arc<AppState>>) -> Json<ModeConfig> {
    state.modes.reset_to_defaults();
    Json(state.modes.get_all())
}
