//! HTTP/SSE/WebSocket transport for the agent runtime (spec §6).
//! Grounded on `querymt-querymt/crates/service`'s axum + tower-http
//! layering, since the teacher itself exposes no HTTP surface.

pub mod error;
pub mod routes;
pub mod state;

#[cfg(test)]
mod router_test;

pub use state::AppState;

use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(routes::chat::post_chat))
        .route("/api/chat/stream", get(routes::chat::get_chat_stream))
        .route("/ws/chat", get(routes::ws::ws_chat))
        .route("/api/modes", get(routes::modes::get_modes))
        .route("/api/modes/toggle/:field", post(routes::modes::toggle_mode))
        .route("/api/modes/preview_limit", post(routes::modes::set_preview_limit))
        .route("/api/modes/reset", post(routes::modes::reset_modes))
        .route("/api/sessions", get(routes::sessions::list_sessions))
        .route("/api/sessions/new", post(routes::sessions::create_session))
        .route("/api/sessions/:id", delete(routes::sessions::delete_session))
        .route("/api/sessions/exports", get(routes::sessions::list_exports))
        .route("/api/sessions/exports/:filename/preview", get(routes::sessions::preview_export))
        .route("/api/sessions/exports/:filename/download", get(routes::sessions::download_export))
        .route("/api/files/upload", post(routes::files::upload_file))
        .route("/api/files/imports", get(routes::files::list_imports))
        .route("/api/files/imports/:filename/preview", get(routes::files::preview_import))
        .route("/api/files/imports/:filename", delete(routes::files::delete_import))
        .route("/api/files/imports/:filename/download", get(routes::files::download_import))
        .route("/api/database/config", get(routes::database::get_database_config).post(routes::database::set_database_config).delete(routes::database::clear_database_config))
        .route("/api/database/test", post(routes::database::test_database_config))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> std::io::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "dagctl-server listening");
    axum::serve(listener, router(state).into_make_service()).await
}
