//! Maps [`OrchestratorError`] onto HTTP status codes and a stable JSON
//! error body (spec §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dagctl_core::OrchestratorError;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

pub struct ApiError(pub OrchestratorError);

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            OrchestratorError::ConfigError(_) | OrchestratorError::SessionInitFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OrchestratorError::ToolNotFound(_) | OrchestratorError::DanglingReference { .. } | OrchestratorError::DuplicateNodeId(_) => {
                StatusCode::BAD_REQUEST
            }
            OrchestratorError::CyclicDependency(_) => StatusCode::BAD_REQUEST,
            OrchestratorError::UserRejected(_) => StatusCode::FORBIDDEN,
            OrchestratorError::Interrupted => StatusCode::REQUEST_TIMEOUT,
            OrchestratorError::SandboxUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            OrchestratorError::ExecutionTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            OrchestratorError::ToolFailure { .. } | OrchestratorError::CompactionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody { kind: self.0.kind(), message: self.0.to_string() };
        (status, Json(body)).into_response()
    }
}
