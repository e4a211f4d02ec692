// =============================================================================
// API error type
// =============================================================================
//
// Handlers return `Result<_, ApiError>` so `?` works on any `anyhow`-compatible
// error.  Everything that reaches this boundary is an orchestration failure
// and maps to a generic 500 with a JSON payload.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: anyhow::Error,
}

impl ApiError {
    pub fn internal(error: impl Into<anyhow::Error>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(status = %self.status, error = %format!("{:#}", self.error), "request failed");

        let body = Json(json!({
            "error": self.error.to_string(),
            "status": self.status.as_u16(),
        }));

        (self.status, body).into_response()
    }
}
