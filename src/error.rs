use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

/// Failures surfaced by the alert queries. Display strings are the exact
/// `detail` messages sent to clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("manager_id is required")]
    MissingManagerId,

    #[error("invalid scope")]
    InvalidScope,

    #[error("invalid severity")]
    InvalidSeverity,

    #[error("invalid status")]
    InvalidStatus,

    #[error("manager not found")]
    ManagerNotFound,

    #[error("alert not found")]
    AlertNotFound,

    // Keep store details out of the Display message.
    #[error("internal server error")]
    Store(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingManagerId
            | ApiError::InvalidScope
            | ApiError::InvalidSeverity
            | ApiError::InvalidStatus => StatusCode::BAD_REQUEST,
            ApiError::ManagerNotFound | ApiError::AlertNotFound => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Store(err) = &self {
            error!(error = ?err, "store failure");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
