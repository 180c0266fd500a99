use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::models::trip::{RidePhase, TripAction};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("location permission denied: {0}")]
    PermissionDenied(String),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("rejected by backend: {0}")]
    Rejected(String),

    #[error("cannot {action} while {from}")]
    InvalidTransition { from: RidePhase, action: TripAction },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::PermissionDenied(_) => "permission",
            AppError::MissingCredential(_) => "credential",
            AppError::Transport(_) => "transport",
            AppError::MalformedResponse(_) => "malformed",
            AppError::Rejected(_) => "rejected",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Conflict(_) => "conflict",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::MissingCredential(_) => StatusCode::UNAUTHORIZED,
            AppError::Transport(_) | AppError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            AppError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidTransition { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::Rejected(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
