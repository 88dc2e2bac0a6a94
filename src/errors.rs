use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::SlotName;

/// Errors raised by the dialog core itself.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An upstream-resolved slot had no valid interpretation. Scoped to one
    /// field; the message goes to the user verbatim.
    #[error("{message}")]
    FieldResolution { slot: SlotName, message: String },

    /// A caller invariant was broken (unsupported duration, booking a window
    /// that is not available). Never shown to the user.
    #[error("contract violation: {0}")]
    Contract(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("session store error: {0}")]
    Store(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid webhook signature")]
    Forbidden,
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Store(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
