use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    /// The backend answered with a non-2xx status or an `ok: false` envelope.
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// The backend could not be reached or its body could not be read.
    #[error("Network error: {0}")]
    Network(String),

    #[error("QR error: {0}")]
    Qr(String),

    #[error("Camera is already in use by another scan")]
    CameraBusy,

    #[error("Request was cancelled")]
    Cancelled,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Message safe to show in a toast or inline alert.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(_) => "Could not reach the barangay server. Please try again.".to_string(),
            AppError::Internal(_) => "Something went wrong. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Validation(ref msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Backend { status, ref message } => {
                tracing::warn!("Backend error {}: {}", status, message);
                (StatusCode::BAD_GATEWAY, message.clone())
            }
            AppError::Network(ref msg) => {
                tracing::error!("Backend unreachable: {}", msg);
                (StatusCode::BAD_GATEWAY, "Backend unreachable".to_string())
            }
            AppError::Qr(ref msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::CameraBusy => (StatusCode::CONFLICT, self.to_string()),
            AppError::Cancelled => (StatusCode::REQUEST_TIMEOUT, self.to_string()),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Backend {
            status: 502,
            message: format!("Unexpected response from server: {}", err),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field))
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join("; "))
    }
}
