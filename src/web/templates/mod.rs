pub mod auth;

use askama::Template;
use axum::{
    response::{Html, IntoResponse, Response},
    http::StatusCode,
};
use chrono::{DateTime, FixedOffset, Utc};

use crate::{
    api::state::AppState,
    auth::Session,
    error::AppError,
};

// Navigation data every portal page renders
#[derive(Debug, Clone)]
pub struct NavContext {
    pub user_name: String,
    pub role_label: String,
    pub is_staff: bool,
    pub csrf_token: String,
    pub active: String,
}

impl NavContext {
    pub fn new(state: &AppState, session: &Session, active: &str) -> Self {
        let csrf_token = state
            .service_context
            .csrf_service
            .generate_token(&session.token)
            .unwrap_or_else(|e| {
                tracing::error!("Failed to generate CSRF token: {}", e);
                String::new()
            });

        Self {
            user_name: session.identity.display_name.clone(),
            role_label: session.identity.role.label().to_string(),
            is_staff: session.is_staff(),
            csrf_token,
            active: active.to_string(),
        }
    }
}

/// Inline alert shown above a page's content.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: String,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: "success".to_string(), message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: "error".to_string(), message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { kind: "info".to_string(), message: message.into() }
    }
}

impl From<&AppError> for Notice {
    fn from(err: &AppError) -> Self {
        Notice::error(err.user_message())
    }
}

/// `12 Jun 2024, 6:30 PM` in the portal's offset.
pub fn local_time(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%-d %b %Y, %-I:%M %p").to_string()
}

// Make askama templates work with axum
pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            ).into_response(),
        }
    }
}
