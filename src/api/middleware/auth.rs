use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use crate::{
    api::state::AppState,
    auth::{
        guard::{decide, resolve_session, GateDecision},
        Session, SESSION_COOKIE,
    },
    client::SessionToken,
    domain::Role,
    error::AppError,
};

/// Header checked before the query string and form body.
pub const CSRF_HEADER: &str = "x-csrf-token";
const CSRF_FIELD: &str = "csrf_token";
const MAX_FORM_BYTES: usize = 1024 * 1024;

pub async fn require_resident(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    gate(Role::Resident, &state, &jar, request, next).await
}

pub async fn require_staff(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    gate(Role::Staff, &state, &jar, request, next).await
}

async fn gate(required: Role, state: &AppState, jar: &CookieJar, mut request: Request, next: Next) -> Response {
    let session = match jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        Some(token) if !token.is_empty() => {
            resolve_session(state.service_context.api.as_ref(), SessionToken::new(token)).await
        }
        _ => None,
    };

    match (decide(required, session.as_ref().map(|s| &s.identity)), session) {
        (GateDecision::Allow, Some(session)) => {
            // Insert session into request extensions
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        (GateDecision::Redirect(path), _) => {
            tracing::debug!("Gate for {:?} redirecting {} to {}", required, request.uri().path(), path);
            Redirect::to(path).into_response()
        }
        (GateDecision::Allow, None) => Redirect::to("/").into_response(),
    }
}

/// CSRF check for state-changing requests. The token is read from the
/// `X-CSRF-Token` header, then the query string, then a urlencoded form
/// body. Runs after the gate so the session is already known.
pub async fn require_csrf(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return Ok(next.run(request).await);
    }

    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .ok_or(AppError::Unauthorized)?;
    let csrf = &state.service_context.csrf_service;

    let direct = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().query().and_then(|q| field_from_urlencoded(q.as_bytes())));

    if let Some(token) = direct {
        return if csrf.validate_token(&session.token, &token)? {
            Ok(next.run(request).await)
        } else {
            tracing::warn!("Invalid CSRF token on {}", request.uri().path());
            Err(AppError::Forbidden)
        };
    }

    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);

    if !is_form {
        tracing::warn!("Missing CSRF token on {}", request.uri().path());
        return Err(AppError::Forbidden);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read form: {}", e)))?;

    let valid = match field_from_urlencoded(&bytes) {
        Some(token) => csrf.validate_token(&session.token, &token)?,
        None => false,
    };
    if !valid {
        tracing::warn!("Invalid or missing CSRF token on {}", parts.uri.path());
        return Err(AppError::Forbidden);
    }

    // Hand the buffered body on to the handler
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

fn field_from_urlencoded(raw: &[u8]) -> Option<String> {
    serde_urlencoded::from_bytes::<Vec<(String, String)>>(raw)
        .ok()?
        .into_iter()
        .find(|(name, _)| name == CSRF_FIELD)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_from_urlencoded() {
        assert_eq!(
            field_from_urlencoded(b"title=Hi&csrf_token=abc%20d").as_deref(),
            Some("abc d")
        );
        assert_eq!(field_from_urlencoded(b"title=Hi"), None);
    }
}
