use askama::Template;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::{
    api::state::AppState,
    auth::{create_logout_cookie, create_session_cookie, guard::resolve_session, SESSION_COOKIE},
    client::{Audience, Credentials, ResetStep, SessionToken},
    error::AppError,
    web::portal::AnnouncementCard,
    web::templates::{HtmlTemplate, Notice},
};

#[derive(Template)]
#[template(path = "landing.html")]
pub struct LandingTemplate {
    pub announcements: Vec<AnnouncementCard>,
    pub notice: Option<Notice>,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub audience: String,
    pub email: String,
    pub notice: Option<Notice>,
}

#[derive(Template)]
#[template(path = "auth/reset.html")]
pub struct ResetTemplate {
    pub audience: String,
    pub step: String,
    pub email: String,
    pub code: String,
    pub notice: Option<Notice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AudienceQuery {
    #[serde(default)]
    pub audience: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub audience: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetForm {
    #[serde(default)]
    pub audience: String,
    #[serde(default)]
    pub step: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutForm {
    #[serde(default)]
    pub csrf_token: String,
}

fn audience_of(raw: &str) -> Audience {
    if raw.eq_ignore_ascii_case("staff") {
        Audience::Staff
    } else {
        Audience::Resident
    }
}

fn audience_name(audience: Audience) -> String {
    match audience {
        Audience::Staff => "staff".to_string(),
        Audience::Resident => "resident".to_string(),
    }
}

pub fn valid_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

pub fn valid_code(code: &str) -> bool {
    let code = code.trim();
    code.len() == 6 && code.chars().all(|c| c.is_ascii_digit())
}

pub fn check_new_password(password: &str, confirm: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    if password != confirm {
        return Err("Passwords do not match".to_string());
    }
    Ok(())
}

// GET /
pub async fn landing_page(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let offset = state.settings.portal.utc_offset();

    let (announcements, notice) = match state.service_context.api.list_published(None).await {
        Ok(list) => (
            list.iter().take(6).map(|a| AnnouncementCard::new(a, now, offset)).collect(),
            None,
        ),
        Err(e) => {
            tracing::warn!("Failed to load public announcements: {}", e);
            (Vec::new(), Some(Notice::from(&e)))
        }
    };

    HtmlTemplate(LandingTemplate { announcements, notice })
}

// GET /login
pub async fn login_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<AudienceQuery>,
) -> Response {
    // Already signed in: skip straight to the right dashboard
    if let Some(cookie) = jar.get(SESSION_COOKIE).filter(|c| !c.value().is_empty()) {
        let token = SessionToken::new(cookie.value());
        if let Some(session) = resolve_session(state.service_context.api.as_ref(), token).await {
            return Redirect::to(session.role().dashboard_path()).into_response();
        }
    }

    HtmlTemplate(LoginTemplate {
        audience: audience_name(audience_of(&query.audience)),
        email: String::new(),
        notice: None,
    })
    .into_response()
}

// POST /login
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let audience = audience_name(audience_of(&form.audience));
    let failed = |message: String| {
        HtmlTemplate(LoginTemplate {
            audience: audience.clone(),
            email: form.email.clone(),
            notice: Some(Notice::error(message)),
        })
        .into_response()
    };

    if !valid_email(&form.email) || form.password.is_empty() {
        return failed("Enter your email address and password".to_string());
    }

    let api = state.service_context.api.as_ref();
    let credentials = Credentials {
        email: form.email.trim().to_string(),
        password: form.password.clone(),
    };

    let token = match api.login(&credentials).await {
        Ok(token) => token,
        Err(AppError::Backend { status: 400 | 401 | 403, .. }) => {
            tracing::info!("Failed login for {}", credentials.email);
            return failed("Invalid email or password".to_string());
        }
        Err(e) => return failed(e.user_message()),
    };

    match api.current_identity(&token).await {
        Ok(Some(identity)) => {
            tracing::info!("{} signed in as {}", identity.display_name, identity.role.label());
            let cookie = create_session_cookie(
                token.as_str(),
                state.settings.server.secure_cookies,
                state.settings.auth.session_duration_hours,
            );
            (jar.add(cookie), Redirect::to(identity.role.dashboard_path())).into_response()
        }
        Ok(None) => failed("Your account could not be loaded. Please try again.".to_string()),
        Err(e) => failed(e.user_message()),
    }
}

// POST /logout
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LogoutForm>,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE).filter(|c| !c.value().is_empty()) {
        let token = SessionToken::new(cookie.value());
        let csrf_ok = state
            .service_context
            .csrf_service
            .validate_token(&token, &form.csrf_token)
            .unwrap_or(false);
        if !csrf_ok {
            return AppError::Forbidden.into_response();
        }
        if let Err(e) = state.service_context.api.logout(&token).await {
            tracing::warn!("Backend logout failed: {}", e);
        }
    }

    (jar.add(create_logout_cookie()), Redirect::to("/")).into_response()
}

// GET /password-reset
pub async fn reset_page(Query(query): Query<AudienceQuery>) -> impl IntoResponse {
    HtmlTemplate(ResetTemplate {
        audience: audience_name(audience_of(&query.audience)),
        step: "email".to_string(),
        email: String::new(),
        code: String::new(),
        notice: None,
    })
}

// POST /password-reset
pub async fn reset_handler(State(state): State<AppState>, Form(form): Form<ResetForm>) -> impl IntoResponse {
    let audience = audience_of(&form.audience);
    let email = form.email.trim().to_string();
    let code = form.code.trim().to_string();
    let api = state.service_context.api.as_ref();

    let (step, notice) = match form.step.as_str() {
        "code" if form.action == "resend" => {
            match api.password_reset(audience, &ResetStep::ResendCode { email: email.clone() }).await {
                Ok(()) => ("code", Notice::info(format!("A new code was sent to {}", email))),
                Err(e) => ("code", Notice::from(&e)),
            }
        }
        "code" => {
            if !valid_code(&code) {
                ("code", Notice::error("Enter the 6-digit code from your email"))
            } else {
                let step = ResetStep::VerifyCode { email: email.clone(), code: code.clone() };
                match api.password_reset(audience, &step).await {
                    Ok(()) => ("password", Notice::info("Code verified. Choose a new password.")),
                    Err(e) => ("code", Notice::from(&e)),
                }
            }
        }
        "password" => match check_new_password(&form.new_password, &form.confirm_password) {
            Err(message) => ("password", Notice::error(message)),
            Ok(()) => {
                let step = ResetStep::ResetPassword {
                    email: email.clone(),
                    code: code.clone(),
                    new_password: form.new_password.clone(),
                };
                match api.password_reset(audience, &step).await {
                    Ok(()) => {
                        tracing::info!("Password reset completed for {}", email);
                        ("done", Notice::success("Your password was changed. You can now sign in."))
                    }
                    Err(e) => ("password", Notice::from(&e)),
                }
            }
        },
        _ => {
            if !valid_email(&email) {
                ("email", Notice::error("Enter a valid email address"))
            } else {
                match api.password_reset(audience, &ResetStep::Forgot { email: email.clone() }).await {
                    Ok(()) => ("code", Notice::info(format!("We sent a 6-digit code to {}", email))),
                    Err(e) => ("email", Notice::from(&e)),
                }
            }
        }
    };

    HtmlTemplate(ResetTemplate {
        audience: audience_name(audience),
        step: step.to_string(),
        email,
        code,
        notice: Some(notice),
    })
}
