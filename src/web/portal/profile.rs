use askama::Template;
use axum::{
    extract::State,
    response::IntoResponse,
    Extension, Form,
};
use validator::Validate;

use crate::{
    api::state::AppState,
    auth::Session,
    domain::{Profile, ProfileUpdate},
    error::Result,
    service::submission_service::{identity_qr, QrView},
    web::templates::{HtmlTemplate, NavContext, Notice},
};

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub nav: NavContext,
    pub notices: Vec<Notice>,
    pub profile: Profile,
    pub lookup_label: String,
    pub qr_svg: Option<String>,
    pub form_action: String,
}

async fn render(state: &AppState, session: &Session, mut notices: Vec<Notice>) -> HtmlTemplate<ProfileTemplate> {
    let profile = match state.service_context.api.my_profile(&session.token).await {
        Ok(profile) => profile,
        Err(e) => {
            notices.push(Notice::from(&e));
            Profile::default()
        }
    };

    // The backend profile may carry an id the session identity lacks
    let mut identity = session.identity.clone();
    if identity.lookup_id.is_none() {
        identity.lookup_id = profile.lookup_id.clone();
    }
    let qr_svg = match identity_qr(&identity) {
        Some(Ok(QrView::Svg(svg))) => Some(svg),
        Some(Ok(QrView::Image(_))) | None => None,
        Some(Err(e)) => {
            tracing::warn!("Profile QR failed: {}", e);
            None
        }
    };

    let (lookup_label, form_action) = if session.is_staff() {
        ("Employee ID", "/portal/staff/profile")
    } else {
        ("Resident ID", "/portal/profile")
    };

    HtmlTemplate(ProfileTemplate {
        nav: NavContext::new(state, session, "profile"),
        notices,
        profile,
        lookup_label: lookup_label.to_string(),
        qr_svg,
        form_action: form_action.to_string(),
    })
}

pub async fn profile_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> impl IntoResponse {
    render(&state, &session, Vec::new()).await
}

async fn save(state: &AppState, session: &Session, update: &ProfileUpdate) -> Result<()> {
    update.validate()?;
    state.service_context.api.update_profile(&session.token, update).await?;
    tracing::info!("Profile updated for {}", session.identity.id);
    Ok(())
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(update): Form<ProfileUpdate>,
) -> impl IntoResponse {
    let notice = match save(&state, &session, &update).await {
        Ok(()) => Notice::success("Profile updated"),
        Err(e) => Notice::from(&e),
    };
    render(&state, &session, vec![notice]).await
}
