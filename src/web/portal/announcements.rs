use askama::Template;
use axum::{
    extract::State,
    response::IntoResponse,
    Extension,
};

use crate::{
    api::state::AppState,
    auth::Session,
    service::scope::PageScope,
    web::templates::{HtmlTemplate, NavContext, Notice},
};
use super::{settle, AnnouncementCard};

#[derive(Template)]
#[template(path = "resident/announcements.html")]
pub struct AnnouncementsTemplate {
    pub nav: NavContext,
    pub notices: Vec<Notice>,
    pub announcements: Vec<AnnouncementCard>,
}

pub async fn announcements_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> impl IntoResponse {
    let scope = PageScope::new();
    let mut notices = Vec::new();
    let published = settle(
        scope.run(state.service_context.api.list_published(Some(&session.token))).await,
        &mut notices,
    );

    let now = chrono::Utc::now();
    let offset = state.settings.portal.utc_offset();

    HtmlTemplate(AnnouncementsTemplate {
        nav: NavContext::new(&state, &session, "announcements"),
        notices,
        announcements: published
            .iter()
            .map(|a| AnnouncementCard::new(a, now, offset))
            .collect(),
    })
}
