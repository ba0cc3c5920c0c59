use askama::Template;
use axum::{
    extract::State,
    response::IntoResponse,
    Extension,
};

use crate::{
    api::state::AppState,
    auth::Session,
    client::StatsScope,
    domain::DashboardStats,
    service::scope::PageScope,
    web::templates::{HtmlTemplate, NavContext, Notice},
};
use super::{settle, AnnouncementCard};

#[derive(Template)]
#[template(path = "resident/dashboard.html")]
pub struct ResidentDashboardTemplate {
    pub nav: NavContext,
    pub notices: Vec<Notice>,
    pub stats: DashboardStats,
    pub announcements: Vec<AnnouncementCard>,
}

pub async fn resident_dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> impl IntoResponse {
    let api = state.service_context.api.as_ref();
    let scope = PageScope::new();
    let mut notices = Vec::new();

    let (stats, published) = tokio::join!(
        scope.run(api.dashboard_stats(&session.token, StatsScope::Resident)),
        scope.run(api.list_published(Some(&session.token))),
    );
    let stats = settle(stats, &mut notices);
    let published = settle(published, &mut notices);

    let now = chrono::Utc::now();
    let offset = state.settings.portal.utc_offset();

    HtmlTemplate(ResidentDashboardTemplate {
        nav: NavContext::new(&state, &session, "dashboard"),
        notices,
        stats,
        announcements: published
            .iter()
            .take(3)
            .map(|a| AnnouncementCard::new(a, now, offset))
            .collect(),
    })
}
