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
    domain::{DashboardStats, SubmissionFilter, SubmissionStatus},
    service::scope::PageScope,
    web::portal::{settle, AnnouncementCard, SubmissionRow},
    web::templates::{HtmlTemplate, NavContext, Notice},
};

#[derive(Template)]
#[template(path = "staff/dashboard.html")]
pub struct StaffDashboardTemplate {
    pub nav: NavContext,
    pub notices: Vec<Notice>,
    pub stats: DashboardStats,
    pub pending: Vec<SubmissionRow>,
    pub announcements: Vec<AnnouncementCard>,
}

pub async fn staff_dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> impl IntoResponse {
    let api = state.service_context.api.as_ref();
    let scope = PageScope::new();
    let mut notices = Vec::new();
    let pending_filter = SubmissionFilter {
        status: Some(SubmissionStatus::Pending),
        ..SubmissionFilter::default()
    };

    let (stats, pending, announcements) = tokio::join!(
        scope.run(api.dashboard_stats(&session.token, StatsScope::Staff)),
        scope.run(api.list_submissions(&session.token, &pending_filter)),
        scope.run(api.list_announcements(&session.token)),
    );
    let stats = settle(stats, &mut notices);
    let pending = settle(pending, &mut notices);
    let announcements = settle(announcements, &mut notices);

    let now = chrono::Utc::now();
    let offset = state.settings.portal.utc_offset();

    HtmlTemplate(StaffDashboardTemplate {
        nav: NavContext::new(&state, &session, "dashboard"),
        notices,
        stats,
        pending: pending.iter().take(5).map(|s| SubmissionRow::new(s, offset)).collect(),
        announcements: announcements
            .iter()
            .take(5)
            .map(|a| AnnouncementCard::new(a, now, offset))
            .collect(),
    })
}
