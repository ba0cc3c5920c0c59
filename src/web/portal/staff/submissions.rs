use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;

use crate::{
    api::state::AppState,
    auth::Session,
    domain::{SubmissionFilter, SubmissionKind, SubmissionStatus},
    service::scope::PageScope,
    web::portal::{settle, SubmissionRow},
    web::templates::{HtmlTemplate, NavContext, Notice},
};

#[derive(Template)]
#[template(path = "staff/submissions.html")]
pub struct StaffSubmissionsTemplate {
    pub nav: NavContext,
    pub notices: Vec<Notice>,
    pub submissions: Vec<SubmissionRow>,
    pub statuses: Vec<String>,
    pub status_filter: String,
    pub kind_filter: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StaffSubmissionsQuery {
    #[serde(default)]
    pub status: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub updated: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

pub async fn submissions_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<StaffSubmissionsQuery>,
) -> impl IntoResponse {
    let filter = SubmissionFilter {
        kind: SubmissionKind::parse(&query.kind),
        status: SubmissionStatus::parse(&query.status),
        mine: false,
    };

    let scope = PageScope::new();
    let mut notices = Vec::new();
    if !query.updated.is_empty() {
        notices.push(Notice::success(format!("Submission {} updated", query.updated)));
    }
    let desk = state.service_context.submissions(&session.token);
    let submissions = settle(scope.run(desk.list(&filter)).await, &mut notices);
    let offset = state.settings.portal.utc_offset();

    HtmlTemplate(StaffSubmissionsTemplate {
        nav: NavContext::new(&state, &session, "submissions"),
        notices,
        submissions: submissions.iter().map(|s| SubmissionRow::new(s, offset)).collect(),
        statuses: SubmissionStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
        status_filter: filter.status.map(|s| s.as_str().to_string()).unwrap_or_default(),
        kind_filter: filter.kind.map(|k| k.as_str().to_string()).unwrap_or_default(),
    })
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Response {
    let Some(status) = SubmissionStatus::parse(&form.status) else {
        return crate::error::AppError::BadRequest(format!("Unknown status: {}", form.status)).into_response();
    };

    let desk = state.service_context.submissions(&session.token);
    match desk.set_status(&id, status).await {
        Ok(()) => Redirect::to(&format!(
            "/portal/staff/submissions?updated={}",
            urlencoding::encode(&id)
        ))
        .into_response(),
        Err(e) => e.into_response(),
    }
}
