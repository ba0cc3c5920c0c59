use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension,
};
use serde::Deserialize;

use crate::{
    api::state::AppState,
    auth::Session,
    domain::{SubmissionFilter, SubmissionKind},
    service::{scope::PageScope, submission_service::QrView},
    web::templates::{HtmlTemplate, NavContext, Notice},
};
use super::{settle, SubmissionRow};

#[derive(Template)]
#[template(path = "resident/submissions.html")]
pub struct MySubmissionsTemplate {
    pub nav: NavContext,
    pub notices: Vec<Notice>,
    pub submissions: Vec<SubmissionRow>,
    pub kind_filter: String,
}

#[derive(Template)]
#[template(path = "resident/pickup_qr.html")]
pub struct PickupQrTemplate {
    pub nav: NavContext,
    pub notices: Vec<Notice>,
    pub submission_id: String,
    pub image_src: Option<String>,
    pub svg: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MySubmissionsQuery {
    #[serde(rename = "type", default)]
    pub kind: String,
}

pub async fn my_submissions_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<MySubmissionsQuery>,
) -> impl IntoResponse {
    let filter = SubmissionFilter {
        kind: SubmissionKind::parse(&query.kind),
        status: None,
        mine: true,
    };

    let scope = PageScope::new();
    let mut notices = Vec::new();
    let desk = state.service_context.submissions(&session.token);
    let submissions = settle(scope.run(desk.list(&filter)).await, &mut notices);
    let offset = state.settings.portal.utc_offset();

    HtmlTemplate(MySubmissionsTemplate {
        nav: NavContext::new(&state, &session, "submissions"),
        notices,
        submissions: submissions.iter().map(|s| SubmissionRow::new(s, offset)).collect(),
        kind_filter: filter.kind.map(|k| k.as_str().to_string()).unwrap_or_default(),
    })
}

pub async fn pickup_qr_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let desk = state.service_context.submissions(&session.token);
    let mut notices = Vec::new();
    let (image_src, svg) = match desk.pickup_qr(&id).await {
        Ok(QrView::Image(src)) => (Some(src), None),
        Ok(QrView::Svg(svg)) => (None, Some(svg)),
        Err(e) => {
            notices.push(Notice::from(&e));
            (None, None)
        }
    };

    HtmlTemplate(PickupQrTemplate {
        nav: NavContext::new(&state, &session, "submissions"),
        notices,
        submission_id: id,
        image_src,
        svg,
    })
}
