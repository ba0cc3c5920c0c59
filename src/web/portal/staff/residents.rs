use askama::Template;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Extension,
};
use serde::Deserialize;

use crate::{
    api::state::AppState,
    auth::Session,
    domain::ResidentSummary,
    service::scope::PageScope,
    web::portal::settle,
    web::templates::{HtmlTemplate, NavContext, Notice},
};

#[derive(Template)]
#[template(path = "staff/residents.html")]
pub struct ResidentsTemplate {
    pub nav: NavContext,
    pub notices: Vec<Notice>,
    pub query: String,
    pub residents: Vec<ResidentSummary>,
    pub searched: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResidentsQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn residents_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<ResidentsQuery>,
) -> impl IntoResponse {
    let search = query.q.trim().to_string();
    let mut notices = Vec::new();

    // Short queries would list most of the barangay
    let residents = if search.chars().count() >= 2 {
        let scope = PageScope::new();
        settle(
            scope.run(state.service_context.api.lookup_residents(&session.token, &search)).await,
            &mut notices,
        )
    } else {
        if !search.is_empty() {
            notices.push(Notice::info("Type at least 2 characters to search"));
        }
        Vec::new()
    };

    HtmlTemplate(ResidentsTemplate {
        nav: NavContext::new(&state, &session, "residents"),
        notices,
        searched: search.chars().count() >= 2,
        query: search,
        residents,
    })
}
