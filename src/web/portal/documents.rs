use askama::Template;
use axum::{
    extract::State,
    response::IntoResponse,
    Extension, Form,
};

use crate::{
    api::state::AppState,
    auth::Session,
    domain::{DocumentRequestForm, DOCUMENT_TYPES},
    web::templates::{HtmlTemplate, NavContext, Notice},
};
use super::format_fee;

pub struct DocumentOption {
    pub name: String,
    pub fee: String,
}

#[derive(Template)]
#[template(path = "resident/document_form.html")]
pub struct DocumentFormTemplate {
    pub nav: NavContext,
    pub notices: Vec<Notice>,
    pub documents: Vec<DocumentOption>,
    pub selected: String,
    pub purpose: String,
    pub quantity: u32,
}

fn render(
    state: &AppState,
    session: &Session,
    form: Option<&DocumentRequestForm>,
    notices: Vec<Notice>,
) -> HtmlTemplate<DocumentFormTemplate> {
    HtmlTemplate(DocumentFormTemplate {
        nav: NavContext::new(state, session, "documents"),
        notices,
        documents: DOCUMENT_TYPES
            .iter()
            .map(|d| DocumentOption { name: d.name.to_string(), fee: format_fee(d.fee) })
            .collect(),
        selected: form.map(|f| f.document_type.clone()).unwrap_or_default(),
        purpose: form.map(|f| f.purpose.clone()).unwrap_or_default(),
        quantity: form.map(|f| f.quantity).unwrap_or(1),
    })
}

pub async fn new_request_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> impl IntoResponse {
    render(&state, &session, None, Vec::new())
}

pub async fn request_document(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<DocumentRequestForm>,
) -> impl IntoResponse {
    let desk = state.service_context.submissions(&session.token);
    match desk.request_document(&form, &session.identity).await {
        Ok(receipt) => {
            let notice = Notice::success(format!(
                "Request received. Reference number: {}. Bring this number when you claim the document.",
                receipt.reference
            ));
            render(&state, &session, None, vec![notice])
        }
        Err(e) => render(&state, &session, Some(&form), vec![Notice::from(&e)]),
    }
}
