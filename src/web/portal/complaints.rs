use askama::Template;
use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Extension,
};

use crate::{
    api::state::AppState,
    auth::Session,
    domain::{ComplaintForm, COMPLAINT_CATEGORIES},
    error::{AppError, Result},
    web::templates::{HtmlTemplate, NavContext, Notice},
    web::uploads::{read_file_field, read_text_field},
};

#[derive(Template)]
#[template(path = "resident/complaint_form.html")]
pub struct ComplaintFormTemplate {
    pub nav: NavContext,
    pub notices: Vec<Notice>,
    pub categories: Vec<String>,
    pub form: ComplaintForm,
    pub anonymous: bool,
    /// Reference of the complaint just filed, shown verbatim.
    pub receipt: Option<String>,
}

fn blank_form() -> ComplaintForm {
    ComplaintForm {
        category: String::new(),
        subject: String::new(),
        description: String::new(),
        location: String::new(),
        priority: "normal".to_string(),
        anonymous: None,
    }
}

fn render(
    state: &AppState,
    session: &Session,
    form: ComplaintForm,
    notices: Vec<Notice>,
    receipt: Option<String>,
) -> HtmlTemplate<ComplaintFormTemplate> {
    HtmlTemplate(ComplaintFormTemplate {
        nav: NavContext::new(state, session, "complaints"),
        notices,
        categories: COMPLAINT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        anonymous: form.is_anonymous(),
        form,
        receipt,
    })
}

pub async fn new_complaint_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> impl IntoResponse {
    render(&state, &session, blank_form(), Vec::new(), None)
}

async fn read_complaint(mut multipart: Multipart) -> Result<(ComplaintForm, Option<(String, Vec<u8>)>)> {
    let mut form = blank_form();
    let mut evidence = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed form: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "evidence" => evidence = read_file_field(field).await?,
            "category" => form.category = read_text_field(field).await?,
            "subject" => form.subject = read_text_field(field).await?,
            "description" => form.description = read_text_field(field).await?,
            "location" => form.location = read_text_field(field).await?,
            "priority" => form.priority = read_text_field(field).await?,
            "anonymous" => form.anonymous = Some(read_text_field(field).await?),
            _ => {
                read_text_field(field).await?;
            }
        }
    }

    Ok((form, evidence))
}

// POST /portal/complaints (multipart; CSRF token travels in the query string)
pub async fn file_complaint(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    multipart: Multipart,
) -> impl IntoResponse {
    let (form, evidence) = match read_complaint(multipart).await {
        Ok(parsed) => parsed,
        Err(e) => return render(&state, &session, blank_form(), vec![Notice::from(&e)], None),
    };

    let desk = state.service_context.submissions(&session.token);
    match desk.file_complaint(&form, &session.identity, evidence).await {
        Ok(receipt) => {
            let notice = Notice::success(format!(
                "Your complaint was filed. Reference number: {}",
                receipt.reference
            ));
            render(&state, &session, blank_form(), vec![notice], Some(receipt.reference))
        }
        // The form comes back as typed so nothing is lost
        Err(e) => render(&state, &session, form, vec![Notice::from(&e)], None),
    }
}
