use askama::Template;
use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Extension, Form,
};
use serde::Deserialize;

use crate::{
    api::state::AppState,
    auth::Session,
    domain::DocumentRecord,
    error::{AppError, Result},
    qr::{
        scanner::{Scanner, StillFrames},
        GrayFrame,
    },
    service::{
        scope::PageScope,
        verification_service::{LookupInput, VerificationDesk, VerificationState},
    },
    web::portal::format_fee,
    web::templates::{local_time, HtmlTemplate, NavContext, Notice},
    web::uploads::{read_file_field, read_text_field, to_attachment, SNAPSHOT_EXTENSIONS},
};

pub struct VerifiedView {
    pub code: String,
    pub document: String,
    pub purpose: String,
    pub status: String,
    pub resident_name: String,
    pub resident_contact: String,
    pub resident_address: String,
    pub fee: String,
    pub filed_at: String,
}

#[derive(Template)]
#[template(path = "staff/verify.html")]
pub struct VerifyTemplate {
    pub nav: NavContext,
    pub notices: Vec<Notice>,
    pub code: String,
    pub status: String,
    pub error: Option<String>,
    pub record: Option<VerifiedView>,
    pub can_collect: bool,
}

#[derive(Debug, Deserialize)]
pub struct CollectForm {
    pub code: String,
}

fn view_of(code: &str, record: &DocumentRecord, state: &AppState) -> VerifiedView {
    let submission = &record.submission;
    let contact = [record.resident.phone.as_deref(), record.resident.email.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" / ");

    VerifiedView {
        code: code.to_string(),
        document: submission.category.clone(),
        purpose: submission.description.clone(),
        status: submission.status.as_str().to_string(),
        resident_name: record.resident.name.clone().unwrap_or_else(|| "-".to_string()),
        resident_contact: if contact.is_empty() { "-".to_string() } else { contact },
        resident_address: record.resident.address.clone().unwrap_or_else(|| "-".to_string()),
        fee: submission.fee.map(format_fee).unwrap_or_else(|| "-".to_string()),
        filed_at: submission
            .created_at
            .map(|at| local_time(at, state.settings.portal.utc_offset()))
            .unwrap_or_default(),
    }
}

fn render(state: &AppState, session: &Session, desk: &VerificationDesk, notices: Vec<Notice>) -> HtmlTemplate<VerifyTemplate> {
    let (code, status, error) = match desk.state() {
        VerificationState::Idle => (String::new(), "idle", None),
        VerificationState::Verifying { code } => (code.clone(), "verifying", None),
        VerificationState::Verified { code, .. } => (code.clone(), "verified", None),
        VerificationState::Error(message) => (String::new(), "error", Some(message.clone())),
    };

    HtmlTemplate(VerifyTemplate {
        nav: NavContext::new(state, session, "verify"),
        notices,
        code,
        status: status.to_string(),
        error,
        record: match desk.state() {
            VerificationState::Verified { code, record } => Some(view_of(code, record, state)),
            _ => None,
        },
        can_collect: desk.can_mark_collected(),
    })
}

pub async fn verify_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> impl IntoResponse {
    let desk = state.service_context.verification_desk(&session.token);
    render(&state, &session, &desk, Vec::new())
}

enum VerifyRequest {
    Snapshot(String, Vec<u8>),
    Lookup(LookupInput),
}

async fn read_verify(mut multipart: Multipart) -> Result<VerifyRequest> {
    let (mut code, mut scanned, mut snapshot) = (String::new(), String::new(), None);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed form: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "snapshot" => snapshot = read_file_field(field).await?,
            "scanned" => scanned = read_text_field(field).await?,
            "code" => code = read_text_field(field).await?,
            _ => {
                read_text_field(field).await?;
            }
        }
    }

    Ok(match snapshot {
        Some((filename, data)) => VerifyRequest::Snapshot(filename, data),
        None if !scanned.trim().is_empty() => VerifyRequest::Lookup(LookupInput::Scanned(scanned)),
        None => VerifyRequest::Lookup(LookupInput::Manual(code)),
    })
}

fn snapshot_frame(filename: &str, data: Vec<u8>, max_bytes: usize) -> Result<GrayFrame> {
    let attachment = to_attachment(filename, data, SNAPSHOT_EXTENSIONS, max_bytes)?;
    GrayFrame::from_image_bytes(&attachment.bytes)
}

// POST /portal/staff/verify (multipart: camera snapshot, scanned text or typed code)
pub async fn lookup_document(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    multipart: Multipart,
) -> impl IntoResponse {
    let mut desk = state.service_context.verification_desk(&session.token);
    let scope = PageScope::new();

    match read_verify(multipart).await {
        Ok(VerifyRequest::Lookup(input)) => {
            desk.lookup(input, &scope).await;
        }
        Ok(VerifyRequest::Snapshot(filename, data)) => {
            match snapshot_frame(&filename, data, state.settings.portal.max_upload_bytes) {
                Ok(frame) => {
                    let scanner = Scanner::new(StillFrames::new([frame]));
                    desk.scan_and_lookup(&scanner, &scope).await;
                }
                Err(e) => return render(&state, &session, &desk, vec![Notice::from(&e)]),
            }
        }
        Err(e) => return render(&state, &session, &desk, vec![Notice::from(&e)]),
    }

    render(&state, &session, &desk, Vec::new())
}

// POST /portal/staff/verify/collect
pub async fn mark_collected(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<CollectForm>,
) -> impl IntoResponse {
    let mut desk = state.service_context.verification_desk(&session.token);
    let scope = PageScope::new();
    desk.lookup(LookupInput::Manual(form.code), &scope).await;

    let mut notices = Vec::new();
    if desk.verified().is_some() {
        match desk.mark_collected().await {
            Ok(true) => notices.push(Notice::success("Document marked as collected")),
            Ok(false) => notices.push(Notice::info("This document was already collected")),
            Err(e) => notices.push(Notice::from(&e)),
        }
    }

    render(&state, &session, &desk, notices)
}
