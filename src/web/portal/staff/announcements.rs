use askama::Template;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use serde::Deserialize;

use crate::{
    api::state::AppState,
    auth::Session,
    domain::{ANNOUNCEMENT_CATEGORIES, ANNOUNCEMENT_PRIORITIES},
    error::{AppError, Result},
    service::{
        announcement_service::{AnnouncementAuthoring, AnnouncementForm},
        scope::PageScope,
    },
    web::portal::{settle, AnnouncementCard},
    web::templates::{local_time, HtmlTemplate, NavContext, Notice},
    web::uploads::{read_file_field, read_text_field},
};

#[derive(Template)]
#[template(path = "staff/announcements.html")]
pub struct StaffAnnouncementsTemplate {
    pub nav: NavContext,
    pub notices: Vec<Notice>,
    pub announcements: Vec<AnnouncementCard>,
    pub drafts: Vec<AnnouncementCard>,
}

#[derive(Template)]
#[template(path = "staff/announcement_editor.html")]
pub struct AnnouncementEditorTemplate {
    pub nav: NavContext,
    pub notices: Vec<Notice>,
    pub form: AnnouncementForm,
    pub editing_id: String,
    pub categories: Vec<String>,
    pub priorities: Vec<String>,
    pub drafts: Vec<AnnouncementCard>,
    pub publish_buffer_secs: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnnouncementsQuery {
    #[serde(default)]
    pub published: String,
}

fn cards(state: &AppState, list: &[crate::domain::Announcement]) -> Vec<AnnouncementCard> {
    let now = chrono::Utc::now();
    let offset = state.settings.portal.utc_offset();
    list.iter().map(|a| AnnouncementCard::new(a, now, offset)).collect()
}

fn editor(
    state: &AppState,
    session: &Session,
    form: AnnouncementForm,
    drafts: Vec<AnnouncementCard>,
    notices: Vec<Notice>,
) -> HtmlTemplate<AnnouncementEditorTemplate> {
    HtmlTemplate(AnnouncementEditorTemplate {
        nav: NavContext::new(state, session, "announcements"),
        notices,
        editing_id: form.editing_id.clone().unwrap_or_default(),
        form,
        categories: ANNOUNCEMENT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        priorities: ANNOUNCEMENT_PRIORITIES.iter().map(|p| p.to_string()).collect(),
        drafts,
        publish_buffer_secs: state.settings.portal.publish_buffer().num_seconds(),
    })
}

async fn drafts_for(state: &AppState, authoring: &AnnouncementAuthoring, notices: &mut Vec<Notice>) -> Vec<AnnouncementCard> {
    let scope = PageScope::new();
    let drafts = settle(scope.run(authoring.list_drafts()).await, notices);
    cards(state, &drafts)
}

pub async fn announcements_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<AnnouncementsQuery>,
) -> impl IntoResponse {
    let api = state.service_context.api.as_ref();
    let scope = PageScope::new();
    let mut notices = Vec::new();
    if !query.published.is_empty() {
        notices.push(Notice::success(query.published.clone()));
    }

    let (all, drafts) = tokio::join!(
        scope.run(api.list_announcements(&session.token)),
        scope.run(api.list_drafts(&session.token)),
    );
    let all = settle(all, &mut notices);
    let drafts = settle(drafts, &mut notices);

    HtmlTemplate(StaffAnnouncementsTemplate {
        nav: NavContext::new(&state, &session, "announcements"),
        notices,
        announcements: cards(&state, &all),
        drafts: cards(&state, &drafts),
    })
}

pub async fn new_announcement_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> impl IntoResponse {
    let authoring = state.service_context.announcements(&session.token);
    let mut notices = Vec::new();
    let drafts = drafts_for(&state, &authoring, &mut notices).await;
    let form = AnnouncementForm {
        priority: "normal".to_string(),
        ..AnnouncementForm::default()
    };
    editor(&state, &session, form, drafts, notices)
}

// GET /portal/staff/announcements/:id/edit
pub async fn edit_announcement_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let authoring = state.service_context.announcements(&session.token);
    let mut notices = Vec::new();
    let form = match authoring.load_draft(&id).await {
        Ok(form) => form,
        Err(e) => {
            notices.push(Notice::from(&e));
            AnnouncementForm::default()
        }
    };
    let drafts = drafts_for(&state, &authoring, &mut notices).await;
    editor(&state, &session, form, drafts, notices)
}

struct EditorSubmission {
    form: AnnouncementForm,
    action: String,
    image: Option<(String, Vec<u8>)>,
}

async fn read_editor(mut multipart: Multipart) -> Result<EditorSubmission> {
    let mut submission = EditorSubmission {
        form: AnnouncementForm::default(),
        action: String::new(),
        image: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed form: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => submission.image = read_file_field(field).await?,
            "action" => submission.action = read_text_field(field).await?,
            "csrf_token" => {
                read_text_field(field).await?;
            }
            _ => {
                let value = read_text_field(field).await?;
                submission.form.set_field(&name, value);
            }
        }
    }

    Ok(submission)
}

// POST /portal/staff/announcements/editor (multipart)
pub async fn submit_editor(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    multipart: Multipart,
) -> Response {
    let authoring = state.service_context.announcements(&session.token);

    let EditorSubmission { mut form, action, image } = match read_editor(multipart).await {
        Ok(submission) => submission,
        Err(e) => {
            let mut notices = vec![Notice::from(&e)];
            let drafts = drafts_for(&state, &authoring, &mut notices).await;
            return editor(&state, &session, AnnouncementForm::default(), drafts, notices).into_response();
        }
    };

    let mut notices = Vec::new();

    if let Some((filename, data)) = image {
        match authoring.attach_image(&mut form, &filename, data).await {
            Ok(_) => notices.push(Notice::success("Image attached")),
            Err(e) => {
                // Keep the form as typed; the image can be retried
                notices.push(Notice::from(&e));
                let drafts = drafts_for(&state, &authoring, &mut notices).await;
                return editor(&state, &session, form, drafts, notices).into_response();
            }
        }
    }

    match action.as_str() {
        "publish" => match authoring.publish(&mut form, chrono::Utc::now()).await {
            Ok(published) => {
                let message = format!(
                    "Announcement will go live {}",
                    local_time(published.goes_live, authoring.config().utc_offset())
                );
                Redirect::to(&format!(
                    "/portal/staff/announcements?published={}",
                    urlencoding::encode(&message)
                ))
                .into_response()
            }
            Err(e) => {
                notices.push(Notice::from(&e));
                let drafts = drafts_for(&state, &authoring, &mut notices).await;
                editor(&state, &session, form, drafts, notices).into_response()
            }
        },
        "save" => {
            match authoring.save_draft(&mut form).await {
                Ok(_) => notices.push(Notice::success("Draft saved")),
                Err(e) => notices.push(Notice::from(&e)),
            }
            // A failed refresh is its own notice; the save above stands
            let drafts = drafts_for(&state, &authoring, &mut notices).await;
            editor(&state, &session, form, drafts, notices).into_response()
        }
        // Image-only submit: the attached URL rides along in the form
        _ => {
            let drafts = drafts_for(&state, &authoring, &mut notices).await;
            editor(&state, &session, form, drafts, notices).into_response()
        }
    }
}
