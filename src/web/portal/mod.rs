mod announcements;
mod complaints;
mod dashboard;
mod documents;
mod profile;
mod submissions;
pub mod staff;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};
use chrono::{DateTime, FixedOffset, Utc};

use crate::{
    api::state::AppState,
    domain::{Announcement, PublicationState, Submission},
    error::Result,
    web::templates::{local_time, Notice},
};

pub fn create_portal_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/staff", staff::create_staff_routes(state.clone()))
        .merge(resident_routes(state))
}

fn resident_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::resident_dashboard))
        .route("/announcements", get(announcements::announcements_page))
        .route("/complaints/new", get(complaints::new_complaint_page))
        .route("/complaints", post(complaints::file_complaint))
        .route("/documents/new", get(documents::new_request_page))
        .route("/documents", post(documents::request_document))
        .route("/submissions", get(submissions::my_submissions_page))
        .route("/submissions/:id/qr", get(submissions::pickup_qr_page))
        .route("/profile", get(profile::profile_page))
        .route("/profile", post(profile::update_profile))

        // CSRF protection for state-changing requests (runs after the gate)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::api::middleware::auth::require_csrf,
        ))
        // Residents only; everyone else is redirected (runs first)
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::api::middleware::auth::require_resident,
        ))
}

/// Unwrap a page-scoped fetch. A failure becomes a notice and an empty
/// value; a cancelled fetch is just empty.
pub(crate) fn settle<T: Default>(result: Option<Result<T>>, notices: &mut Vec<Notice>) -> T {
    match result {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            tracing::warn!("Page fetch failed: {}", e);
            notices.push(Notice::from(&e));
            T::default()
        }
        None => T::default(),
    }
}

// Shared view models used across portal modules

pub struct AnnouncementCard {
    pub id: String,
    pub title: String,
    pub category: String,
    pub priority: String,
    pub preview: String,
    pub content: String,
    pub state_label: String,
    pub state_class: String,
    pub when: String,
    pub event: Option<String>,
    pub target_hall: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
}

impl AnnouncementCard {
    pub fn new(announcement: &Announcement, now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let state = announcement.state(now);
        let when = match state {
            PublicationState::Scheduled(at) => format!("Goes live {}", local_time(at, offset)),
            PublicationState::Published => announcement
                .published_schedule
                .or(announcement.created_at)
                .map(|at| local_time(at, offset))
                .unwrap_or_default(),
            PublicationState::Draft => announcement
                .created_at
                .map(|at| format!("Created {}", local_time(at, offset)))
                .unwrap_or_default(),
        };
        let event = match (&announcement.event_date, &announcement.event_time) {
            (Some(date), Some(time)) => Some(format!("{} at {}", date, time)),
            (Some(date), None) => Some(date.clone()),
            _ => None,
        };

        Self {
            id: announcement.id.clone(),
            title: announcement.title.clone(),
            category: announcement.category.clone(),
            priority: announcement.priority.clone(),
            preview: announcement.content_preview(160),
            content: announcement.content.clone(),
            state_label: state.label().to_string(),
            state_class: state.label().to_lowercase(),
            when,
            event,
            target_hall: announcement.target_hall.clone(),
            image_url: announcement.image_url.clone(),
            tags: announcement.tags.clone(),
        }
    }
}

pub struct SubmissionRow {
    pub id: String,
    pub reference: String,
    pub kind: String,
    pub subject: String,
    pub category: String,
    pub description: String,
    pub priority: String,
    pub status: String,
    pub filed_by: String,
    pub filed_at: String,
    pub fee: Option<String>,
    pub is_document: bool,
    pub is_closed: bool,
}

impl SubmissionRow {
    pub fn new(submission: &Submission, offset: FixedOffset) -> Self {
        let filed_by = if submission.anonymous {
            "Anonymous".to_string()
        } else {
            submission.contact.name.clone().unwrap_or_else(|| "-".to_string())
        };

        Self {
            id: submission.id.clone(),
            reference: submission.pickup_code().to_string(),
            kind: submission.kind.label().to_string(),
            subject: submission.subject.clone(),
            category: submission.category.clone(),
            description: submission.description.clone(),
            priority: submission.priority.clone(),
            status: submission.status.as_str().to_string(),
            filed_by,
            filed_at: submission
                .created_at
                .map(|at| local_time(at, offset))
                .unwrap_or_default(),
            fee: submission.fee.map(format_fee),
            is_document: submission.kind == crate::domain::SubmissionKind::DocumentRequest,
            is_closed: submission.status.is_closed(),
        }
    }
}

pub fn format_fee(amount: f64) -> String {
    if amount <= 0.0 {
        "Free".to_string()
    } else {
        format!("₱{:.2}", amount)
    }
}
