mod announcements;
mod dashboard;
mod residents;
mod submissions;
mod verify;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};
use crate::api::state::AppState;

pub fn create_staff_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::staff_dashboard))
        // Submissions
        .route("/submissions", get(submissions::submissions_page))
        .route("/submissions/:id/status", post(submissions::update_status))
        // Announcements
        .route("/announcements", get(announcements::announcements_page))
        .route("/announcements/new", get(announcements::new_announcement_page))
        .route("/announcements/:id/edit", get(announcements::edit_announcement_page))
        .route("/announcements/editor", post(announcements::submit_editor))
        // Document verification
        .route("/verify", get(verify::verify_page))
        .route("/verify", post(verify::lookup_document))
        .route("/verify/collect", post(verify::mark_collected))
        // Residents
        .route("/residents", get(residents::residents_page))
        .route("/profile", get(super::profile::profile_page))
        .route("/profile", post(super::profile::update_profile))

        // CSRF protection for state-changing requests (runs after the gate)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::api::middleware::auth::require_csrf,
        ))
        // Staff only; everyone else is redirected (runs first)
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::api::middleware::auth::require_staff,
        ))
}
