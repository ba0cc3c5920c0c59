pub mod templates;
pub mod portal;
pub mod uploads;

use axum::{
    Router,
    routing::{get, post},
};
use crate::api::state::AppState;

pub fn create_web_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Public pages
        .route("/", get(templates::auth::landing_page))

        // Auth pages (web interface)
        .route("/login", get(templates::auth::login_page))
        .route("/login", post(templates::auth::login_handler))
        .route("/logout", post(templates::auth::logout_handler))
        .route("/password-reset", get(templates::auth::reset_page))
        .route("/password-reset", post(templates::auth::reset_handler))

        // Portal routes
        .nest("/portal", portal::create_portal_routes(state))
}
