pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};
use tower_http::{
    compression::CompressionLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{
    config::Settings,
    service::ServiceContext,
    web,
};
use state::AppState;

/// Multipart framing on top of the largest allowed file.
const FORM_OVERHEAD_BYTES: usize = 256 * 1024;

pub fn create_app(
    service_context: Arc<ServiceContext>,
    settings: Arc<Settings>,
) -> Router {
    let body_limit = settings.portal.max_upload_bytes + FORM_OVERHEAD_BYTES;
    let app_state = AppState::new(service_context, settings);

    Router::new()
        .route("/health", get(handlers::root::health_check))
        .merge(web::create_web_routes(app_state.clone()))
        .nest_service("/static", ServeDir::new("static"))

        // Add state to the router
        .with_state(app_state)

        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
