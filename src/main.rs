use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use barangay_portal::{
    api,
    auth::CsrfService,
    client::HttpPortalApi,
    config::Settings,
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "barangay_portal=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    if settings.auth.csrf_secret == Settings::default().auth.csrf_secret {
        tracing::warn!("Using the default CSRF secret; set BARANGAY__AUTH__CSRF_SECRET in production");
    }

    tracing::info!("Starting barangay portal on {}:{}", settings.server.host, settings.server.port);
    tracing::info!("Using backend at {}", settings.backend.base_url);

    let api = Arc::new(HttpPortalApi::new(&settings.backend)?);
    let csrf_service = Arc::new(CsrfService::new(&settings.auth.csrf_secret));

    // Create service context
    let service_context = Arc::new(ServiceContext::new(
        api,
        csrf_service,
        settings.portal.clone(),
    ));

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app).await?;

    Ok(())
}
