//! services/api/src/bin/api.rs

use std::sync::Arc;

use api_lib::{
    adapters::{DbAdapter, MemoryContactStore},
    config::Config,
    error::ApiError,
    web::{rest::ApiDoc, router, state::AppState},
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method},
    Router,
};
use outreach_core::ports::ContactStore;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Pick the Contact Store ---
    let contacts: Arc<dyn ContactStore> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        None => {
            info!("DATABASE_URL not set, keeping contacts in memory.");
            Arc::new(MemoryContactStore::new())
        }
    };

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(contacts, config.clone()));

    // --- 4. Create the Web Router ---
    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {e}", config.cors_origin)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT])
        .expose_headers([api_lib::web::middleware::REQUEST_ID_HEADER]);

    let api_router = router(app_state)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors);

    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
