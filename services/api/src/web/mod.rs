pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};

use crate::web::middleware::request_id;
use crate::web::rest::{
    delivery_plan_handler, diagnostics_handler, download_diagnostics_handler,
    download_sender_handler, generate_sender_handler, health_handler, list_contacts_handler,
    save_contacts_handler,
};
use crate::web::state::AppState;

/// Every API route, with request correlation applied.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/contacts", get(list_contacts_handler).post(save_contacts_handler))
        .route("/artifacts/sender", post(generate_sender_handler))
        .route("/artifacts/sender/download", post(download_sender_handler))
        .route("/diagnostics", post(diagnostics_handler))
        .route("/diagnostics/download", post(download_diagnostics_handler))
        .route("/delivery/plan", post(delivery_plan_handler))
        .layer(axum_middleware::from_fn(request_id))
        .with_state(state)
}
