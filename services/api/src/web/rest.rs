//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition of the OpenAPI document.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE, USER_AGENT},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use outreach_core::diagnostics::{format_score, run_diagnostics, verdict_text};
use outreach_core::domain::{Artifact, DiagnosticsReport, RawContact};
use outreach_core::engine::{snapshot_contacts, GenerationError, GenerationOutcome};
use outreach_core::normalizer::normalize;
use outreach_core::policy::resolve_policy;
use outreach_core::ports::PortError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, warn};
use utoipa::OpenApi;

use crate::adapters::RequestProbe;
use crate::web::protocol::{
    ArtifactView, BatchRequest, ContactView, DeliveryPlanResponse, DiagnosticsRequest,
    DiagnosticsResponse, ErrorBody, GenerateSenderResponse, HealthResponse, ManualView,
    NextAction, PlannedDeliveryView, RejectionView, SaveContactsRequest, SaveContactsResponse,
    WarningView,
};
use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        list_contacts_handler,
        save_contacts_handler,
        generate_sender_handler,
        download_sender_handler,
        diagnostics_handler,
        download_diagnostics_handler,
        delivery_plan_handler,
    ),
    components(
        schemas(
            BatchRequest, SaveContactsRequest, DiagnosticsRequest, HealthResponse, ContactView,
            RejectionView, WarningView, ArtifactView, SaveContactsResponse, GenerateSenderResponse,
            DiagnosticsResponse, PlannedDeliveryView, DeliveryPlanResponse, NextAction, ErrorBody,
            ManualView
        )
    ),
    tags(
        (name = "Outreach API", description = "Builds sender and diagnostics launchers for the operator's outreach batches.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Failure Mapping
//=========================================================================================

pub type HandlerError = (StatusCode, Json<ErrorBody>);

fn generation_failure(err: GenerationError) -> HandlerError {
    let message = err.to_string();
    match err {
        GenerationError::EmptyBatch => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                fields: vec!["contacts".to_string()],
                ..ErrorBody::new(message, NextAction::FixData)
            }),
        ),
        GenerationError::NoValidContacts { rejected } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody {
                rejected: rejected.iter().map(RejectionView::from).collect(),
                fields: vec!["phone".to_string()],
                ..ErrorBody::new(message, NextAction::FixData)
            }),
        ),
        GenerationError::Port(PortError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                fields: vec!["contact_ids".to_string()],
                ..ErrorBody::new(message, NextAction::FixData)
            }),
        ),
        GenerationError::Port(PortError::Unavailable(_)) => {
            error!("Contact store unavailable: {message}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorBody::new(message, NextAction::Retry)),
            )
        }
        GenerationError::Port(PortError::Unexpected(_)) => {
            error!("Contact store failed: {message}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(message, NextAction::Retry)),
            )
        }
    }
}

//=========================================================================================
// Shared Helpers
//=========================================================================================

async fn resolve_batch(state: &AppState, request: &BatchRequest) -> Result<Vec<RawContact>, HandlerError> {
    match &request.contacts {
        Some(contacts) => Ok(contacts.clone()),
        None => snapshot_contacts(state.contacts.as_ref(), &request.contact_ids)
            .await
            .map_err(generation_failure),
    }
}

fn tier_label(request: &BatchRequest) -> &str {
    request.speed_tier.as_deref().unwrap_or_default()
}

async fn build_sender(state: &AppState, request: &BatchRequest) -> Result<GenerationOutcome, HandlerError> {
    let raw = resolve_batch(state, request).await?;
    info!(records = raw.len(), "Sender artifact requested.");
    state
        .engine
        .generate_sender(&raw, tier_label(request), Utc::now())
        .map_err(generation_failure)
}

async fn build_diagnostics(
    state: &AppState,
    headers: &HeaderMap,
    request: DiagnosticsRequest,
) -> (DiagnosticsReport, Artifact) {
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let probe = RequestProbe::new(user_agent, request.into_facts(), state.config.probe_timeout);
    let now = Utc::now();
    let report = run_diagnostics(&probe, &state.diagnostic_hosts, now).await;
    let artifact = state.engine.generate_diagnostics(&report, now);
    (report, artifact)
}

/// Presents the artifact as a file save. When the headers cannot be built
/// the artifact text is returned as a manual view instead.
fn attachment(artifact: Artifact) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", artifact.file_name);
    match HeaderValue::from_str(&disposition) {
        Ok(disposition) => {
            let download = artifact.into_download();
            let content_type = HeaderValue::from_str(&format!("{}; charset=utf-8", download.mime_hint))
                .unwrap_or(HeaderValue::from_static("text/plain"));
            (
                [(CONTENT_TYPE, content_type), (CONTENT_DISPOSITION, disposition)],
                download.body,
            )
                .into_response()
        }
        Err(e) => {
            warn!(file_name = %artifact.file_name, "Download hand-off failed, sending manual view: {e}");
            let view = ManualView {
                message: "The download could not be started. Copy the text below into a file with the given name and run it.".to_string(),
                next_action: NextAction::OpenManualView,
                artifact: artifact.into(),
            };
            (StatusCode::OK, Json(view)).into_response()
        }
    }
}

fn sender_response(outcome: GenerationOutcome) -> GenerateSenderResponse {
    GenerateSenderResponse {
        speed_tier: outcome.config.speed_tier.label().to_string(),
        generated_at: outcome.config.timestamp,
        contacts: outcome.contacts.iter().map(ContactView::from).collect(),
        rejected: outcome.rejected.iter().map(RejectionView::from).collect(),
        warnings: outcome.warnings.iter().map(WarningView::from).collect(),
        artifact: outcome.artifact.into(),
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// List every stored contact.
#[utoipa::path(
    get,
    path = "/contacts",
    responses(
        (status = 200, description = "Stored contacts, oldest first", body = Vec<ContactView>),
        (status = 503, description = "Contact store unavailable", body = ErrorBody)
    )
)]
pub async fn list_contacts_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ContactView>>, HandlerError> {
    let contacts = state
        .contacts
        .list_contacts()
        .await
        .map_err(|e| generation_failure(e.into()))?;
    Ok(Json(contacts.iter().map(ContactView::from).collect()))
}

/// Normalize a batch of raw records and store the usable ones.
#[utoipa::path(
    post,
    path = "/contacts",
    request_body = SaveContactsRequest,
    responses(
        (status = 201, description = "Contacts stored", body = SaveContactsResponse),
        (status = 400, description = "Empty batch", body = ErrorBody),
        (status = 422, description = "No usable records", body = ErrorBody)
    )
)]
pub async fn save_contacts_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SaveContactsRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    if request.contacts.is_empty() {
        return Err(generation_failure(GenerationError::EmptyBatch));
    }
    let batch = normalize(&request.contacts, &state.engine.options().normalize);
    if batch.valid.is_empty() {
        return Err(generation_failure(GenerationError::NoValidContacts {
            rejected: batch.rejected,
        }));
    }

    state
        .contacts
        .save_contacts(&batch.valid)
        .await
        .map_err(|e| generation_failure(e.into()))?;
    info!(
        saved = batch.valid.len(),
        rejected = batch.rejected.len(),
        "Contacts stored."
    );

    let response = SaveContactsResponse {
        saved: batch.valid.len(),
        rejected: batch.rejected.iter().map(RejectionView::from).collect(),
        warnings: batch.warnings.iter().map(WarningView::from).collect(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Build the sender artifact and return it with the generation summary.
#[utoipa::path(
    post,
    path = "/artifacts/sender",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "Artifact generated", body = GenerateSenderResponse),
        (status = 400, description = "Empty batch", body = ErrorBody),
        (status = 404, description = "Unknown contact id", body = ErrorBody),
        (status = 422, description = "No usable records", body = ErrorBody)
    )
)]
pub async fn generate_sender_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<GenerateSenderResponse>, HandlerError> {
    let outcome = build_sender(&state, &request).await?;
    Ok(Json(sender_response(outcome)))
}

/// Build the sender artifact and return it as a file download.
#[utoipa::path(
    post,
    path = "/artifacts/sender/download",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "The launcher file, or a manual view when the download cannot be built", content_type = "text/plain", body = String),
        (status = 400, description = "Empty batch", body = ErrorBody),
        (status = 422, description = "No usable records", body = ErrorBody)
    )
)]
pub async fn download_sender_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Response, HandlerError> {
    let outcome = build_sender(&state, &request).await?;
    Ok(attachment(outcome.artifact))
}

/// Score the operator's environment and build the self-test artifact.
#[utoipa::path(
    post,
    path = "/diagnostics",
    request_body = DiagnosticsRequest,
    responses((status = 200, description = "Diagnostics report", body = DiagnosticsResponse))
)]
pub async fn diagnostics_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<DiagnosticsRequest>,
) -> Json<DiagnosticsResponse> {
    let (report, artifact) = build_diagnostics(&state, &headers, request).await;
    Json(DiagnosticsResponse {
        score_text: format!("{}/5", format_score(report.score)),
        verdict_text: verdict_text(report.verdict).to_string(),
        report,
        artifact: artifact.into(),
    })
}

/// Build the self-test artifact and return it as a file download.
#[utoipa::path(
    post,
    path = "/diagnostics/download",
    request_body = DiagnosticsRequest,
    responses((status = 200, description = "The self-test launcher file", content_type = "text/plain", body = String))
)]
pub async fn download_diagnostics_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<DiagnosticsRequest>,
) -> Response {
    let (_, artifact) = build_diagnostics(&state, &headers, request).await;
    attachment(artifact)
}

/// Plan in-browser deliveries for the fallback orchestrator.
#[utoipa::path(
    post,
    path = "/delivery/plan",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "Delivery plan", body = DeliveryPlanResponse),
        (status = 400, description = "Empty batch", body = ErrorBody),
        (status = 422, description = "No usable records", body = ErrorBody)
    )
)]
pub async fn delivery_plan_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<DeliveryPlanResponse>, HandlerError> {
    let raw = resolve_batch(&state, &request).await?;
    let mut rng = StdRng::from_entropy();
    let plan = state
        .engine
        .plan_delivery(&raw, tier_label(&request), &mut rng)
        .map_err(generation_failure)?;

    Ok(Json(DeliveryPlanResponse {
        speed_tier: resolve_policy(tier_label(&request)).tier.label().to_string(),
        deliveries: plan.deliveries.into_iter().map(PlannedDeliveryView::from).collect(),
        rejected: plan.rejected.iter().map(RejectionView::from).collect(),
        warnings: plan.warnings.iter().map(WarningView::from).collect(),
    }))
}
