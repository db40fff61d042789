//! services/api/src/web/protocol.rs
//!
//! Request and response payloads of the REST API. Core types are mapped
//! into these views so the wire format stays independent of the engine.

use chrono::{DateTime, Utc};
use outreach_core::delivery::PlannedDelivery;
use outreach_core::domain::{Artifact, Contact, DiagnosticsReport, MemoryUsage};
use outreach_core::normalizer::{RecordWarning, Rejection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::adapters::ClientFacts;

//=========================================================================================
// Requests
//=========================================================================================

/// Selects the contacts for a batch: inline records, or stored contacts
/// by id. With neither, every pending stored contact is used.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BatchRequest {
    /// Raw contact-like records; field names are matched by alias.
    #[serde(default)]
    #[schema(value_type = Option<Vec<Object>>)]
    pub contacts: Option<Vec<Value>>,
    #[serde(default)]
    pub contact_ids: Vec<String>,
    /// One of the speed tier labels. Unknown labels fall back to normal.
    #[serde(default)]
    pub speed_tier: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveContactsRequest {
    #[schema(value_type = Vec<Object>)]
    pub contacts: Vec<Value>,
}

/// What the UI measured in the operator's browser.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DiagnosticsRequest {
    pub platform: Option<String>,
    pub popups_allowed: Option<bool>,
    pub storage_available: Option<bool>,
    pub online: Option<bool>,
    pub memory_used_mb: Option<u64>,
    pub memory_limit_mb: Option<u64>,
}

impl DiagnosticsRequest {
    pub fn into_facts(self) -> ClientFacts {
        ClientFacts {
            platform: self.platform,
            popups_allowed: self.popups_allowed,
            storage_available: self.storage_available,
            online: self.online,
            memory: self.memory_used_mb.map(|used_mb| MemoryUsage {
                used_mb,
                limit_mb: self.memory_limit_mb,
            }),
        }
    }
}

//=========================================================================================
// Response Views
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContactView {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub message: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub status: String,
}

impl From<&Contact> for ContactView {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id.clone(),
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            message: contact.message.clone(),
            company: contact.company.clone(),
            email: contact.email.clone(),
            status: contact.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RejectionView {
    /// Position of the record in the submitted batch.
    pub index: usize,
    pub reasons: Vec<String>,
}

impl From<&Rejection> for RejectionView {
    fn from(rejection: &Rejection) -> Self {
        Self {
            index: rejection.index,
            reasons: rejection.reasons.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WarningView {
    pub index: usize,
    pub field: String,
    pub message: String,
}

impl From<&RecordWarning> for WarningView {
    fn from(warning: &RecordWarning) -> Self {
        Self {
            index: warning.index,
            field: field_name(warning),
            message: warning.message.clone(),
        }
    }
}

fn field_name(warning: &RecordWarning) -> String {
    match serde_json::to_value(warning.field) {
        Ok(Value::String(name)) => name,
        _ => format!("{:?}", warning.field).to_lowercase(),
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ArtifactView {
    pub file_name: String,
    /// The full launcher text, for the manual view.
    pub body: String,
    pub mime_hint: String,
    pub size_bytes: usize,
    pub contact_count: usize,
    pub kind: String,
    pub target: String,
}

impl From<Artifact> for ArtifactView {
    fn from(artifact: Artifact) -> Self {
        let size_bytes = artifact.size_bytes();
        let contact_count = artifact.contact_count;
        let kind = artifact.kind.file_segment().to_string();
        let target = artifact.target.extension().to_string();
        let download = artifact.into_download();
        Self {
            file_name: download.file_name,
            body: download.body,
            mime_hint: download.mime_hint.to_string(),
            size_bytes,
            contact_count,
            kind,
            target,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaveContactsResponse {
    pub saved: usize,
    pub rejected: Vec<RejectionView>,
    pub warnings: Vec<WarningView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateSenderResponse {
    pub artifact: ArtifactView,
    pub speed_tier: String,
    pub generated_at: DateTime<Utc>,
    pub contacts: Vec<ContactView>,
    pub rejected: Vec<RejectionView>,
    pub warnings: Vec<WarningView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DiagnosticsResponse {
    /// `4/5` style score for display.
    pub score_text: String,
    pub verdict_text: String,
    #[schema(value_type = Object)]
    pub report: DiagnosticsReport,
    pub artifact: ArtifactView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlannedDeliveryView {
    pub contact_id: String,
    pub name: String,
    pub phone: String,
    pub url: String,
    pub wait_after_ms: Option<u64>,
}

impl From<PlannedDelivery> for PlannedDeliveryView {
    fn from(planned: PlannedDelivery) -> Self {
        Self {
            contact_id: planned.contact_id,
            name: planned.name,
            phone: planned.phone,
            url: planned.url,
            wait_after_ms: planned.wait_after_ms,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryPlanResponse {
    pub speed_tier: String,
    pub deliveries: Vec<PlannedDeliveryView>,
    pub rejected: Vec<RejectionView>,
    pub warnings: Vec<WarningView>,
}

//=========================================================================================
// Failures
//=========================================================================================

/// The concrete thing the operator should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    FixData,
    EnablePermission,
    Retry,
    OpenManualView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    /// Records that caused the failure, if any.
    pub rejected: Vec<RejectionView>,
    /// Field names involved in the failure, if any.
    pub fields: Vec<String>,
    pub next_action: NextAction,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>, next_action: NextAction) -> Self {
        Self {
            message: message.into(),
            rejected: Vec::new(),
            fields: Vec::new(),
            next_action,
        }
    }
}

/// Sent instead of an attachment when the download cannot be built.
#[derive(Debug, Serialize, ToSchema)]
pub struct ManualView {
    pub message: String,
    pub next_action: NextAction,
    pub artifact: ArtifactView,
}
