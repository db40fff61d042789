//! crates/outreach_core/src/engine.rs
//!
//! The artifact generation pipeline: normalize, sanitize, synthesize,
//! package. The engine holds only immutable options, so one instance can
//! serve concurrent requests.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::delivery::{plan_deliveries, PlannedDelivery};
use crate::diagnostics::package_diagnostics;
use crate::domain::{
    Artifact, Contact, ContactStatus, DiagnosticsReport, GenerationConfig, RawContact,
    DEFAULT_CLIENT_URL,
};
use crate::normalizer::{
    normalize, Field, NormalizeOptions, RecordWarning, Rejection, DEFAULT_MESSAGE,
};
use crate::packager::{LauncherDetails, Packager, PackagerOptions};
use crate::policy::resolve_policy;
use crate::ports::{ContactStore, PortError};
use crate::program::synthesize_program;
use crate::sanitizer::{sanitize, SanitizeMode};

//=========================================================================================
// Errors and Results
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("no contacts were supplied")]
    EmptyBatch,
    #[error("none of the {} records could be used", .rejected.len())]
    NoValidContacts { rejected: Vec<Rejection> },
    #[error(transparent)]
    Port(#[from] PortError),
}

/// Contacts ready for synthesis, plus what happened to the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedBatch {
    pub contacts: Vec<Contact>,
    pub rejected: Vec<Rejection>,
    pub warnings: Vec<RecordWarning>,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub artifact: Artifact,
    pub config: GenerationConfig,
    pub contacts: Vec<Contact>,
    pub rejected: Vec<Rejection>,
    pub warnings: Vec<RecordWarning>,
}

#[derive(Debug, Clone)]
pub struct DeliveryPlan {
    pub deliveries: Vec<PlannedDelivery>,
    pub rejected: Vec<Rejection>,
    pub warnings: Vec<RecordWarning>,
}

//=========================================================================================
// Engine
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub normalize: NormalizeOptions,
    pub packager: PackagerOptions,
    pub client_url: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            normalize: NormalizeOptions::default(),
            packager: PackagerOptions::default(),
            client_url: DEFAULT_CLIENT_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArtifactEngine {
    options: EngineOptions,
    packager: Packager,
}

impl ArtifactEngine {
    pub fn new(options: EngineOptions) -> Self {
        let packager = Packager::new(options.packager.clone());
        Self { options, packager }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn config(&self, tier_label: &str, timestamp: DateTime<Utc>) -> GenerationConfig {
        GenerationConfig::new(tier_label, timestamp).with_client_url(self.options.client_url.clone())
    }

    /// Normalizes and sanitizes a batch. Fails only when nothing usable
    /// remains.
    pub fn prepare(&self, raw: &[RawContact]) -> Result<PreparedBatch, GenerationError> {
        if raw.is_empty() {
            return Err(GenerationError::EmptyBatch);
        }

        let batch = normalize(raw, &self.options.normalize);
        let mut warnings = batch.warnings.clone();
        let mut contacts = Vec::with_capacity(batch.valid.len());

        for (position, contact) in batch.valid.iter().enumerate() {
            let index = batch.source_index(position).unwrap_or(position);
            let mut warn_field = |field: Field, message: &str| {
                warnings.push(RecordWarning {
                    index,
                    field,
                    message: message.to_string(),
                });
            };

            let mut name = sanitize(&contact.name, SanitizeMode::ScriptLiteral);
            if name.is_empty() {
                warn_field(Field::Name, "name emptied by sanitization; placeholder used");
                name = format!("Contacto {}", index + 1);
            } else if name != contact.name {
                warn_field(Field::Name, "name changed by sanitization");
            }

            let mut message = sanitize(&contact.message, SanitizeMode::ScriptLiteral);
            if message.is_empty() {
                warn_field(Field::Message, "message emptied by sanitization; default placeholder used");
                message = DEFAULT_MESSAGE.to_string();
            } else if message != contact.message {
                warn_field(Field::Message, "message changed by sanitization");
            }

            let id = sanitize(&contact.id, SanitizeMode::ShellLine);
            let id = if id.is_empty() {
                format!("contact-{}", index + 1)
            } else {
                id
            };

            contacts.push(Contact {
                id,
                name,
                message,
                ..contact.clone()
            });
        }

        if contacts.is_empty() {
            warn!(
                records = raw.len(),
                rejected = batch.rejected.len(),
                "No usable contacts in batch."
            );
            return Err(GenerationError::NoValidContacts {
                rejected: batch.rejected,
            });
        }

        info!(
            records = raw.len(),
            valid = contacts.len(),
            rejected = batch.rejected.len(),
            warnings = warnings.len(),
            "Contact batch prepared."
        );
        for contact in &contacts {
            debug!(id = %contact.id, name = %contact.name, phone = %contact.phone, "Contact accepted.");
        }

        Ok(PreparedBatch {
            contacts,
            rejected: batch.rejected,
            warnings,
        })
    }

    /// Builds the sender artifact for a batch of raw records.
    pub fn generate_sender(
        &self,
        raw: &[RawContact],
        tier_label: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<GenerationOutcome, GenerationError> {
        let prepared = self.prepare(raw)?;
        let config = self.config(tier_label, timestamp);

        let program = synthesize_program(&prepared.contacts, &config);
        let details = LauncherDetails::sender(prepared.contacts.len(), &config);
        let artifact = self.packager.package(&program, &config, &details);

        info!(
            file_name = %artifact.file_name,
            size_bytes = artifact.size_bytes(),
            contacts = artifact.contact_count,
            tier = config.speed_tier.label(),
            generated_at = %config.timestamp,
            "Sender artifact generated."
        );

        Ok(GenerationOutcome {
            artifact,
            config,
            contacts: prepared.contacts,
            rejected: prepared.rejected,
            warnings: prepared.warnings,
        })
    }

    /// Builds the self-test artifact for a diagnostics report.
    pub fn generate_diagnostics(&self, report: &DiagnosticsReport, timestamp: DateTime<Utc>) -> Artifact {
        let config = self.config("", timestamp);
        let artifact = package_diagnostics(report, &config, &self.packager);
        info!(
            file_name = %artifact.file_name,
            size_bytes = artifact.size_bytes(),
            score = report.score,
            generated_at = %config.timestamp,
            "Diagnostics artifact generated."
        );
        artifact
    }

    /// Plans in-browser deliveries for the fallback orchestrator.
    pub fn plan_delivery<R: Rng + ?Sized>(
        &self,
        raw: &[RawContact],
        tier_label: &str,
        rng: &mut R,
    ) -> Result<DeliveryPlan, GenerationError> {
        let prepared = self.prepare(raw)?;
        let policy = resolve_policy(tier_label);
        let deliveries = plan_deliveries(&prepared.contacts, &policy, &self.options.client_url, rng);
        info!(
            deliveries = deliveries.len(),
            tier = policy.tier.label(),
            "Delivery plan built."
        );
        Ok(DeliveryPlan {
            deliveries,
            rejected: prepared.rejected,
            warnings: prepared.warnings,
        })
    }
}

/// Reads a snapshot from the store: the given ids in order, or every
/// pending contact when no ids are given.
pub async fn snapshot_contacts(
    store: &dyn ContactStore,
    ids: &[String],
) -> Result<Vec<RawContact>, GenerationError> {
    let contacts = if ids.is_empty() {
        store
            .list_contacts()
            .await?
            .into_iter()
            .filter(|contact| contact.status == ContactStatus::Pending)
            .collect()
    } else {
        store.get_contacts(ids).await?
    };
    Ok(contacts.iter().map(Contact::to_raw).collect())
}
