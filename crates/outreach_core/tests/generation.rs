//! End-to-end checks of the generation pipeline through the public API.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use outreach_core::diagnostics::{default_probe_targets, run_diagnostics};
use outreach_core::domain::{
    BrowserFamily, ContactStatus, HostCheck, LauncherTarget, MemoryUsage, ProbeTarget, Verdict,
    DEFAULT_CLIENT_URL,
};
use outreach_core::engine::snapshot_contacts;
use outreach_core::packager::PackagerOptions;
use outreach_core::{
    ArtifactEngine, ArtifactKind, Contact, ContactStore, EngineOptions, EnvironmentProbe,
    GenerationError, PortError, PortResult,
};

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 14, 3, 22).unwrap()
}

#[test]
fn sender_artifact_embeds_personalized_contacts() {
    let engine = ArtifactEngine::default();
    let outcome = engine
        .generate_sender(
            &[
                json!({"nombre": "Ana Ruiz", "telefono": "+51987654321", "mensaje": "Promo 20%"}),
                json!({"name": "Beto", "phone": "12"}),
            ],
            "Normal (3-5s)",
            at(),
        )
        .unwrap();

    let artifact = &outcome.artifact;
    assert_eq!(artifact.kind, ArtifactKind::Sender);
    assert_eq!(artifact.target, LauncherTarget::WindowsBatch);
    assert_eq!(artifact.contact_count, 1);
    assert_eq!(artifact.file_name, "WhatsAppSender_Sender_2026-10-17_14-03-22-000.bat");
    assert!(artifact.body.contains(r#""phone": "+51987654321","#));
    assert!(artifact.body.contains(r#""message": "Hola Ana Ruiz!\n\nPromo 20%%","#));
    assert!(artifact.body.contains("DELAY_MIN = 3"));

    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].index, 1);

    let download = outcome.artifact.clone().into_download();
    assert_eq!(download.mime_hint, "text/plain");
    assert_eq!(download.file_name, artifact.file_name);
}

#[test]
fn bare_local_number_gets_default_prefix_end_to_end() {
    let engine = ArtifactEngine::default();
    let outcome = engine
        .generate_sender(
            &[json!({"name": "Ana Ruiz", "phone": "987654321", "message": "Promo 20%"})],
            "Normal",
            at(),
        )
        .unwrap();

    assert_eq!(outcome.contacts[0].phone, "+51987654321");
    assert_eq!(outcome.config.delay.min_secs, 3);
    assert_eq!(outcome.config.delay.max_secs, 5);

    let body = &outcome.artifact.body;
    assert!(body.contains(r#""phone": "+51987654321","#));
    assert!(body.contains("DELAY_MIN = 3"));
    assert!(body.contains("DELAY_MAX = 5"));
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.message == "country prefix +51 assumed"));
}

#[test]
fn posix_target_produces_shell_script() {
    let engine = ArtifactEngine::new(EngineOptions {
        packager: PackagerOptions {
            target: LauncherTarget::PosixShell,
            ..PackagerOptions::default()
        },
        ..EngineOptions::default()
    });
    let outcome = engine
        .generate_sender(&[json!({"name": "Ana", "phone": "987654321"})], "Rápida (2-3s)", at())
        .unwrap();
    assert!(outcome.artifact.file_name.ends_with(".sh"));
    assert!(outcome.artifact.body.starts_with("#!/bin/sh\n"));
    assert!(!outcome.artifact.body.contains('\r'));
    assert_eq!(outcome.contacts[0].phone, "+51987654321");
}

#[test]
fn batch_without_usable_records_fails() {
    let engine = ArtifactEngine::default();
    assert!(matches!(
        engine.generate_sender(&[], "Normal (3-5s)", at()),
        Err(GenerationError::EmptyBatch)
    ));
    let err = engine
        .generate_sender(&[json!({"phone": "12"}), json!({"name": "Sin numero"})], "Normal (3-5s)", at())
        .unwrap_err();
    assert!(matches!(err, GenerationError::NoValidContacts { ref rejected } if rejected.len() == 2));
}

//=========================================================================================
// Store Snapshot
//=========================================================================================

struct FixedStore(Vec<Contact>);

#[async_trait]
impl ContactStore for FixedStore {
    async fn list_contacts(&self) -> PortResult<Vec<Contact>> {
        Ok(self.0.clone())
    }

    async fn get_contacts(&self, ids: &[String]) -> PortResult<Vec<Contact>> {
        ids.iter()
            .map(|id| {
                self.0
                    .iter()
                    .find(|c| &c.id == id)
                    .cloned()
                    .ok_or_else(|| PortError::NotFound(id.clone()))
            })
            .collect()
    }

    async fn save_contacts(&self, _contacts: &[Contact]) -> PortResult<()> {
        Ok(())
    }
}

fn stored(id: &str, status: ContactStatus) -> Contact {
    Contact {
        id: id.into(),
        name: format!("Contacto {id}"),
        phone: "+51987654321".into(),
        message: "Hola".into(),
        company: None,
        email: None,
        status,
    }
}

#[tokio::test]
async fn snapshot_defaults_to_pending_contacts() {
    let store = FixedStore(vec![
        stored("a", ContactStatus::Sent),
        stored("b", ContactStatus::Pending),
        stored("c", ContactStatus::Failed),
    ]);
    let raw = snapshot_contacts(&store, &[]).await.unwrap();
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0]["id"], "b");

    let raw = snapshot_contacts(&store, &["c".to_string(), "a".to_string()]).await.unwrap();
    assert_eq!(raw[0]["id"], "c");
    assert_eq!(raw[1]["id"], "a");

    let err = snapshot_contacts(&store, &["zz".to_string()]).await.unwrap_err();
    assert!(matches!(err, GenerationError::Port(PortError::NotFound(_))));
}

//=========================================================================================
// Diagnostics
//=========================================================================================

struct FirefoxWithBlockedPopups;

#[async_trait]
impl EnvironmentProbe for FirefoxWithBlockedPopups {
    async fn user_agent(&self) -> Option<String> {
        Some("Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0".into())
    }

    async fn platform(&self) -> Option<String> {
        Some("Win32".into())
    }

    async fn popups_allowed(&self) -> Option<bool> {
        Some(false)
    }

    async fn storage_available(&self) -> Option<bool> {
        Some(true)
    }

    async fn online(&self) -> Option<bool> {
        Some(false)
    }

    async fn memory_usage(&self) -> Option<MemoryUsage> {
        Some(MemoryUsage { used_mb: 120, limit_mb: Some(4096) })
    }

    async fn reach(&self, target: &ProbeTarget) -> HostCheck {
        HostCheck {
            name: target.name.clone(),
            host: target.host.clone(),
            essential: target.essential,
            reachable: false,
            latency_ms: None,
            error: Some("offline".into()),
        }
    }
}

#[tokio::test]
async fn diagnostics_score_is_clamped_and_packaged() {
    let targets = default_probe_targets(DEFAULT_CLIENT_URL);
    let report = run_diagnostics(&FirefoxWithBlockedPopups, &targets, at()).await;

    assert_eq!(report.facts.browser.family, BrowserFamily::Firefox);
    assert_eq!(report.score, 1.0);
    assert_eq!(report.verdict, Verdict::NeedsAttention);
    assert_eq!(report.facts.hosts.len(), targets.len());
    assert_eq!(report.next_steps.len(), 3);

    let artifact = ArtifactEngine::default().generate_diagnostics(&report, at());
    assert_eq!(artifact.kind, ArtifactKind::Diagnostics);
    assert_eq!(artifact.contact_count, 0);
    assert!(artifact.file_name.contains("_Diagnostics_"));
    assert!(artifact.body.contains("echo(Compatibilidad: 1/5\r\n"));
}
