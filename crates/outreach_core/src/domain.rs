//! crates/outreach_core/src/domain.rs
//!
//! Defines the core data structures shared by every stage of artifact
//! generation. Nothing in here performs I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::policy::{self, DelayRange, RetryPolicy, SpeedTier, Timeouts};

/// A contact-like record as received from the contact store or the UI.
/// Field names vary between locales and schema versions, so the record is
/// kept as loosely typed JSON until the normalizer resolves it.
pub type RawContact = Value;

/// Where the messaging web client lives unless configured otherwise.
pub const DEFAULT_CLIENT_URL: &str = "https://web.whatsapp.com";

//=========================================================================================
// Contacts
//=========================================================================================

/// Delivery status as tracked by the external contact store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactStatus {
    #[default]
    Pending,
    Sent,
    Failed,
}

impl ContactStatus {
    /// Parses the status labels used across the store's schema versions.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "pending" | "pendiente" | "no" => Some(Self::Pending),
            "sent" | "enviado" | "si" | "sí" => Some(Self::Sent),
            "failed" | "fallido" | "error" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
        }
    }
}

/// The canonical recipient record.
///
/// After normalization `phone` is always `+<country code><digits>` with
/// 8 to 19 digits, and `name` and `message` are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub message: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub status: ContactStatus,
}

impl Contact {
    /// Re-expresses the contact with canonical field names so it can flow
    /// back through the normalizer.
    pub fn to_raw(&self) -> RawContact {
        let mut record = Map::new();
        record.insert("id".into(), Value::String(self.id.clone()));
        record.insert("name".into(), Value::String(self.name.clone()));
        record.insert("phone".into(), Value::String(self.phone.clone()));
        record.insert("message".into(), Value::String(self.message.clone()));
        if let Some(company) = &self.company {
            record.insert("company".into(), Value::String(company.clone()));
        }
        if let Some(email) = &self.email {
            record.insert("email".into(), Value::String(email.clone()));
        }
        record.insert("status".into(), Value::String(self.status.as_str().into()));
        Value::Object(record)
    }
}

//=========================================================================================
// Generation parameters
//=========================================================================================

/// Parameters for one artifact build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationConfig {
    pub speed_tier: SpeedTier,
    pub timestamp: DateTime<Utc>,
    pub delay: DelayRange,
    pub retry_policy: RetryPolicy,
    pub timeouts: Timeouts,
    pub client_url: String,
}

impl GenerationConfig {
    /// Builds the configuration for an operator-chosen tier label. Unknown
    /// labels resolve to the `Normal` tier.
    pub fn new(tier_label: &str, timestamp: DateTime<Utc>) -> Self {
        let policy = policy::resolve_policy(tier_label);
        Self {
            speed_tier: policy.tier,
            timestamp,
            delay: policy.delay,
            retry_policy: policy.retry,
            timeouts: policy.timeouts,
            client_url: DEFAULT_CLIENT_URL.to_string(),
        }
    }

    pub fn with_client_url(mut self, client_url: impl Into<String>) -> Self {
        self.client_url = client_url.into();
        self
    }
}

//=========================================================================================
// Artifacts
//=========================================================================================

/// What an artifact does once it runs on the operator's machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Sender,
    Diagnostics,
}

impl ArtifactKind {
    /// The segment used in artifact file names.
    pub fn file_segment(self) -> &'static str {
        match self {
            Self::Sender => "Sender",
            Self::Diagnostics => "Diagnostics",
        }
    }
}

/// The shell family the launcher script is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LauncherTarget {
    /// `cmd.exe` batch file, CRLF line endings.
    #[default]
    WindowsBatch,
    /// POSIX `sh` script, LF line endings.
    PosixShell,
}

impl LauncherTarget {
    pub fn extension(self) -> &'static str {
        match self {
            Self::WindowsBatch => "bat",
            Self::PosixShell => "sh",
        }
    }

    pub fn line_ending(self) -> &'static str {
        match self {
            Self::WindowsBatch => "\r\n",
            Self::PosixShell => "\n",
        }
    }
}

/// The MIME type handed to the download collaborator.
pub const ARTIFACT_MIME_HINT: &str = "text/plain";

/// A finished, self-contained launcher plus embedded program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub file_name: String,
    pub body: String,
    pub contact_count: usize,
    pub kind: ArtifactKind,
    pub target: LauncherTarget,
}

impl Artifact {
    pub fn size_bytes(&self) -> usize {
        self.body.len()
    }

    /// Turns the artifact into the one-shot command executed by whatever
    /// download mechanism the caller owns.
    pub fn into_download(self) -> DownloadCommand {
        DownloadCommand {
            file_name: self.file_name,
            body: self.body,
            mime_hint: ARTIFACT_MIME_HINT,
        }
    }
}

/// A fire-and-forget instruction to present `body` as a user-initiated
/// file save. The engine never observes whether it completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadCommand {
    pub file_name: String,
    pub body: String,
    pub mime_hint: &'static str,
}

//=========================================================================================
// Diagnostics
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserFamily {
    Chrome,
    Edge,
    Firefox,
    Safari,
    Unknown,
}

impl BrowserFamily {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Chrome => "Google Chrome",
            Self::Edge => "Microsoft Edge",
            Self::Firefox => "Mozilla Firefox",
            Self::Safari => "Safari",
            Self::Unknown => "Desconocido",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserInfo {
    pub family: BrowserFamily,
    pub major_version: Option<u32>,
    pub compatible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsFamily {
    Windows,
    MacOs,
    Linux,
    Unknown,
}

impl OsFamily {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::MacOs => "macOS",
            Self::Linux => "Linux",
            Self::Unknown => "Desconocido",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsInfo {
    pub family: OsFamily,
    pub version: Option<String>,
    pub architecture: Option<String>,
}

/// Browser memory figures in megabytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub used_mb: u64,
    pub limit_mb: Option<u64>,
}

/// A host whose reachability is probed during diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTarget {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub essential: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCheck {
    pub name: String,
    pub host: String,
    pub essential: bool,
    pub reachable: bool,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

/// Everything the hosting environment disclosed about itself. `None`
/// means the probe could not tell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentFacts {
    pub user_agent: Option<String>,
    pub browser: BrowserInfo,
    pub os: OsInfo,
    pub popups_allowed: Option<bool>,
    pub storage_available: Option<bool>,
    pub online: Option<bool>,
    pub memory: Option<MemoryUsage>,
    pub hosts: Vec<HostCheck>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemCategory {
    Browser,
    Network,
    Performance,
    Storage,
    System,
}

impl ProblemCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Browser => "Navegador",
            Self::Network => "Red",
            Self::Performance => "Rendimiento",
            Self::Storage => "Almacenamiento",
            Self::System => "Sistema",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Baja",
            Self::Medium => "Media",
            Self::High => "Alta",
            Self::Critical => "Critica",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub category: ProblemCategory,
    pub problem: String,
    pub severity: Severity,
    pub remedy: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Ready,
    MinorIssues,
    NeedsAttention,
}

/// A fixed remediation step shown regardless of what was detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextStep {
    pub priority: u8,
    pub title: String,
    pub description: String,
    pub command: String,
    pub link: Option<String>,
}

/// Scored summary of the operator's environment. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub generated_at: DateTime<Utc>,
    /// Compatibility on a 1 to 5 scale, in steps of 0.5.
    pub score: f32,
    pub verdict: Verdict,
    pub problems: Vec<Problem>,
    pub facts: EnvironmentFacts,
    pub next_steps: Vec<NextStep>,
}
