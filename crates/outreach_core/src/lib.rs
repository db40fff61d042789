pub mod delivery;
pub mod diagnostics;
pub mod domain;
pub mod engine;
pub mod normalizer;
pub mod packager;
pub mod personalize;
pub mod policy;
pub mod ports;
pub mod program;
pub mod sanitizer;

pub use domain::{
    Artifact, ArtifactKind, Contact, ContactStatus, DiagnosticsReport, DownloadCommand,
    EnvironmentFacts, GenerationConfig, LauncherTarget, RawContact,
};
pub use engine::{ArtifactEngine, EngineOptions, GenerationError, GenerationOutcome};
pub use ports::{ContactStore, EnvironmentProbe, PortError, PortResult};
