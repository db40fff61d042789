//! crates/outreach_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on. These traits
//! form the boundary of the hexagonal architecture: the engine never talks
//! to a database, a browser or the network directly.

use async_trait::async_trait;

use crate::domain::{Contact, HostCheck, MemoryUsage, ProbeTarget};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The operator's contact list, keyed by contact id. The engine only ever
/// reads snapshots from it.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Every stored contact, oldest first.
    async fn list_contacts(&self) -> PortResult<Vec<Contact>>;

    /// The contacts with the given ids, in the order the ids were given.
    /// Fails with `NotFound` when any id is unknown.
    async fn get_contacts(&self, ids: &[String]) -> PortResult<Vec<Contact>>;

    /// Inserts or replaces the given contacts by id.
    async fn save_contacts(&self, contacts: &[Contact]) -> PortResult<()>;
}

/// Capability probe over the operator's environment. Every method is
/// best-effort: `None` means the environment did not disclose the fact.
#[async_trait]
pub trait EnvironmentProbe: Send + Sync {
    async fn user_agent(&self) -> Option<String>;

    async fn platform(&self) -> Option<String>;

    /// Whether a trivial window could be opened and closed again.
    async fn popups_allowed(&self) -> Option<bool>;

    async fn storage_available(&self) -> Option<bool>;

    async fn online(&self) -> Option<bool>;

    async fn memory_usage(&self) -> Option<MemoryUsage>;

    /// Checks one host. Failures are reported inside the `HostCheck`.
    async fn reach(&self, target: &ProbeTarget) -> HostCheck;
}
