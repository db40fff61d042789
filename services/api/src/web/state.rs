//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use outreach_core::diagnostics::default_probe_targets;
use outreach_core::domain::ProbeTarget;
use outreach_core::engine::ArtifactEngine;
use outreach_core::ports::ContactStore;

use crate::config::Config;

/// The shared application state, created once at startup and passed to all
/// handlers. Nothing in it is mutated per request.
#[derive(Clone)]
pub struct AppState {
    pub contacts: Arc<dyn ContactStore>,
    pub config: Arc<Config>,
    pub engine: Arc<ArtifactEngine>,
    /// Hosts whose reachability diagnostics reports.
    pub diagnostic_hosts: Arc<[ProbeTarget]>,
}

impl AppState {
    pub fn new(contacts: Arc<dyn ContactStore>, config: Arc<Config>) -> Self {
        let engine = Arc::new(ArtifactEngine::new(config.engine_options()));
        let diagnostic_hosts = default_probe_targets(&config.client_url).into();
        Self {
            contacts,
            config,
            engine,
            diagnostic_hosts,
        }
    }

    pub fn with_diagnostic_hosts(mut self, targets: Vec<ProbeTarget>) -> Self {
        self.diagnostic_hosts = targets.into();
        self
    }
}

/// In-memory state with no reachability targets, so tests stay offline.
#[cfg(test)]
pub(crate) fn test_state() -> Arc<AppState> {
    Arc::new(test_state_with_targets(Vec::new()))
}

#[cfg(test)]
pub(crate) fn test_state_with_targets(targets: Vec<ProbeTarget>) -> AppState {
    use crate::adapters::MemoryContactStore;

    let config = Config::from_lookup(|name| (name == "PROBE_TIMEOUT_MS").then(|| "50".to_string()))
        .unwrap_or_else(|e| panic!("test config: {e}"));
    AppState::new(Arc::new(MemoryContactStore::new()), Arc::new(config)).with_diagnostic_hosts(targets)
}
