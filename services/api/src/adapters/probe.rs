//! services/api/src/adapters/probe.rs
//!
//! An `EnvironmentProbe` for one diagnostics request. Browser facts come
//! from the request itself (user agent header plus what the UI measured);
//! host reachability is checked from the server with a TCP connect.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use outreach_core::domain::{HostCheck, MemoryUsage, ProbeTarget};
use outreach_core::ports::EnvironmentProbe;
use tokio::net::TcpStream;
use tracing::debug;

/// What the UI measured in the operator's browser. Every field is
/// optional; an absent field means the browser did not tell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientFacts {
    pub platform: Option<String>,
    pub popups_allowed: Option<bool>,
    pub storage_available: Option<bool>,
    pub online: Option<bool>,
    pub memory: Option<MemoryUsage>,
}

pub struct RequestProbe {
    user_agent: Option<String>,
    facts: ClientFacts,
    timeout: Duration,
}

impl RequestProbe {
    pub fn new(user_agent: Option<String>, facts: ClientFacts, timeout: Duration) -> Self {
        Self {
            user_agent,
            facts,
            timeout,
        }
    }
}

#[async_trait]
impl EnvironmentProbe for RequestProbe {
    async fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }

    async fn platform(&self) -> Option<String> {
        self.facts.platform.clone()
    }

    async fn popups_allowed(&self) -> Option<bool> {
        self.facts.popups_allowed
    }

    async fn storage_available(&self) -> Option<bool> {
        self.facts.storage_available
    }

    async fn online(&self) -> Option<bool> {
        self.facts.online
    }

    async fn memory_usage(&self) -> Option<MemoryUsage> {
        self.facts.memory
    }

    async fn reach(&self, target: &ProbeTarget) -> HostCheck {
        let started = Instant::now();
        let attempt = tokio::time::timeout(
            self.timeout,
            TcpStream::connect((target.host.as_str(), target.port)),
        )
        .await;

        let (reachable, error) = match attempt {
            Ok(Ok(_stream)) => (true, None),
            Ok(Err(e)) => (false, Some(e.to_string())),
            Err(_) => (false, Some(format!("timed out after {} ms", self.timeout.as_millis()))),
        };
        let latency_ms = reachable.then(|| u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX));
        debug!(host = %target.host, reachable, ?latency_ms, "Host probed.");

        HostCheck {
            name: target.name.clone(),
            host: target.host.clone(),
            essential: target.essential,
            reachable,
            latency_ms,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_reach_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let probe = RequestProbe::new(None, ClientFacts::default(), Duration::from_secs(2));

        let check = probe
            .reach(&ProbeTarget {
                name: "Local".into(),
                host: "127.0.0.1".into(),
                port,
                essential: true,
            })
            .await;
        assert!(check.reachable);
        assert!(check.latency_ms.is_some());
        assert!(check.error.is_none());
    }

    #[tokio::test]
    async fn test_reach_closed_port_reports_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let probe = RequestProbe::new(None, ClientFacts::default(), Duration::from_secs(2));

        let check = probe
            .reach(&ProbeTarget {
                name: "Closed".into(),
                host: "127.0.0.1".into(),
                port,
                essential: false,
            })
            .await;
        assert!(!check.reachable);
        assert!(check.error.is_some());
        assert_eq!(check.latency_ms, None);
    }

    #[tokio::test]
    async fn test_client_facts_pass_through() {
        let probe = RequestProbe::new(
            Some("agent".into()),
            ClientFacts {
                popups_allowed: Some(false),
                memory: Some(MemoryUsage { used_mb: 10, limit_mb: None }),
                ..ClientFacts::default()
            },
            Duration::from_millis(10),
        );
        assert_eq!(probe.user_agent().await.as_deref(), Some("agent"));
        assert_eq!(probe.popups_allowed().await, Some(false));
        assert_eq!(probe.online().await, None);
        assert_eq!(probe.memory_usage().await.map(|m| m.used_mb), Some(10));
    }
}
