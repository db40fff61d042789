//! services/api/src/error.rs
//!
//! Defines the primary error type for the API service.

use crate::config::ConfigError;
use outreach_core::ports::PortError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An error that propagated up from one of the core ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Binding the listener or serving connections failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
