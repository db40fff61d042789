//! services/api/src/config.rs
//!
//! Defines the service configuration and how it is loaded.
//!
//! All configuration comes from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;

use outreach_core::domain::{LauncherTarget, DEFAULT_CLIENT_URL};
use outreach_core::engine::EngineOptions;
use outreach_core::normalizer::NormalizeOptions;
use outreach_core::packager::{EmbeddingStrategy, PackagerOptions, DEFAULT_ARTIFACT_PREFIX};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// PostgreSQL contact store. `None` keeps contacts in memory.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub default_country_prefix: String,
    pub artifact_prefix: String,
    pub launcher_target: LauncherTarget,
    pub embedding: EmbeddingStrategy,
    pub client_url: String,
    pub cors_origin: String,
    pub probe_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// A `.env` file in the current directory is honored outside of tests.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let invalid = |name: &str, reason: String| ConfigError::InvalidValue(name.to_string(), reason);

        let bind_address = var("BIND_ADDRESS")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDRESS", e.to_string()))?;

        let database_url = var("DATABASE_URL");

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| invalid("RUST_LOG", format!("'{log_level_str}' is not a valid log level")))?;

        let default_country_prefix = var("DEFAULT_COUNTRY_PREFIX")
            .map(|value| value.trim().trim_start_matches('+').to_string())
            .unwrap_or_else(|| NormalizeOptions::default().default_country_prefix);
        if !(1..=3).contains(&default_country_prefix.len())
            || !default_country_prefix.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid(
                "DEFAULT_COUNTRY_PREFIX",
                format!("'{default_country_prefix}' is not a 1 to 3 digit calling code"),
            ));
        }

        let artifact_prefix = var("ARTIFACT_PREFIX").unwrap_or_else(|| DEFAULT_ARTIFACT_PREFIX.to_string());

        let launcher_target = match var("LAUNCHER_TARGET").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("windows") | Some("bat") => LauncherTarget::WindowsBatch,
            Some("posix") | Some("sh") | Some("unix") => LauncherTarget::PosixShell,
            Some(other) => {
                return Err(invalid("LAUNCHER_TARGET", format!("'{other}' is not 'windows' or 'posix'")))
            }
        };

        let embedding = match var("EMBEDDING").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("lines") => EmbeddingStrategy::Lines,
            Some("base64") => EmbeddingStrategy::Base64,
            Some(other) => return Err(invalid("EMBEDDING", format!("'{other}' is not 'lines' or 'base64'"))),
        };

        let client_url = var("CLIENT_URL").unwrap_or_else(|| DEFAULT_CLIENT_URL.to_string());
        if !client_url.starts_with("https://") && !client_url.starts_with("http://") {
            return Err(invalid("CLIENT_URL", format!("'{client_url}' is not an http(s) URL")));
        }

        let cors_origin = var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        let probe_timeout_ms = var("PROBE_TIMEOUT_MS")
            .unwrap_or_else(|| "1500".to_string())
            .parse::<u64>()
            .map_err(|e| invalid("PROBE_TIMEOUT_MS", e.to_string()))?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            default_country_prefix,
            artifact_prefix,
            launcher_target,
            embedding,
            client_url,
            cors_origin,
            probe_timeout: Duration::from_millis(probe_timeout_ms),
        })
    }

    /// The engine settings this configuration implies.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            normalize: NormalizeOptions {
                default_country_prefix: self.default_country_prefix.clone(),
            },
            packager: PackagerOptions {
                prefix: self.artifact_prefix.clone(),
                target: self.launcher_target,
                embedding: self.embedding,
            },
            client_url: self.client_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.default_country_prefix, "51");
        assert_eq!(config.launcher_target, LauncherTarget::WindowsBatch);
        assert_eq!(config.embedding, EmbeddingStrategy::Lines);
        assert_eq!(config.probe_timeout, Duration::from_millis(1500));
        assert_eq!(config.engine_options(), EngineOptions::default());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("LAUNCHER_TARGET", "POSIX"),
            ("EMBEDDING", "base64"),
            ("DEFAULT_COUNTRY_PREFIX", "+52"),
            ("DATABASE_URL", "postgres://localhost/outreach"),
        ])
        .unwrap();
        assert_eq!(config.launcher_target, LauncherTarget::PosixShell);
        assert_eq!(config.embedding, EmbeddingStrategy::Base64);
        assert_eq!(config.default_country_prefix, "52");
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/outreach"));
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        for (name, value) in [
            ("BIND_ADDRESS", "nowhere"),
            ("RUST_LOG", "loud"),
            ("DEFAULT_COUNTRY_PREFIX", "5x"),
            ("LAUNCHER_TARGET", "amiga"),
            ("EMBEDDING", "zip"),
            ("CLIENT_URL", "web.whatsapp.com"),
            ("PROBE_TIMEOUT_MS", "-1"),
        ] {
            match load(&[(name, value)]) {
                Err(ConfigError::InvalidValue(var, _)) => assert_eq!(var, name),
                Ok(_) => panic!("{name}={value} was accepted"),
            }
        }
    }
}
