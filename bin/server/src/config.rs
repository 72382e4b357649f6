//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from an optional `sessiongate.toml` and
//! environment variables. Nested keys use `__` as the separator, so
//! `PROVIDER__PROJECT_ID` sets `provider.project_id`.
//!
//! See [`ProviderConfig`] for identity provider configuration.

use serde::Deserialize;
use sessiongate_authn::ProviderConfig;

/// Minimum length of the session signing secret, in bytes.
pub const MIN_SIGNING_SECRET_LEN: usize = 32;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address to listen on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Enables verbose logging.
    #[serde(default)]
    pub debug: bool,

    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Comma-separated origins allowed to make credentialed requests.
    #[serde(default)]
    pub allowed_cors_origins: String,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Whether to apply pending migrations on startup.
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,

    /// Identity provider configuration.
    pub provider: ProviderConfig,

    /// Session signing configuration.
    pub session: SessionSecretConfig,
}

/// Session signing configuration.
#[derive(Clone, Deserialize)]
pub struct SessionSecretConfig {
    /// HMAC secret for session values. At least 32 bytes.
    pub signing_secret: String,
}

impl std::fmt::Debug for SessionSecretConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSecretConfig")
            .field("signing_secret", &"[redacted]")
            .finish()
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_filter() -> String {
    "info,tower_http=debug".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_run_migrations() -> bool {
    true
}

impl ServerConfig {
    /// Loads configuration from `sessiongate.toml` (if present) and
    /// environment variables, which take precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(config::File::with_name("sessiongate").required(false))
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error if the signing secret is too short.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.session.signing_secret.len() < MIN_SIGNING_SECRET_LEN {
            return Err(config::ConfigError::Message(format!(
                "session.signing_secret must be at least {MIN_SIGNING_SECRET_LEN} bytes"
            )));
        }
        Ok(())
    }

    /// Returns the tracing filter to use when `RUST_LOG` is unset.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_filter
        }
    }

    /// Returns the configured CORS origins.
    #[must_use]
    pub fn cors_origins(&self) -> Vec<String> {
        self.allowed_cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(ToString::to_string)
            .collect()
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }
}
