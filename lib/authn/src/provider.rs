//! Identity provider configuration.
//!
//! Describes where provider ID tokens come from and how to check them:
//! the project they are issued for, and where the signing keys live.

use serde::{Deserialize, Serialize};

/// Configuration for the external identity provider.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// The provider project ID. ID tokens must carry it as their audience.
    project_id: String,
    /// URL of the JSON Web Key Set used to verify ID token signatures.
    #[serde(default = "default_jwks_url")]
    jwks_url: String,
    /// Issuer prefix; the expected issuer is this followed by the project ID.
    #[serde(default = "default_issuer_prefix")]
    issuer_prefix: String,
    /// How long fetched signing keys are reused before being refreshed.
    #[serde(default = "default_jwks_cache_seconds")]
    jwks_cache_seconds: u64,
    /// Minimum time between fetches triggered by an unknown key ID.
    #[serde(default = "default_jwks_min_refresh_seconds")]
    jwks_min_refresh_seconds: u64,
    /// Timeout for calls to the provider.
    #[serde(default = "default_http_timeout_seconds")]
    http_timeout_seconds: u64,
}

fn default_jwks_url() -> String {
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com"
        .to_string()
}

fn default_issuer_prefix() -> String {
    "https://securetoken.google.com/".to_string()
}

fn default_jwks_cache_seconds() -> u64 {
    3600
}

fn default_jwks_min_refresh_seconds() -> u64 {
    30
}

fn default_http_timeout_seconds() -> u64 {
    10
}

impl ProviderConfig {
    /// Creates a configuration for `project_id` with defaults elsewhere.
    #[must_use]
    pub fn new(project_id: String) -> Self {
        Self {
            project_id,
            jwks_url: default_jwks_url(),
            issuer_prefix: default_issuer_prefix(),
            jwks_cache_seconds: default_jwks_cache_seconds(),
            jwks_min_refresh_seconds: default_jwks_min_refresh_seconds(),
            http_timeout_seconds: default_http_timeout_seconds(),
        }
    }

    /// Overrides the JWKS URL.
    #[must_use]
    pub fn with_jwks_url(mut self, url: String) -> Self {
        self.jwks_url = url;
        self
    }

    /// Overrides the issuer prefix.
    #[must_use]
    pub fn with_issuer_prefix(mut self, prefix: String) -> Self {
        self.issuer_prefix = prefix;
        self
    }

    /// Overrides how long signing keys are cached, and how soon an unknown
    /// key ID may trigger another fetch.
    #[must_use]
    pub fn with_jwks_refresh(mut self, cache_seconds: u64, min_refresh_seconds: u64) -> Self {
        self.jwks_cache_seconds = cache_seconds;
        self.jwks_min_refresh_seconds = min_refresh_seconds;
        self
    }

    /// Returns the project ID.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Returns the JWKS URL.
    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Returns the issuer ID tokens must carry.
    #[must_use]
    pub fn issuer(&self) -> String {
        format!("{}{}", self.issuer_prefix, self.project_id)
    }

    /// Returns the audience ID tokens must carry.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.project_id
    }

    /// Returns the signing key cache lifetime.
    #[must_use]
    pub fn jwks_cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.jwks_cache_seconds)
    }

    /// Returns the minimum interval between key fetches caused by unknown
    /// key IDs.
    #[must_use]
    pub fn jwks_min_refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.jwks_min_refresh_seconds)
    }

    /// Returns the timeout for provider calls.
    #[must_use]
    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_seconds)
    }
}
