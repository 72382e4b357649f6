//! Verified identity types produced by the identity verifier.
//!
//! An `IdentityAssertion` is the strongly-typed result of verifying a provider
//! token or a session value. Provider claims are parsed into it exactly once,
//! at the verifier boundary; nothing downstream sees raw claims.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The identity backend that authenticated a user.
///
/// Immutable once assigned to an application user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Provider {
    /// No recognised provider. Never produced by a successful verification.
    #[default]
    Unknown,
    /// Google sign-in.
    Google,
    /// Email and password sign-in.
    EmailAndPass,
    /// Facebook sign-in.
    Facebook,
}

impl Provider {
    /// Maps a provider sign-in method identifier to a `Provider`.
    ///
    /// The table is closed: an unmapped identifier returns `None`, and callers
    /// must treat that as a verification failure rather than defaulting.
    #[must_use]
    pub fn from_sign_in_method(method: &str) -> Option<Self> {
        match method {
            "google.com" => Some(Self::Google),
            "password" => Some(Self::EmailAndPass),
            "facebook.com" => Some(Self::Facebook),
            _ => None,
        }
    }

    /// Returns the stable wire and storage name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "",
            Self::Google => "GOOGLE",
            Self::EmailAndPass => "EMAIL_AND_PASS",
            Self::Facebook => "FACEBOOK",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored or transported provider name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProviderError {
    /// The unrecognised value.
    pub value: String,
}

impl fmt::Display for ParseProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown auth provider '{}'", self.value)
    }
}

impl std::error::Error for ParseProviderError {}

impl FromStr for Provider {
    type Err = ParseProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::Unknown),
            "GOOGLE" => Ok(Self::Google),
            "EMAIL_AND_PASS" => Ok(Self::EmailAndPass),
            "FACEBOOK" => Ok(Self::Facebook),
            other => Err(ParseProviderError {
                value: other.to_string(),
            }),
        }
    }
}

impl Serialize for Provider {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Provider {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Opaque user identifier assigned by an identity provider.
///
/// Unique only within a single provider's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderUserId(String);

impl ProviderUserId {
    /// Creates a provider user ID from a string.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ProviderUserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProviderUserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A verified identity claim for a single login or request.
///
/// `auth_time` is when the user originally signed in with the provider. It
/// does not advance when a session is renewed. Timestamps are kept at whole
/// second precision so assertions survive encoding unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAssertion {
    provider_user_id: ProviderUserId,
    email: String,
    provider: Provider,
    #[serde(with = "chrono::serde::ts_seconds")]
    auth_time: DateTime<Utc>,
}

impl IdentityAssertion {
    /// Creates an assertion, truncating `auth_time` to whole seconds.
    #[must_use]
    pub fn new(
        provider_user_id: ProviderUserId,
        email: String,
        provider: Provider,
        auth_time: DateTime<Utc>,
    ) -> Self {
        Self {
            provider_user_id,
            email,
            provider,
            auth_time: truncate_to_seconds(auth_time),
        }
    }

    /// Returns the provider-scoped user ID.
    #[must_use]
    pub fn provider_user_id(&self) -> &ProviderUserId {
        &self.provider_user_id
    }

    /// Returns the email address asserted by the provider.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the provider that authenticated the user.
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Returns when the original sign-in happened.
    #[must_use]
    pub fn auth_time(&self) -> DateTime<Utc> {
        self.auth_time
    }

    /// Returns the subset of the assertion that is safe to mirror to clients.
    #[must_use]
    pub fn user_info(&self) -> UserInfo {
        UserInfo {
            user_id: self.provider_user_id.clone(),
            email: self.email.clone(),
            auth_provider: self.provider,
        }
    }
}

/// The `{user_id, email, auth_provider}` tuple returned to clients after login.
///
/// `user_id` is the provider's ID, not the application user ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: ProviderUserId,
    pub email: String,
    pub auth_provider: Provider,
}

pub(crate) fn truncate_to_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(at.timestamp(), 0).single().unwrap_or(at)
}
