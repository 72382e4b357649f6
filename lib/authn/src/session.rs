//! Session cookie values and the codecs that carry them.
//!
//! A `SessionCookie` is an identity assertion plus an expiry. It is never
//! stored server-side; it only exists inside the opaque, cookie-safe string
//! produced by a `SessionCodec`. Every codec satisfies
//! `decode(encode(x)) == x`.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::VerifyError;
use crate::identity::{IdentityAssertion, Provider, ProviderUserId, truncate_to_seconds};

/// Name of the session cookie. Fixed: clients depend on it.
pub const SESSION_COOKIE_NAME: &str = "__session";

/// Lifetime of an issued session, in seconds (14 days).
pub const SESSION_TTL_SECS: i64 = 60 * 60 * 24 * 14;

/// Lifetime of an issued session.
#[must_use]
pub fn session_ttl() -> Duration {
    Duration::seconds(SESSION_TTL_SECS)
}

/// The logical content of a session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    assertion: IdentityAssertion,
    #[serde(with = "chrono::serde::ts_seconds")]
    expires_at: DateTime<Utc>,
}

impl SessionCookie {
    /// Creates a session cookie, truncating `expires_at` to whole seconds.
    #[must_use]
    pub fn new(assertion: IdentityAssertion, expires_at: DateTime<Utc>) -> Self {
        Self {
            assertion,
            expires_at: truncate_to_seconds(expires_at),
        }
    }

    /// Returns the embedded identity assertion.
    #[must_use]
    pub fn assertion(&self) -> &IdentityAssertion {
        &self.assertion
    }

    /// Consumes the cookie, returning the identity assertion.
    #[must_use]
    pub fn into_assertion(self) -> IdentityAssertion {
        self.assertion
    }

    /// Returns when the session stops being valid.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the session has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Reversible transform between a `SessionCookie` and a cookie-safe string.
pub trait SessionCodec: Send + Sync {
    /// Serialises the cookie into an opaque, cookie-safe value.
    fn encode(&self, cookie: &SessionCookie) -> Result<String, Report<VerifyError>>;

    /// Parses a value produced by `encode`.
    fn decode(&self, value: &str) -> Result<SessionCookie, Report<VerifyError>>;
}

/// Unsigned codec: URL-safe base64 over JSON.
///
/// Offers no integrity protection. Used by test doubles and local tooling
/// where the verifier itself is trusted.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl SessionCodec for PlainCodec {
    fn encode(&self, cookie: &SessionCookie) -> Result<String, Report<VerifyError>> {
        let json = serde_json::to_vec(cookie).map_err(|e| VerifyError::Encoding {
            reason: e.to_string(),
        })?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    fn decode(&self, value: &str) -> Result<SessionCookie, Report<VerifyError>> {
        let bytes = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|e| VerifyError::InvalidToken {
                reason: format!("session value is not base64: {e}"),
            })?;
        let cookie = serde_json::from_slice(&bytes).map_err(|e| VerifyError::InvalidToken {
            reason: format!("session value is not a session cookie: {e}"),
        })?;
        Ok(cookie)
    }
}

/// JWT claims carrying a session cookie.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    email: String,
    provider: Provider,
    auth_time: i64,
    exp: i64,
}

/// HS256-signed codec.
///
/// Expiry is part of the payload but is not enforced here; the verifier
/// checks it against its own clock so decoding stays a pure function.
#[derive(Clone)]
pub struct SignedCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SignedCodec {
    /// Creates a codec that signs with `secret`.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl fmt::Debug for SignedCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedCodec").finish_non_exhaustive()
    }
}

impl SessionCodec for SignedCodec {
    fn encode(&self, cookie: &SessionCookie) -> Result<String, Report<VerifyError>> {
        let assertion = cookie.assertion();
        let claims = SessionClaims {
            sub: assertion.provider_user_id().to_string(),
            email: assertion.email().to_string(),
            provider: assertion.provider(),
            auth_time: assertion.auth_time().timestamp(),
            exp: cookie.expires_at().timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| VerifyError::Encoding {
                reason: e.to_string(),
            })?;
        Ok(token)
    }

    fn decode(&self, value: &str) -> Result<SessionCookie, Report<VerifyError>> {
        let data = jsonwebtoken::decode::<SessionClaims>(value, &self.decoding_key, &self.validation)
            .map_err(|e| VerifyError::InvalidToken {
                reason: e.to_string(),
            })?;
        let claims = data.claims;

        let auth_time = timestamp(claims.auth_time, "auth_time")?;
        let expires_at = timestamp(claims.exp, "exp")?;
        let assertion = IdentityAssertion::new(
            ProviderUserId::new(claims.sub),
            claims.email,
            claims.provider,
            auth_time,
        );
        Ok(SessionCookie::new(assertion, expires_at))
    }
}

fn timestamp(secs: i64, claim: &str) -> Result<DateTime<Utc>, Report<VerifyError>> {
    Ok(Utc
        .timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| VerifyError::InvalidToken {
            reason: format!("'{claim}' is out of range"),
        })?)
}
