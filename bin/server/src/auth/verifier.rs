//! Production identity verifier.
//!
//! ID tokens are RS256 JWTs issued by the identity provider and checked
//! against its published JSON Web Key Set. Session values are issued and
//! verified locally with [`SignedCodec`]; revocation records a per-identity
//! instant before which sessions are no longer accepted.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use rootcause::prelude::Report;
use serde::Deserialize;
use sessiongate_authn::{
    Auth, Clock, IdentityAssertion, MAX_SIGN_IN_AGE_SECS, Provider, ProviderConfig,
    ProviderUserId, SessionCodec, SessionCookie, SignedCodec, VerifyError, session_ttl,
};
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Claims carried by a provider ID token.
///
/// Only the claims used to build an [`IdentityAssertion`] are modelled;
/// `iss`, `aud`, and `exp` are checked by `jsonwebtoken` during decoding.
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    sub: String,
    auth_time: Option<i64>,
    #[serde(default)]
    firebase: ProviderClaims,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderClaims {
    #[serde(default)]
    sign_in_provider: String,
    #[serde(default)]
    identities: HashMap<String, serde_json::Value>,
}

impl IdTokenClaims {
    fn into_assertion(self) -> Result<IdentityAssertion, Report<VerifyError>> {
        if self.sub.is_empty() {
            return Err(VerifyError::MissingClaim {
                claim: "sub".to_string(),
            }
            .into());
        }
        let auth_time = parse_auth_time(self.auth_time)?;
        let provider = Provider::from_sign_in_method(&self.firebase.sign_in_provider).ok_or_else(
            || VerifyError::UnknownProvider {
                sign_in_method: self.firebase.sign_in_provider.clone(),
            },
        )?;
        let email = parse_email(&self.firebase.identities)?;

        Ok(IdentityAssertion::new(
            ProviderUserId::new(self.sub),
            email,
            provider,
            auth_time,
        ))
    }
}

fn parse_auth_time(auth_time: Option<i64>) -> Result<DateTime<Utc>, Report<VerifyError>> {
    let secs = auth_time.ok_or_else(|| VerifyError::MissingClaim {
        claim: "auth_time".to_string(),
    })?;
    Ok(
        DateTime::from_timestamp(secs, 0).ok_or_else(|| VerifyError::InvalidToken {
            reason: format!("'auth_time' {secs} is out of range"),
        })?,
    )
}

/// Extracts the single email identity.
fn parse_email(
    identities: &HashMap<String, serde_json::Value>,
) -> Result<String, Report<VerifyError>> {
    let value = identities
        .get("email")
        .ok_or_else(|| VerifyError::MissingClaim {
            claim: "firebase.identities.email".to_string(),
        })?;
    let emails = value.as_array().ok_or_else(|| VerifyError::InvalidToken {
        reason: format!("'email' identities had unexpected type: {value}"),
    })?;
    match emails.as_slice() {
        [serde_json::Value::String(email)] => Ok(email.clone()),
        [other] => Err(VerifyError::InvalidToken {
            reason: format!("'email' identity had unexpected type: {other}"),
        }
        .into()),
        _ => Err(VerifyError::InvalidToken {
            reason: format!("expected exactly one email identity, got {}", emails.len()),
        }
        .into()),
    }
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Verifies provider ID tokens against the provider's JWKS and manages
/// locally signed session values.
pub struct JwksVerifier {
    config: ProviderConfig,
    http: reqwest::Client,
    keys: RwLock<Option<CachedKeys>>,
    codec: SignedCodec,
    revoked_before: RwLock<HashMap<ProviderUserId, DateTime<Utc>>>,
    clock: Clock,
}

impl JwksVerifier {
    /// Creates a verifier for `config` that signs sessions with `secret`.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError::ProviderUnavailable` if the HTTP client cannot
    /// be built.
    pub fn new(config: ProviderConfig, secret: &[u8]) -> Result<Self, Report<VerifyError>> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| VerifyError::ProviderUnavailable {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            config,
            http,
            keys: RwLock::new(None),
            codec: SignedCodec::new(secret),
            revoked_before: RwLock::new(HashMap::new()),
            clock: Clock::system(),
        })
    }

    /// Replaces the clock used for session expiry and revocation.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.config.issuer()]);
        validation.set_audience(&[self.config.audience()]);
        validation
    }

    /// Returns the decoding key for `kid`, refreshing the key set if it is
    /// stale or does not know the key.
    ///
    /// An unknown key ID only triggers a fetch once the cached set is at
    /// least `jwks_min_refresh_interval` old.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, Report<VerifyError>> {
        {
            let cached = self.keys.read().await;
            if let Some(cached) = cached.as_ref() {
                let age = cached.fetched_at.elapsed();
                if age < self.config.jwks_cache_ttl() {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return decoding_key_from(jwk);
                    }
                    if age < self.config.jwks_min_refresh_interval() {
                        warn!(kid, "unknown signing key, keys were refreshed recently");
                        return Err(unknown_key(kid).into());
                    }
                }
            }
        }

        let keys = self.fetch_keys().await?;
        let key = keys.find(kid).map(decoding_key_from);
        *self.keys.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
        key.unwrap_or_else(|| Err(unknown_key(kid).into()))
    }

    #[instrument(skip(self), fields(url = %self.config.jwks_url()))]
    async fn fetch_keys(&self) -> Result<JwkSet, Report<VerifyError>> {
        let unavailable = |e: reqwest::Error| VerifyError::ProviderUnavailable {
            reason: e.to_string(),
        };
        let keys: JwkSet = self
            .http
            .get(self.config.jwks_url())
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json()
            .await
            .map_err(unavailable)?;
        debug!(keys = keys.keys.len(), "fetched provider signing keys");
        Ok(keys)
    }
}

fn unknown_key(kid: &str) -> VerifyError {
    VerifyError::InvalidToken {
        reason: format!("no signing key with ID '{kid}'"),
    }
}

/// Drops revocation cutoffs that can no longer reject a live session.
///
/// A session rejected by `cutoff` was signed in before it, so it was issued
/// at most `MAX_SIGN_IN_AGE_SECS` later and expired one session lifetime
/// after that.
fn prune_revocations(revoked: &mut HashMap<ProviderUserId, DateTime<Utc>>, now: DateTime<Utc>) {
    let horizon = now - session_ttl() - Duration::seconds(MAX_SIGN_IN_AGE_SECS);
    revoked.retain(|_, cutoff| *cutoff > horizon);
}

fn decoding_key_from(jwk: &jsonwebtoken::jwk::Jwk) -> Result<DecodingKey, Report<VerifyError>> {
    Ok(DecodingKey::from_jwk(jwk).map_err(|e| VerifyError::InvalidToken {
        reason: format!("unusable signing key: {e}"),
    })?)
}

#[async_trait]
impl Auth for JwksVerifier {
    async fn verify_token(&self, raw_token: &str) -> Result<IdentityAssertion, Report<VerifyError>> {
        let header =
            jsonwebtoken::decode_header(raw_token).map_err(|e| VerifyError::InvalidToken {
                reason: e.to_string(),
            })?;
        let kid = header.kid.ok_or_else(|| VerifyError::MissingClaim {
            claim: "kid".to_string(),
        })?;
        let key = self.decoding_key(&kid).await?;
        let data = jsonwebtoken::decode::<IdTokenClaims>(raw_token, &key, &self.validation())
            .map_err(|e| VerifyError::InvalidToken {
                reason: e.to_string(),
            })?;
        data.claims.into_assertion()
    }

    async fn issue_session_value(
        &self,
        assertion: &IdentityAssertion,
        ttl: Duration,
    ) -> Result<String, Report<VerifyError>> {
        self.codec.encode(&SessionCookie::new(
            assertion.clone(),
            self.clock.now() + ttl,
        ))
    }

    async fn verify_session_value(
        &self,
        value: &str,
    ) -> Result<IdentityAssertion, Report<VerifyError>> {
        let cookie = self.codec.decode(value)?;
        if cookie.is_expired_at(self.clock.now()) {
            return Err(VerifyError::SessionExpired.into());
        }
        let assertion = cookie.into_assertion();
        let revoked = self.revoked_before.read().await;
        if let Some(cutoff) = revoked.get(assertion.provider_user_id()) {
            if assertion.auth_time() < *cutoff {
                return Err(VerifyError::Revoked {
                    provider_user_id: assertion.provider_user_id().to_string(),
                }
                .into());
            }
        }
        Ok(assertion)
    }

    async fn revoke(&self, provider_user_id: &ProviderUserId) -> Result<(), Report<VerifyError>> {
        let now = self.clock.now();
        let cutoff = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        let mut revoked = self.revoked_before.write().await;
        prune_revocations(&mut revoked, now);
        revoked.insert(provider_user_id.clone(), cutoff);
        info!(user_id = %provider_user_id, "revoked sessions");
        Ok(())
    }
}
