//! In-memory `Auth` double.

use async_trait::async_trait;
use chrono::Duration;
use rootcause::prelude::Report;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::auth::Auth;
use crate::clock::Clock;
use crate::error::VerifyError;
use crate::identity::{IdentityAssertion, ProviderUserId};
use crate::session::{PlainCodec, SessionCodec, SessionCookie};

/// An `Auth` whose tokens are JSON-encoded identity assertions.
///
/// Session values use the unsigned [`PlainCodec`] and expire against the
/// injected clock. Revocations are recorded rather than enforced.
#[derive(Debug, Clone, Default)]
pub struct FakeAuth {
    clock: Clock,
    revoked: Arc<Mutex<Vec<ProviderUserId>>>,
    fail_revocations: Arc<AtomicBool>,
}

impl FakeAuth {
    /// Creates a fake using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the clock used for session expiry.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Encodes `assertion` as a token `verify_token` accepts.
    #[must_use]
    pub fn token_for(assertion: &IdentityAssertion) -> String {
        serde_json::to_string(assertion).unwrap_or_default()
    }

    /// Returns the identities passed to `revoke`, in call order.
    #[must_use]
    pub fn revoked(&self) -> Vec<ProviderUserId> {
        self.revoked
            .lock()
            .map(|revoked| revoked.clone())
            .unwrap_or_default()
    }

    /// Makes `revoke` fail with `ProviderUnavailable`.
    pub fn fail_revocations(&self, fail: bool) {
        self.fail_revocations.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Auth for FakeAuth {
    async fn verify_token(&self, raw_token: &str) -> Result<IdentityAssertion, Report<VerifyError>> {
        let assertion = serde_json::from_str(raw_token).map_err(|e| VerifyError::InvalidToken {
            reason: e.to_string(),
        })?;
        Ok(assertion)
    }

    async fn issue_session_value(
        &self,
        assertion: &IdentityAssertion,
        ttl: Duration,
    ) -> Result<String, Report<VerifyError>> {
        PlainCodec.encode(&SessionCookie::new(
            assertion.clone(),
            self.clock.now() + ttl,
        ))
    }

    async fn verify_session_value(
        &self,
        value: &str,
    ) -> Result<IdentityAssertion, Report<VerifyError>> {
        let cookie = PlainCodec.decode(value)?;
        if cookie.is_expired_at(self.clock.now()) {
            return Err(VerifyError::SessionExpired.into());
        }
        Ok(cookie.into_assertion())
    }

    async fn revoke(&self, provider_user_id: &ProviderUserId) -> Result<(), Report<VerifyError>> {
        if self.fail_revocations.load(Ordering::SeqCst) {
            return Err(VerifyError::ProviderUnavailable {
                reason: "revocation disabled".to_string(),
            }
            .into());
        }
        if let Ok(mut revoked) = self.revoked.lock() {
            revoked.push(provider_user_id.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Provider;
    use chrono::{TimeZone, Utc};

    fn assertion() -> IdentityAssertion {
        IdentityAssertion::new(
            "user-id".into(),
            "test@example.com".to_string(),
            Provider::Google,
            Utc.timestamp_opt(123_456_000, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn token_round_trips_through_verify() {
        let auth = FakeAuth::new();
        let token = FakeAuth::token_for(&assertion());
        assert_eq!(auth.verify_token(&token).await.expect("verify"), assertion());
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let err = FakeAuth::new().verify_token("nope").await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            VerifyError::InvalidToken { .. }
        ));
    }

    #[tokio::test]
    async fn session_value_expires_against_clock() {
        let now = Utc.timestamp_opt(123_456_789, 0).unwrap();
        let issuer = FakeAuth::new().with_clock(Clock::fixed(now));
        let value = issuer
            .issue_session_value(&assertion(), Duration::seconds(60))
            .await
            .expect("issue");

        assert_eq!(
            issuer.verify_session_value(&value).await.expect("verify"),
            assertion()
        );

        let later = FakeAuth::new().with_clock(Clock::fixed(now + Duration::seconds(60)));
        let err = later.verify_session_value(&value).await.unwrap_err();
        assert!(matches!(err.current_context(), VerifyError::SessionExpired));
    }

    #[tokio::test]
    async fn revocations_are_recorded_or_fail_on_request() {
        let auth = FakeAuth::new();
        auth.revoke(&"u1".into()).await.expect("revoke");
        assert_eq!(auth.revoked(), vec![ProviderUserId::from("u1")]);

        auth.fail_revocations(true);
        assert!(auth.revoke(&"u2".into()).await.is_err());
        assert_eq!(auth.revoked().len(), 1);
    }
}
