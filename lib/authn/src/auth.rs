//! The identity verifier capability and the per-request identity it yields.

use async_trait::async_trait;
use chrono::Duration;
use rootcause::prelude::Report;
use sessiongate_core::UserId;

use crate::error::VerifyError;
use crate::identity::{IdentityAssertion, ProviderUserId};

/// A backing identity provider that verifies credentials and manages
/// session values.
///
/// Implementations must be safe for concurrent use and must honour
/// cancellation: dropping a returned future abandons the call.
#[async_trait]
pub trait Auth: Send + Sync {
    /// Verifies a provider-issued credential token.
    async fn verify_token(&self, raw_token: &str) -> Result<IdentityAssertion, Report<VerifyError>>;

    /// Mints a long-lived session value carrying `assertion`, valid for
    /// `ttl`.
    ///
    /// The assertion is embedded as given; the credential it came from is
    /// not verified again.
    async fn issue_session_value(
        &self,
        assertion: &IdentityAssertion,
        ttl: Duration,
    ) -> Result<String, Report<VerifyError>>;

    /// Verifies a session value previously returned by `issue_session_value`.
    async fn verify_session_value(
        &self,
        value: &str,
    ) -> Result<IdentityAssertion, Report<VerifyError>>;

    /// Invalidates outstanding sessions and refresh material for an identity.
    ///
    /// Best-effort from the caller's point of view.
    async fn revoke(&self, provider_user_id: &ProviderUserId) -> Result<(), Report<VerifyError>>;
}

/// The verified identity attached to an in-flight request.
///
/// Built by the authorization middleware, read by downstream handlers, and
/// dropped when the request ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    assertion: IdentityAssertion,
    user_id: UserId,
}

impl RequestIdentity {
    /// Creates a request identity.
    #[must_use]
    pub fn new(assertion: IdentityAssertion, user_id: UserId) -> Self {
        Self { assertion, user_id }
    }

    /// Returns the verified identity assertion.
    #[must_use]
    pub fn assertion(&self) -> &IdentityAssertion {
        &self.assertion
    }

    /// Returns the resolved application user ID.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
