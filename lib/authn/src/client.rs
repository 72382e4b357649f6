//! The session client: login, logout, and per-request authorization.
//!
//! Composes the identity verifier (`Auth`) and the transactional store
//! (`Store`) into the three decisions the HTTP layer needs. Nothing here
//! knows about HTTP; the server maps `SessionError` to status codes and
//! handles cookies.

use chrono::Duration;
use rootcause::prelude::{Report, ResultExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use crate::auth::{Auth, RequestIdentity};
use crate::clock::Clock;
use crate::error::{SessionError, StoreError};
use crate::identity::{IdentityAssertion, UserInfo};
use crate::session::session_ttl;
use crate::store::{Store, run_transaction};
use crate::user::{NewUser, User};

/// How long after the original sign-in an ID token may be exchanged for a
/// session, in seconds.
pub const MAX_SIGN_IN_AGE_SECS: i64 = 5 * 60;

/// The body of a session login request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    /// Display name to use if this login creates the user.
    #[serde(default)]
    pub name: Option<String>,
    /// The provider-issued ID token.
    #[serde(rename = "idToken", default)]
    pub id_token: String,
    /// Sent by clients; not currently checked.
    #[serde(rename = "csrfToken", default)]
    pub csrf_token: String,
}

impl LoginRequest {
    /// Parses a JSON request body.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::BadRequest` if the body is not valid JSON or
    /// carries no ID token.
    pub fn parse(body: &[u8]) -> Result<Self, Report<SessionError>> {
        let request: Self = serde_json::from_slice(body)
            .context(SessionError::bad_request("failed to parse login request"))?;
        if request.id_token.is_empty() {
            return Err(SessionError::bad_request("no ID token was provided in the request").into());
        }
        Ok(request)
    }
}

/// The result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Opaque value for the session cookie.
    pub session_value: String,
    /// Lifetime of the session cookie.
    pub max_age: Duration,
    /// The resolved or newly created application user.
    pub user: User,
    /// The identity tuple that may be returned to the client.
    pub user_info: UserInfo,
}

/// Orchestrates login, logout, and authorization.
#[derive(Clone)]
pub struct SessionClient {
    auth: Arc<dyn Auth>,
    store: Arc<dyn Store>,
    clock: Clock,
}

impl SessionClient {
    /// Creates a session client using the system clock.
    #[must_use]
    pub fn new(auth: Arc<dyn Auth>, store: Arc<dyn Store>) -> Self {
        Self {
            auth,
            store,
            clock: Clock::system(),
        }
    }

    /// Replaces the clock used for the freshness check.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the store this client resolves users against.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Exchanges a fresh provider ID token for a session.
    ///
    /// Verifies the token, rejects sign-ins older than five minutes, gets or
    /// creates the application user in one transaction, then issues a
    /// session value valid for fourteen days. An existing user's name is
    /// left alone.
    ///
    /// # Errors
    ///
    /// - `SessionError::Unauthenticated` if the token fails verification or
    ///   the sign-in is stale
    /// - `SessionError::Internal` if user resolution or session issuance
    ///   fails after verification succeeded
    #[instrument(skip_all)]
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginOutcome, Report<SessionError>> {
        let assertion = self
            .auth
            .verify_token(&request.id_token)
            .await
            .inspect_err(|report| warn!(error = %report, "failed to verify ID token"))
            .context(SessionError::unauthenticated("ID token failed verification"))?;

        let sign_in_age = self.clock.now() - assertion.auth_time();
        if sign_in_age > Duration::seconds(MAX_SIGN_IN_AGE_SECS) {
            warn!(
                sign_in_age_secs = sign_in_age.num_seconds(),
                user_id = %assertion.provider_user_id(),
                "sign in was older than five minutes ago"
            );
            return Err(SessionError::unauthenticated("sign-in is too old").into());
        }

        let name = request.name.as_deref().unwrap_or_default();
        let user = self
            .resolve_user(&assertion, name)
            .await
            .inspect_err(|report| {
                error!(
                    user_id = %assertion.provider_user_id(),
                    auth_provider = %assertion.provider(),
                    error = %report,
                    "failed to create/retrieve user"
                );
            })
            .context(SessionError::internal("failed to create/retrieve user"))?;

        let max_age = session_ttl();
        let session_value = self
            .auth
            .issue_session_value(&assertion, max_age)
            .await
            .inspect_err(|report| error!(error = %report, "failed to create a session value"))
            .context(SessionError::internal("failed to create a session value"))?;

        Ok(LoginOutcome {
            session_value,
            max_age,
            user_info: assertion.user_info(),
            user,
        })
    }

    /// Best-effort revocation of the caller's provider sessions.
    ///
    /// Never fails: the caller clears the cookie regardless. Without an
    /// identity there is nothing to revoke.
    #[instrument(skip_all)]
    pub async fn logout(&self, identity: Option<&RequestIdentity>) {
        let Some(identity) = identity else {
            error!("no user info found for logout, skipping revocation");
            return;
        };
        let provider_user_id = identity.assertion().provider_user_id();
        if let Err(report) = self.auth.revoke(provider_user_id).await {
            error!(
                user_id = %provider_user_id,
                error = %report,
                "failed to revoke provider refresh tokens"
            );
        }
    }

    /// Verifies a session value and resolves the application user it
    /// belongs to.
    ///
    /// The lookup runs outside any transaction.
    ///
    /// # Errors
    ///
    /// - `SessionError::Unauthenticated` if the value is absent, empty, or
    ///   fails verification
    /// - `SessionError::Internal` if the user cannot be loaded, since a
    ///   valid session implies the user exists
    #[instrument(skip_all)]
    pub async fn authorize(
        &self,
        session_value: Option<&str>,
    ) -> Result<RequestIdentity, Report<SessionError>> {
        let value = match session_value {
            None => {
                warn!("session cookie was not found");
                return Err(SessionError::unauthenticated("session cookie was not found").into());
            }
            Some("") => {
                warn!("session cookie was empty");
                return Err(SessionError::unauthenticated("session cookie was empty").into());
            }
            Some(value) => value,
        };

        let assertion = self
            .auth
            .verify_session_value(value)
            .await
            .inspect_err(|report| warn!(error = %report, "request had invalid session cookie"))
            .context(SessionError::unauthenticated("session cookie failed verification"))?;

        debug!(
            user_id = %assertion.provider_user_id(),
            auth_provider = %assertion.provider(),
            "verified session cookie"
        );

        let lookup = self
            .store
            .find_user_by_identity(assertion.provider(), assertion.provider_user_id())
            .await;
        let user = match lookup {
            Ok(Some(user)) => user,
            Ok(None) => {
                error!(
                    user_id = %assertion.provider_user_id(),
                    auth_provider = %assertion.provider(),
                    "no user for valid session cookie"
                );
                return Err(SessionError::internal("no user for valid session").into());
            }
            Err(report) => {
                error!(
                    user_id = %assertion.provider_user_id(),
                    auth_provider = %assertion.provider(),
                    error = %report,
                    "failed to load user by auth provider, user had valid session cookie"
                );
                return Err(report.context(SessionError::internal("failed to load user")));
            }
        };

        Ok(RequestIdentity::new(assertion, user.id()))
    }

    /// Gets or creates the user for `assertion`.
    ///
    /// A conflicting concurrent first login surfaces as
    /// `StoreError::AlreadyExists`, either from `create_user` or from the
    /// commit. Both mean another request created the user, so the lookup is
    /// repeated: inside the transaction first, then once outside it.
    async fn resolve_user(
        &self,
        assertion: &IdentityAssertion,
        name: &str,
    ) -> Result<User, Report<StoreError>> {
        let new_user = NewUser::from_assertion(assertion, name);
        let provider = new_user.provider;
        let provider_user_id = new_user.provider_user_id.clone();

        let result = run_transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let provider = new_user.provider;
                let provider_user_id = new_user.provider_user_id.clone();
                if let Some(user) = tx.find_user_by_identity(provider, &provider_user_id).await? {
                    return Ok(user);
                }
                match tx.create_user(new_user).await {
                    Err(report) if is_conflict(&report) => tx
                        .find_user_by_identity(provider, &provider_user_id)
                        .await?
                        .ok_or(report),
                    other => other,
                }
            })
        })
        .await;

        match result {
            Err(report) if is_conflict(&report) => {
                warn!(
                    user_id = %provider_user_id,
                    auth_provider = %provider,
                    "user was created concurrently, reloading"
                );
                self.store
                    .find_user_by_identity(provider, &provider_user_id)
                    .await?
                    .ok_or(report)
            }
            other => other,
        }
    }
}

fn is_conflict(report: &Report<StoreError>) -> bool {
    matches!(report.current_context(), StoreError::AlreadyExists { .. })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Provider, ProviderUserId};
    use crate::store::Transaction;
    use crate::testing::{FakeAuth, MemoryStore};
    use crate::error::VerifyError;
    use crate::user::{DEFAULT_USER_NAME, UserMutation};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use futures::FutureExt;
    use sessiongate_core::UserId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(123_456_789, 0).unwrap()
    }

    fn assertion(provider_user_id: &str, auth_time: DateTime<Utc>) -> IdentityAssertion {
        IdentityAssertion::new(
            provider_user_id.into(),
            "test@example.com".to_string(),
            Provider::Google,
            auth_time,
        )
    }

    fn login_request(assertion: &IdentityAssertion, name: &str) -> LoginRequest {
        LoginRequest {
            name: Some(name.to_string()),
            id_token: FakeAuth::token_for(assertion),
            csrf_token: String::new(),
        }
    }

    fn client(store: Arc<dyn Store>) -> (SessionClient, FakeAuth) {
        let auth = FakeAuth::new().with_clock(Clock::fixed(now()));
        let client = SessionClient::new(Arc::new(auth.clone()), store).with_clock(Clock::fixed(now()));
        (client, auth)
    }

    fn kind(report: &Report<SessionError>) -> &SessionError {
        report.current_context()
    }

    /// Whether the lower-level error is kept beneath the session error.
    fn caused_by<C: 'static>(report: &Report<SessionError>) -> bool {
        report
            .iter_reports()
            .skip(1)
            .any(|child| child.downcast_current_context::<C>().is_some())
    }

    #[test]
    fn parse_accepts_full_body() {
        let request =
            LoginRequest::parse(br#"{"name":"Alice","idToken":"tok","csrfToken":"csrf"}"#)
                .expect("parse");
        assert_eq!(request.name.as_deref(), Some("Alice"));
        assert_eq!(request.id_token, "tok");
        assert_eq!(request.csrf_token, "csrf");
    }

    #[test]
    fn parse_allows_missing_name() {
        let request = LoginRequest::parse(br#"{"idToken":"tok"}"#).expect("parse");
        assert_eq!(request.name, None);
    }

    #[test]
    fn parse_rejects_bad_bodies() {
        let bodies: [&[u8]; 4] = [b"", b"not json", br#"{"name":"Alice"}"#, br#"{"idToken":""}"#];
        for body in bodies {
            let err = LoginRequest::parse(body).unwrap_err();
            assert!(matches!(kind(&err), SessionError::BadRequest { .. }));
        }
    }

    #[tokio::test]
    async fn first_login_creates_exactly_one_user() {
        let store = MemoryStore::new();
        let (client, _) = client(Arc::new(store.clone()));
        let assertion = assertion("u1", now() - Duration::seconds(5));

        let outcome = client
            .login(&login_request(&assertion, "Alice"))
            .await
            .expect("login");

        assert_eq!(store.user_count(), 1);
        assert_eq!(outcome.user.email(), "test@example.com");
        assert_eq!(outcome.user.name(), "Alice");
        assert_eq!(outcome.user.provider(), Provider::Google);
        assert_eq!(outcome.user.provider_user_id().as_str(), "u1");
        assert_eq!(outcome.max_age, Duration::days(14));
        assert_eq!(outcome.user_info, assertion.user_info());
        store.assert_no_open_transactions();
    }

    #[tokio::test]
    async fn session_value_verifies_back_to_the_assertion() {
        let store = MemoryStore::new();
        let (client, auth) = client(Arc::new(store.clone()));
        let assertion = assertion("u1", now() - Duration::seconds(5));

        let outcome = client
            .login(&login_request(&assertion, ""))
            .await
            .expect("login");

        assert_eq!(
            auth.verify_session_value(&outcome.session_value)
                .await
                .expect("verify"),
            assertion
        );
    }

    #[tokio::test]
    async fn empty_name_uses_placeholder() {
        let store = MemoryStore::new();
        let (client, _) = client(Arc::new(store.clone()));
        let assertion = assertion("u1", now());

        let request = LoginRequest {
            name: None,
            ..login_request(&assertion, "")
        };
        let outcome = client.login(&request).await.expect("login");
        assert_eq!(outcome.user.name(), DEFAULT_USER_NAME);
    }

    #[tokio::test]
    async fn repeat_login_resolves_same_user_without_renaming() {
        let store = MemoryStore::new();
        let (client, _) = client(Arc::new(store.clone()));
        let assertion = assertion("u1", now() - Duration::seconds(5));

        let first = client
            .login(&login_request(&assertion, "Alice"))
            .await
            .expect("first login");
        let second = client
            .login(&login_request(&assertion, "Someone Else"))
            .await
            .expect("second login");

        assert_eq!(first.user.id(), second.user.id());
        assert_eq!(second.user.name(), "Alice");
        assert_eq!(store.user_count(), 1);
        store.assert_no_open_transactions();
    }

    #[tokio::test]
    async fn same_provider_id_under_another_provider_is_a_different_user() {
        let store = MemoryStore::new();
        let (client, _) = client(Arc::new(store.clone()));
        let google = assertion("u1", now());
        let facebook = IdentityAssertion::new(
            "u1".into(),
            "test@example.com".to_string(),
            Provider::Facebook,
            now(),
        );

        let a = client.login(&login_request(&google, "")).await.expect("login");
        let b = client.login(&login_request(&facebook, "")).await.expect("login");

        assert_ne!(a.user.id(), b.user.id());
        assert_eq!(store.user_count(), 2);
    }

    #[tokio::test]
    async fn freshness_boundary() {
        let store = MemoryStore::new();
        let (client, _) = client(Arc::new(store.clone()));

        let stale = assertion("stale", now() - Duration::minutes(5) - Duration::seconds(1));
        let err = client
            .login(&login_request(&stale, ""))
            .await
            .unwrap_err();
        assert!(matches!(kind(&err), SessionError::Unauthenticated { .. }));

        let exact = assertion("exact", now() - Duration::minutes(5));
        client
            .login(&login_request(&exact, ""))
            .await
            .expect("exactly five minutes is accepted");

        let fresh = assertion("fresh", now() - Duration::minutes(4) - Duration::seconds(59));
        client
            .login(&login_request(&fresh, ""))
            .await
            .expect("fresh login");

        assert!(
            store
                .find_user_by_identity(Provider::Google, &"stale".into())
                .await
                .expect("lookup")
                .is_none()
        );
        store.assert_no_open_transactions();
    }

    #[tokio::test]
    async fn invalid_token_is_unauthenticated() {
        let store = MemoryStore::new();
        let (client, _) = client(Arc::new(store.clone()));
        let request = LoginRequest {
            id_token: "this won't decode".to_string(),
            ..LoginRequest::default()
        };

        let err = client.login(&request).await.unwrap_err();
        assert!(matches!(kind(&err), SessionError::Unauthenticated { .. }));
        assert!(caused_by::<VerifyError>(&err));
        assert_eq!(store.user_count(), 0);
        assert_eq!(store.open_transactions(), 0);
    }

    #[tokio::test]
    async fn storage_failure_after_verification_is_internal() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let (client, _) = client(Arc::new(store.clone()));

        let err = client
            .login(&login_request(&assertion("u1", now()), ""))
            .await
            .unwrap_err();
        assert!(matches!(kind(&err), SessionError::Internal { .. }));
        assert!(caused_by::<StoreError>(&err));
        store.assert_no_open_transactions();
    }

    /// A store whose transactions never see committed users, simulating a
    /// concurrent first login that committed after this one looked.
    struct StaleReads(MemoryStore);

    struct StaleTransaction(Box<dyn Transaction>);

    #[async_trait]
    impl Store for StaleReads {
        async fn begin(&self) -> Result<Box<dyn Transaction>, Report<StoreError>> {
            Ok(Box::new(StaleTransaction(self.0.begin().await?)))
        }

        async fn find_user_by_identity(
            &self,
            provider: Provider,
            provider_user_id: &ProviderUserId,
        ) -> Result<Option<User>, Report<StoreError>> {
            self.0.find_user_by_identity(provider, provider_user_id).await
        }

        async fn user(&self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
            self.0.user(id).await
        }

        async fn users(&self) -> Result<Vec<User>, Report<StoreError>> {
            self.0.users().await
        }
    }

    #[async_trait]
    impl Transaction for StaleTransaction {
        async fn find_user_by_identity(
            &mut self,
            _provider: Provider,
            _provider_user_id: &ProviderUserId,
        ) -> Result<Option<User>, Report<StoreError>> {
            Ok(None)
        }

        async fn user(&mut self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
            self.0.user(id).await
        }

        async fn create_user(&mut self, new_user: NewUser) -> Result<User, Report<StoreError>> {
            self.0.create_user(new_user).await
        }

        async fn update_user(
            &mut self,
            id: UserId,
            mutations: &[UserMutation],
        ) -> Result<User, Report<StoreError>> {
            self.0.update_user(id, mutations).await
        }

        async fn commit(self: Box<Self>) -> Result<(), Report<StoreError>> {
            self.0.commit().await
        }

        async fn rollback(self: Box<Self>) -> Result<(), Report<StoreError>> {
            self.0.rollback().await
        }
    }

    #[tokio::test]
    async fn concurrent_creation_conflict_resolves_to_existing_user() {
        let memory = MemoryStore::new();
        let existing = NewUser::from_assertion(&assertion("u1", now()), "First").into_user(now());
        memory.insert(existing.clone()).expect("insert");

        let (client, _) = client(Arc::new(StaleReads(memory.clone())));
        let outcome = client
            .login(&login_request(&assertion("u1", now()), "Second"))
            .await
            .expect("login");

        assert_eq!(outcome.user, existing);
        assert_eq!(memory.user_count(), 1);
        memory.assert_no_open_transactions();
    }

    #[tokio::test]
    async fn concurrent_first_logins_create_one_user() {
        let store = MemoryStore::new();
        let (client, _) = client(Arc::new(store.clone()));
        let request = login_request(&assertion("u1", now()), "");

        let (a, b) = tokio::join!(client.login(&request), client.login(&request));
        let (a, b) = (a.expect("first"), b.expect("second"));

        assert_eq!(a.user.id(), b.user.id());
        assert_eq!(store.user_count(), 1);
        store.assert_no_open_transactions();
    }

    /// Counts `verify_token` calls and otherwise defers to `FakeAuth`.
    struct CountingAuth {
        inner: FakeAuth,
        verifications: AtomicUsize,
    }

    #[async_trait]
    impl Auth for CountingAuth {
        async fn verify_token(
            &self,
            raw_token: &str,
        ) -> Result<IdentityAssertion, Report<VerifyError>> {
            self.verifications.fetch_add(1, Ordering::SeqCst);
            self.inner.verify_token(raw_token).await
        }

        async fn issue_session_value(
            &self,
            assertion: &IdentityAssertion,
            ttl: Duration,
        ) -> Result<String, Report<VerifyError>> {
            self.inner.issue_session_value(assertion, ttl).await
        }

        async fn verify_session_value(
            &self,
            value: &str,
        ) -> Result<IdentityAssertion, Report<VerifyError>> {
            self.inner.verify_session_value(value).await
        }

        async fn revoke(
            &self,
            provider_user_id: &ProviderUserId,
        ) -> Result<(), Report<VerifyError>> {
            self.inner.revoke(provider_user_id).await
        }
    }

    #[tokio::test]
    async fn login_verifies_the_id_token_once() {
        let auth = Arc::new(CountingAuth {
            inner: FakeAuth::new().with_clock(Clock::fixed(now())),
            verifications: AtomicUsize::new(0),
        });
        let store = MemoryStore::new();
        let client = SessionClient::new(auth.clone(), Arc::new(store.clone()))
            .with_clock(Clock::fixed(now()));
        let assertion = assertion("u1", now() - Duration::seconds(5));

        let outcome = client
            .login(&login_request(&assertion, ""))
            .await
            .expect("login");

        assert_eq!(auth.verifications.load(Ordering::SeqCst), 1);
        assert_eq!(
            auth.verify_session_value(&outcome.session_value)
                .await
                .expect("verify"),
            assertion
        );
    }

    /// A store whose commits suspend once before completing.
    struct SlowCommits(MemoryStore);

    struct SlowCommit(Box<dyn Transaction>);

    #[async_trait]
    impl Store for SlowCommits {
        async fn begin(&self) -> Result<Box<dyn Transaction>, Report<StoreError>> {
            Ok(Box::new(SlowCommit(self.0.begin().await?)))
        }

        async fn find_user_by_identity(
            &self,
            provider: Provider,
            provider_user_id: &ProviderUserId,
        ) -> Result<Option<User>, Report<StoreError>> {
            self.0.find_user_by_identity(provider, provider_user_id).await
        }

        async fn user(&self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
            self.0.user(id).await
        }

        async fn users(&self) -> Result<Vec<User>, Report<StoreError>> {
            self.0.users().await
        }
    }

    #[async_trait]
    impl Transaction for SlowCommit {
        async fn find_user_by_identity(
            &mut self,
            provider: Provider,
            provider_user_id: &ProviderUserId,
        ) -> Result<Option<User>, Report<StoreError>> {
            self.0.find_user_by_identity(provider, provider_user_id).await
        }

        async fn user(&mut self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
            self.0.user(id).await
        }

        async fn create_user(&mut self, new_user: NewUser) -> Result<User, Report<StoreError>> {
            self.0.create_user(new_user).await
        }

        async fn update_user(
            &mut self,
            id: UserId,
            mutations: &[UserMutation],
        ) -> Result<User, Report<StoreError>> {
            self.0.update_user(id, mutations).await
        }

        async fn commit(self: Box<Self>) -> Result<(), Report<StoreError>> {
            tokio::task::yield_now().await;
            self.0.commit().await
        }

        async fn rollback(self: Box<Self>) -> Result<(), Report<StoreError>> {
            self.0.rollback().await
        }
    }

    #[tokio::test]
    async fn cancelled_login_leaves_no_user_behind() {
        let memory = MemoryStore::new();
        let (client, _) = client(Arc::new(SlowCommits(memory.clone())));
        let request = login_request(&assertion("u1", now()), "");

        // Dropped while suspended in commit.
        assert!(client.login(&request).now_or_never().is_none());
        assert_eq!(memory.user_count(), 0);

        let outcome = client.login(&request).await.expect("retried login");
        assert_eq!(memory.user_count(), 1);
        assert_eq!(outcome.user.provider_user_id().as_str(), "u1");
    }

    #[tokio::test]
    async fn authorize_resolves_application_user() {
        let store = MemoryStore::new();
        let (client, _) = client(Arc::new(store.clone()));
        let assertion = assertion("u1", now());
        let outcome = client
            .login(&login_request(&assertion, ""))
            .await
            .expect("login");

        let identity = client
            .authorize(Some(&outcome.session_value))
            .await
            .expect("authorize");
        assert_eq!(identity.user_id(), outcome.user.id());
        assert_eq!(identity.assertion(), &assertion);
    }

    #[tokio::test]
    async fn authorize_rejects_missing_empty_and_invalid_values() {
        let (client, _) = client(Arc::new(MemoryStore::new()));
        for value in [None, Some(""), Some("garbage")] {
            let err = client.authorize(value).await.unwrap_err();
            assert!(matches!(kind(&err), SessionError::Unauthenticated { .. }));
        }
    }

    #[tokio::test]
    async fn authorize_without_user_is_internal() {
        let (client, auth) = client(Arc::new(MemoryStore::new()));
        let value = auth
            .issue_session_value(&assertion("ghost", now()), session_ttl())
            .await
            .expect("issue");

        let err = client.authorize(Some(&value)).await.unwrap_err();
        assert!(matches!(kind(&err), SessionError::Internal { .. }));
    }

    #[tokio::test]
    async fn logout_revokes_only_with_identity() {
        let (client, auth) = client(Arc::new(MemoryStore::new()));

        client.logout(None).await;
        assert!(auth.revoked().is_empty());

        let identity = RequestIdentity::new(assertion("u1", now()), UserId::new());
        client.logout(Some(&identity)).await;
        assert_eq!(auth.revoked(), vec![ProviderUserId::from("u1")]);
    }

    #[tokio::test]
    async fn logout_swallows_revocation_failure() {
        let (client, auth) = client(Arc::new(MemoryStore::new()));
        auth.fail_revocations(true);

        let identity = RequestIdentity::new(assertion("u1", now()), UserId::new());
        client.logout(Some(&identity)).await;
        assert!(auth.revoked().is_empty());
    }
}
