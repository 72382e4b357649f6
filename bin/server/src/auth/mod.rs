//! Session authentication for the sessiongate server.
//!
//! This module provides:
//! - The session login and logout routes
//! - The authorization gate in front of every other route
//! - Extractors for the verified request identity
//! - The production identity verifier
//!
//! # Request flow
//!
//! The gate runs before routing. The login path passes through untouched.
//! The logout path is soft-gated: a valid session attaches its identity so
//! logout can revoke it, but logout never rejects. Every other path needs a
//! valid `__session` cookie that resolves to a known user, and is rejected
//! with 401 (or 500 if the user is missing) before reaching its handler.

pub mod middleware;
pub mod routes;
pub mod verifier;

pub use middleware::{OptionalIdentity, RequireIdentity, require_session};
pub use routes::{session_login, session_logout};
pub use verifier::JwksVerifier;

use sessiongate_authn::SessionClient;

/// Path of the session login endpoint.
pub const LOGIN_PATH: &str = "/api/sessionLogin";

/// Path of the session logout endpoint.
pub const LOGOUT_PATH: &str = "/api/sessionLogout";

/// Shared application state.
pub struct AppState {
    /// Session client for login, logout, and authorization.
    pub session: SessionClient,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(session: SessionClient) -> Self {
        Self { session }
    }
}
