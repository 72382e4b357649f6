//! Session authentication for sessiongate.
//!
//! Turns short-lived identity provider tokens into long-lived session values
//! and binds each session to exactly one application user, creating the user
//! on first login.
//!
//! # Module Organization
//!
//! - [`identity`]: Provider tags, provider user IDs, identity assertions
//! - [`user`]: Application users and their mutations
//! - [`session`]: Session cookies and the codecs that carry them
//! - [`auth`]: The identity verifier capability and request identity
//! - [`store`]: The transactional store capability
//! - [`client`]: Login, logout, and authorization
//! - [`provider`]: Identity provider configuration
//! - [`clock`]: Injectable wall clock
//! - [`testing`]: In-memory test doubles
//! - [`error`]: Error types

pub mod auth;
pub mod client;
pub mod clock;
pub mod error;
pub mod identity;
pub mod provider;
pub mod session;
pub mod store;
pub mod testing;
pub mod user;

pub use auth::{Auth, RequestIdentity};
pub use client::{LoginOutcome, LoginRequest, MAX_SIGN_IN_AGE_SECS, SessionClient};
pub use clock::Clock;
pub use error::{SessionError, StoreError, VerifyError};
pub use identity::{IdentityAssertion, ParseProviderError, Provider, ProviderUserId, UserInfo};
pub use provider::ProviderConfig;
pub use session::{
    PlainCodec, SESSION_COOKIE_NAME, SESSION_TTL_SECS, SessionCodec, SessionCookie, SignedCodec,
    session_ttl,
};
pub use store::{Store, Transaction, run_transaction};
pub use user::{DEFAULT_USER_NAME, NewUser, User, UserMutation};
