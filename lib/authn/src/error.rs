//! Error types for the authn crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `VerifyError`: failures at the identity verifier boundary
//! - `StoreError`: failures at the storage boundary
//! - `SessionError`: the outward taxonomy of the session client, which the
//!   HTTP layer maps to status codes

use std::fmt;

/// Errors from verifying provider tokens or session values.
///
/// The session client collapses all of these into
/// `SessionError::Unauthenticated`; the detail only reaches logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// Token is malformed, has a bad signature, or fails claim validation.
    InvalidToken { reason: String },
    /// The provider's sign-in method is not in the supported table.
    UnknownProvider { sign_in_method: String },
    /// A required claim is absent.
    MissingClaim { claim: String },
    /// The session value is past its expiry.
    SessionExpired,
    /// The identity's sessions were revoked after this sign-in.
    Revoked { provider_user_id: String },
    /// The provider could not be reached or returned an unexpected response.
    ProviderUnavailable { reason: String },
    /// A session value could not be produced.
    Encoding { reason: String },
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken { reason } => write!(f, "invalid token: {reason}"),
            Self::UnknownProvider { sign_in_method } => {
                write!(f, "no auth provider found for '{sign_in_method}'")
            }
            Self::MissingClaim { claim } => write!(f, "missing required claim: {claim}"),
            Self::SessionExpired => write!(f, "session has expired"),
            Self::Revoked { provider_user_id } => {
                write!(f, "sessions for '{provider_user_id}' were revoked")
            }
            Self::ProviderUnavailable { reason } => {
                write!(f, "identity provider unavailable: {reason}")
            }
            Self::Encoding { reason } => write!(f, "failed to encode session value: {reason}"),
        }
    }
}

impl std::error::Error for VerifyError {}

/// Errors from the transactional store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested entity does not exist.
    NotFound { entity: &'static str, id: String },
    /// A user already exists for this provider identity.
    ///
    /// Raised by the storage-level uniqueness constraint. Callers resolving a
    /// login treat it as "someone else created it first" and re-read.
    AlreadyExists {
        provider: String,
        provider_user_id: String,
    },
    /// The backing storage failed.
    Backend { details: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { entity, id } => {
                write!(f, "entity of type '{entity}' with ID '{id}' was not found")
            }
            Self::AlreadyExists {
                provider,
                provider_user_id,
            } => write!(
                f,
                "user already exists for provider '{provider}' and ID '{provider_user_id}'"
            ),
            Self::Backend { details } => write!(f, "storage error: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Outcome taxonomy of session operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The client sent malformed input.
    BadRequest { reason: String },
    /// The credential or session is invalid, absent, or stale.
    Unauthenticated { reason: String },
    /// The system failed after the client proved a valid credential.
    Internal { reason: String },
    /// The wrong HTTP verb was used.
    MethodNotAllowed { method: String },
}

impl SessionError {
    pub(crate) fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest {
            reason: reason.into(),
        }
    }

    pub(crate) fn unauthenticated(reason: impl Into<String>) -> Self {
        Self::Unauthenticated {
            reason: reason.into(),
        }
    }

    pub(crate) fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest { reason } => write!(f, "bad request: {reason}"),
            Self::Unauthenticated { reason } => write!(f, "unauthenticated: {reason}"),
            Self::Internal { reason } => write!(f, "internal error: {reason}"),
            Self::MethodNotAllowed { method } => {
                write!(f, "HTTP method {method} is not allowed")
            }
        }
    }
}

impl std::error::Error for SessionError {}
