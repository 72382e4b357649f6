//! HTTP mapping for session errors.
//!
//! Bodies are always empty. Bad input and failed verification both map to
//! 401 so a caller cannot tell which part of a login failed; the detail is
//! only in the logs.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use rootcause::prelude::Report;
use sessiongate_authn::SessionError;

/// A session error on its way to becoming a response.
#[derive(Debug)]
pub struct ApiError(Report<SessionError>);

impl ApiError {
    /// Returns the underlying error.
    #[must_use]
    pub fn kind(&self) -> &SessionError {
        self.0.current_context()
    }

    /// Returns the status code this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.kind() {
            SessionError::BadRequest { .. } | SessionError::Unauthenticated { .. } => {
                StatusCode::UNAUTHORIZED
            }
            SessionError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            SessionError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl From<Report<SessionError>> for ApiError {
    fn from(report: Report<SessionError>) -> Self {
        Self(report)
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        Self(error.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            return (status, [(header::ALLOW, "POST")]).into_response();
        }
        status.into_response()
    }
}

/// Invalid HTTP layer settings, reported at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpConfigError {
    /// A configured CORS origin is not a valid header value.
    InvalidCorsOrigin { origin: String, reason: String },
}

impl std::fmt::Display for HttpConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCorsOrigin { origin, reason } => {
                write!(f, "invalid CORS origin '{origin}': {reason}")
            }
        }
    }
}

impl std::error::Error for HttpConfigError {}
