//! Authorization gate and identity extractors for Axum.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use sessiongate_authn::{RequestIdentity, SESSION_COOKIE_NAME, SessionError};
use std::sync::Arc;

use super::{AppState, LOGIN_PATH, LOGOUT_PATH};
use crate::error::ApiError;

/// Middleware that authorizes every request except session login.
///
/// On success the verified [`RequestIdentity`] is stored in the request
/// extensions for [`RequireIdentity`] and [`OptionalIdentity`] to pick up.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if path == LOGIN_PATH {
        return next.run(request).await;
    }

    let value = jar.get(SESSION_COOKIE_NAME).map(|cookie| cookie.value());

    if path == LOGOUT_PATH {
        if value.is_some() {
            if let Ok(identity) = state.session.authorize(value).await {
                request.extensions_mut().insert(identity);
            }
        }
        return next.run(request).await;
    }

    match state.session.authorize(value).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(report) => ApiError::from(report).into_response(),
    }
}

/// Extractor for the identity attached by [`require_session`].
///
/// Rejects with 401 if the request was not authorized.
pub struct RequireIdentity(pub RequestIdentity);

impl<S> FromRequestParts<S> for RequireIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestIdentity>()
            .cloned()
            .map(RequireIdentity)
            .ok_or_else(|| {
                SessionError::Unauthenticated {
                    reason: "no identity attached to request".to_string(),
                }
                .into()
            })
    }
}

/// Extractor for optionally getting the attached identity.
///
/// Returns None if the request was not authorized.
pub struct OptionalIdentity(pub Option<RequestIdentity>);

impl<S> FromRequestParts<S> for OptionalIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match RequireIdentity::from_request_parts(parts, state).await {
            Ok(RequireIdentity(identity)) => Ok(OptionalIdentity(Some(identity))),
            Err(_) => Ok(OptionalIdentity(None)),
        }
    }
}
