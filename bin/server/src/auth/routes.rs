//! Session login and logout routes.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::Method,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sessiongate_authn::{LoginRequest, SESSION_COOKIE_NAME, SessionError, UserInfo};
use std::sync::Arc;
use time::Duration as TimeDuration;
use tracing::warn;

use super::{AppState, OptionalIdentity};
use crate::error::ApiError;

/// Builds the session cookie. Name and attributes are fixed; clients
/// depend on them.
fn session_cookie(value: String, max_age: TimeDuration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(max_age)
        .build()
}

fn require_post(method: &Method) -> Result<(), ApiError> {
    if *method == Method::POST {
        return Ok(());
    }
    warn!(http_method = %method, "session request had invalid HTTP method - only POST is supported");
    Err(SessionError::MethodNotAllowed {
        method: method.to_string(),
    }
    .into())
}

/// Exchanges a fresh ID token for a session cookie.
///
/// Body: `{"name"?, "idToken", "csrfToken"}`. Responds with the caller's
/// `{user_id, email, auth_provider}`.
pub async fn session_login(
    State(state): State<Arc<AppState>>,
    method: Method,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<UserInfo>), ApiError> {
    require_post(&method)?;

    let request = LoginRequest::parse(&body).inspect_err(|report| {
        warn!(error = %report, "failed to decode session login request");
    })?;
    let outcome = state.session.login(&request).await?;

    let cookie = session_cookie(
        outcome.session_value,
        TimeDuration::seconds(outcome.max_age.num_seconds()),
    );
    Ok((jar.add(cookie), Json(outcome.user_info)))
}

/// Clears the session cookie and revokes the session if one was attached.
///
/// Always succeeds for POST.
pub async fn session_logout(
    State(state): State<Arc<AppState>>,
    method: Method,
    OptionalIdentity(identity): OptionalIdentity,
    jar: CookieJar,
) -> Result<CookieJar, ApiError> {
    require_post(&method)?;

    let jar = jar.add(session_cookie(String::new(), TimeDuration::seconds(-1)));
    state.session.logout(identity.as_ref()).await;
    Ok(jar)
}
