//! Router assembly.

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::any,
};
use rootcause::prelude::Report;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::{self, AppState, LOGIN_PATH, LOGOUT_PATH};
use crate::config::ServerConfig;
use crate::error::HttpConfigError;

/// Builds the application router: session routes, `routes`, and the
/// authorization gate in front of all of them.
///
/// Login and logout accept any method so that non-POST requests get a 405
/// from the handler rather than the router.
pub fn router(state: Arc<AppState>, routes: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route(LOGIN_PATH, any(auth::session_login))
        .route(LOGOUT_PATH, any(auth::session_logout))
        .merge(routes)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_session,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds the CORS policy for credentialed browser requests.
///
/// # Errors
///
/// Returns `HttpConfigError::InvalidCorsOrigin` for the first origin that
/// is not a valid header value.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, Report<HttpConfigError>> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| HttpConfigError::InvalidCorsOrigin {
                origin: origin.clone(),
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_credentials(true)
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::HEAD,
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request()))
}

/// Wraps `router` with the HTTP layers configured in `config`.
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
pub fn with_http_layers(
    router: Router,
    config: &ServerConfig,
) -> Result<Router, Report<HttpConfigError>> {
    Ok(router
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors_layer(&config.cors_origins())?))
}
