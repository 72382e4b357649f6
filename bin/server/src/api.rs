//! Routes for the signed-in user's own account.
//!
//! These sit behind the authorization gate and read the identity it
//! attached.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rootcause::prelude::ResultExt;
use serde::{Deserialize, Serialize};
use sessiongate_authn::{
    DEFAULT_USER_NAME, Provider, SessionError, Store, User, UserMutation, run_transaction,
};
use sessiongate_core::UserId;
use std::sync::Arc;
use tracing::error;

use crate::auth::{AppState, RequireIdentity};
use crate::error::ApiError;

/// Returns the account routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(me))
        .route("/api/me/name", post(set_name))
}

/// The signed-in user's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub auth_provider: Provider,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            id: user.id(),
            name: user.name().to_string(),
            email: user.email().to_string(),
            created_at: user.created_at(),
            auth_provider: user.provider(),
        }
    }
}

/// Body of `POST /api/me/name`.
#[derive(Debug, Deserialize)]
pub struct SetNameRequest {
    pub name: String,
}

fn internal(reason: &str) -> SessionError {
    SessionError::Internal {
        reason: reason.to_string(),
    }
}

/// Returns the signed-in user's account.
pub async fn me(
    State(state): State<Arc<AppState>>,
    RequireIdentity(identity): RequireIdentity,
) -> Result<Json<Profile>, ApiError> {
    let user = state
        .session
        .store()
        .user(identity.user_id())
        .await
        .inspect_err(|report| {
            error!(user_id = %identity.user_id(), error = %report, "failed to load user");
        })
        .context(internal("failed to load user"))?
        .ok_or_else(|| {
            error!(user_id = %identity.user_id(), "authorized user does not exist");
            ApiError::from(internal("authorized user does not exist"))
        })?;
    Ok(Json(user.into()))
}

/// Changes the signed-in user's display name.
///
/// A blank name resets it to the placeholder.
pub async fn set_name(
    State(state): State<Arc<AppState>>,
    RequireIdentity(identity): RequireIdentity,
    Json(request): Json<SetNameRequest>,
) -> Result<Json<Profile>, ApiError> {
    let name = match request.name.trim() {
        "" => DEFAULT_USER_NAME.to_string(),
        name => name.to_string(),
    };
    let user_id = identity.user_id();

    let user = run_transaction(state.session.store().as_ref(), move |tx| {
        Box::pin(async move {
            tx.update_user(user_id, &[UserMutation::SetName(name)])
                .await
        })
    })
    .await
    .inspect_err(|report| {
        error!(user_id = %user_id, error = %report, "failed to update user name");
    })
    .context(internal("failed to update user name"))?;
    Ok(Json(user.into()))
}
