//! Queries against the `user_account` table.

use chrono::{DateTime, Utc};
use sessiongate_authn::{Provider, ProviderUserId, StoreError, User};
use sessiongate_core::{Result, UserId};
use sqlx::{FromRow, PgExecutor};
use std::str::FromStr;

use super::backend;

const USER_COLUMNS: &str =
    "id, name, email, created_at, auth_provider_type, auth_provider_id";

/// Row type for user queries.
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    id: String,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
    auth_provider_type: String,
    auth_provider_id: String,
}

impl UserRow {
    pub(crate) fn try_into_user(self) -> Result<User, StoreError> {
        let id = UserId::from_str(&self.id).map_err(|e| StoreError::Backend {
            details: format!("invalid user id '{}': {e}", self.id),
        })?;
        let provider = Provider::from_str(&self.auth_provider_type).map_err(|e| {
            StoreError::Backend {
                details: format!("user '{}': {e}", self.id),
            }
        })?;
        Ok(User::with_all_fields(
            id,
            self.name,
            self.email,
            self.created_at,
            provider,
            ProviderUserId::new(self.auth_provider_id),
        ))
    }
}

fn into_user(row: Option<UserRow>) -> Result<Option<User>, StoreError> {
    row.map(UserRow::try_into_user).transpose()
}

/// Finds a user by provider identity.
pub(crate) async fn find_by_identity<'e, E: PgExecutor<'e>>(
    executor: E,
    provider: Provider,
    provider_user_id: &ProviderUserId,
) -> Result<Option<User>, StoreError> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM user_account \
         WHERE auth_provider_type = $1 AND auth_provider_id = $2"
    ))
    .bind(provider.as_str())
    .bind(provider_user_id.as_str())
    .fetch_optional(executor)
    .await
    .map_err(backend)?;
    into_user(row)
}

/// Finds a user by ID.
pub(crate) async fn find_by_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: UserId,
) -> Result<Option<User>, StoreError> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM user_account WHERE id = $1"
    ))
    .bind(id.to_string())
    .fetch_optional(executor)
    .await
    .map_err(backend)?;
    into_user(row)
}

/// Locks and returns a user for update.
pub(crate) async fn find_by_id_for_update<'e, E: PgExecutor<'e>>(
    executor: E,
    id: UserId,
) -> Result<Option<User>, StoreError> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM user_account WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.to_string())
    .fetch_optional(executor)
    .await
    .map_err(backend)?;
    into_user(row)
}

/// Lists all users.
pub(crate) async fn list<'e, E: PgExecutor<'e>>(
    executor: E,
) -> Result<Vec<User>, StoreError> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM user_account ORDER BY id"
    ))
    .fetch_all(executor)
    .await
    .map_err(backend)?;
    rows.into_iter().map(UserRow::try_into_user).collect()
}

/// Inserts a user unless one already exists for its provider identity.
///
/// Returns `None` on conflict. `ON CONFLICT DO NOTHING` keeps the enclosing
/// transaction usable, unlike a unique violation.
pub(crate) async fn insert<'e, E: PgExecutor<'e>>(
    executor: E,
    user: &User,
) -> Result<Option<User>, StoreError> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "INSERT INTO user_account ({USER_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (auth_provider_type, auth_provider_id) DO NOTHING \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(user.id().to_string())
    .bind(user.name())
    .bind(user.email())
    .bind(user.created_at())
    .bind(user.provider().as_str())
    .bind(user.provider_user_id().as_str())
    .fetch_optional(executor)
    .await
    .map_err(backend)?;
    into_user(row)
}

/// Writes a user's mutable fields.
pub(crate) async fn update<'e, E: PgExecutor<'e>>(
    executor: E,
    user: &User,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE user_account SET name = $2, email = $3 WHERE id = $1")
        .bind(user.id().to_string())
        .bind(user.name())
        .bind(user.email())
        .execute(executor)
        .await
        .map_err(backend)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> UserRow {
        UserRow {
            id: UserId::new().to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            created_at: Utc::now(),
            auth_provider_type: "GOOGLE".to_string(),
            auth_provider_id: "u1".to_string(),
        }
    }

    #[test]
    fn row_converts_to_user() {
        let row = row();
        let id = row.id.clone();
        let user = row.try_into_user().expect("convert");

        assert_eq!(user.id().to_string(), id);
        assert_eq!(user.name(), "Alice");
        assert_eq!(user.provider(), Provider::Google);
        assert_eq!(user.provider_user_id().as_str(), "u1");
    }

    #[test]
    fn bad_id_is_a_backend_error() {
        let row = UserRow {
            id: "not-an-id".to_string(),
            ..row()
        };
        let err = row.try_into_user().unwrap_err();
        assert!(matches!(err.current_context(), StoreError::Backend { .. }));
    }

    #[test]
    fn unknown_provider_is_a_backend_error() {
        let row = UserRow {
            auth_provider_type: "TWITTER".to_string(),
            ..row()
        };
        let err = row.try_into_user().unwrap_err();
        assert!(matches!(err.current_context(), StoreError::Backend { .. }));
    }
}
