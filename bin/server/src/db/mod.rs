//! PostgreSQL-backed user store.
//!
//! Uniqueness of `(auth_provider_type, auth_provider_id)` is a table
//! constraint; a conflicting insert reports `StoreError::AlreadyExists`.

mod user;

use async_trait::async_trait;
use chrono::Utc;
use rootcause::prelude::Report;
use sessiongate_authn::{
    NewUser, Provider, ProviderUserId, Store, StoreError, Transaction, User, UserMutation,
};
use sessiongate_core::UserId;
use sqlx::{PgPool, Postgres};
use tracing::instrument;

pub(crate) fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend {
        details: e.to_string(),
    }
}

/// A `Store` over a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new store.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, Report<StoreError>> {
        let tx = self.pool.begin().await.map_err(backend)?;
        Ok(Box::new(PgTransaction {
            tx,
            created: Vec::new(),
        }))
    }

    #[instrument(skip(self), fields(auth_provider = %provider, user_id = %provider_user_id))]
    async fn find_user_by_identity(
        &self,
        provider: Provider,
        provider_user_id: &ProviderUserId,
    ) -> Result<Option<User>, Report<StoreError>> {
        user::find_by_identity(&self.pool, provider, provider_user_id).await
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
        user::find_by_id(&self.pool, id).await
    }

    async fn users(&self) -> Result<Vec<User>, Report<StoreError>> {
        user::list(&self.pool).await
    }
}

/// An open PostgreSQL transaction.
///
/// Dropping it without committing rolls back.
struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
    /// Identities inserted so far, for reporting a conflict at commit.
    created: Vec<(Provider, ProviderUserId)>,
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn find_user_by_identity(
        &mut self,
        provider: Provider,
        provider_user_id: &ProviderUserId,
    ) -> Result<Option<User>, Report<StoreError>> {
        user::find_by_identity(&mut *self.tx, provider, provider_user_id).await
    }

    async fn user(&mut self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
        user::find_by_id(&mut *self.tx, id).await
    }

    async fn create_user(&mut self, new_user: NewUser) -> Result<User, Report<StoreError>> {
        let candidate = new_user.into_user(Utc::now());
        let identity = (candidate.provider(), candidate.provider_user_id().clone());
        let created = user::insert(&mut *self.tx, &candidate)
            .await?
            .ok_or_else(|| already_exists(&[identity.clone()]))?;
        self.created.push(identity);
        Ok(created)
    }

    async fn update_user(
        &mut self,
        id: UserId,
        mutations: &[UserMutation],
    ) -> Result<User, Report<StoreError>> {
        let mut current = user::find_by_id_for_update(&mut *self.tx, id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "user",
                id: id.to_string(),
            })?;
        for mutation in mutations {
            current.apply(mutation);
        }
        user::update(&mut *self.tx, &current).await?;
        Ok(current)
    }

    async fn commit(self: Box<Self>) -> Result<(), Report<StoreError>> {
        let PgTransaction { tx, created } = *self;
        tx.commit().await.map_err(|e| {
            if is_unique_violation(&e) {
                already_exists(&created)
            } else {
                backend(e)
            }
        })?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), Report<StoreError>> {
        self.tx.rollback().await.map_err(backend)?;
        Ok(())
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// Conflict for the most recent identity this transaction inserted.
fn already_exists(created: &[(Provider, ProviderUserId)]) -> StoreError {
    match created.last() {
        Some((provider, provider_user_id)) => StoreError::AlreadyExists {
            provider: provider.to_string(),
            provider_user_id: provider_user_id.to_string(),
        },
        None => StoreError::AlreadyExists {
            provider: "unknown".to_string(),
            provider_user_id: "unknown".to_string(),
        },
    }
}
