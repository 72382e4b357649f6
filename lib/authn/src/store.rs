//! The transactional store capability.
//!
//! Writes happen inside a `Transaction`; reads used on the hot authorization
//! path go straight through `Store` without one. Uniqueness of
//! `(provider, provider_user_id)` is the store's job, not the caller's: two
//! concurrent first logins may both see "not found", and only a
//! storage-level constraint keeps the second `create_user` from succeeding.

use async_trait::async_trait;
use futures::future::BoxFuture;
use rootcause::prelude::Report;
use sessiongate_core::UserId;
use tracing::error;

use crate::error::StoreError;
use crate::identity::{Provider, ProviderUserId};
use crate::user::{NewUser, User, UserMutation};

/// Storage for application users.
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a transaction.
    async fn begin(&self) -> Result<Box<dyn Transaction>, Report<StoreError>>;

    /// Looks up a user by provider identity outside any transaction.
    async fn find_user_by_identity(
        &self,
        provider: Provider,
        provider_user_id: &ProviderUserId,
    ) -> Result<Option<User>, Report<StoreError>>;

    /// Looks up a user by application ID outside any transaction.
    async fn user(&self, id: UserId) -> Result<Option<User>, Report<StoreError>>;

    /// Lists all users outside any transaction.
    async fn users(&self) -> Result<Vec<User>, Report<StoreError>>;
}

/// A unit of work against the store.
///
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait Transaction: Send {
    /// Looks up a user by provider identity.
    async fn find_user_by_identity(
        &mut self,
        provider: Provider,
        provider_user_id: &ProviderUserId,
    ) -> Result<Option<User>, Report<StoreError>>;

    /// Looks up a user by application ID.
    async fn user(&mut self, id: UserId) -> Result<Option<User>, Report<StoreError>>;

    /// Creates a user for a provider identity.
    ///
    /// Fails with `StoreError::AlreadyExists` if a user is already bound to
    /// the identity. The transaction stays usable after that failure.
    async fn create_user(&mut self, new_user: NewUser) -> Result<User, Report<StoreError>>;

    /// Applies `mutations` in order to the user's writable fields.
    async fn update_user(
        &mut self,
        id: UserId,
        mutations: &[UserMutation],
    ) -> Result<User, Report<StoreError>>;

    /// Makes the transaction's writes visible.
    async fn commit(self: Box<Self>) -> Result<(), Report<StoreError>>;

    /// Discards the transaction's writes.
    async fn rollback(self: Box<Self>) -> Result<(), Report<StoreError>>;
}

/// Runs `f` inside a transaction, committing on success and rolling back on
/// failure.
///
/// The closure receives the open transaction and returns a boxed future
/// borrowing it; captured state must be owned.
pub async fn run_transaction<S, T, F>(store: &S, f: F) -> Result<T, Report<StoreError>>
where
    S: Store + ?Sized,
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn Transaction) -> BoxFuture<'t, Result<T, Report<StoreError>>>
        + Send,
{
    let mut tx = store.begin().await?;
    match f(tx.as_mut()).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(report) => {
            if let Err(rollback) = tx.rollback().await {
                error!(error = %rollback, "failed to roll back transaction");
            }
            Err(report)
        }
    }
}
