//! In-memory `Store` with staged transactions.

use async_trait::async_trait;
use chrono::Utc;
use rootcause::prelude::Report;
use sessiongate_core::UserId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StoreError;
use crate::identity::{Provider, ProviderUserId};
use crate::store::{Store, Transaction};
use crate::user::{NewUser, User, UserMutation};

#[derive(Debug, Default)]
struct Shared {
    users: Mutex<HashMap<UserId, User>>,
    open_transactions: AtomicUsize,
    unavailable: AtomicBool,
}

impl Shared {
    fn users(&self) -> Result<MutexGuard<'_, HashMap<UserId, User>>, Report<StoreError>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend {
                details: "store is unavailable".to_string(),
            }
            .into());
        }
        self.users.lock().map_err(|_| {
            StoreError::Backend {
                details: "user table lock poisoned".to_string(),
            }
            .into()
        })
    }
}

/// A deterministic store for tests.
///
/// Writes are staged per transaction and become visible on commit. The
/// `(provider, provider_user_id)` uniqueness constraint is checked both at
/// create time and again at commit, so two transactions racing to create the
/// same identity behave like they would against a real database: the second
/// commit fails with `StoreError::AlreadyExists`.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a committed user directly, bypassing transactions.
    pub fn insert(&self, user: User) -> Result<(), Report<StoreError>> {
        let mut users = self.shared.users()?;
        ensure_unique(&users, user.provider(), user.provider_user_id())?;
        users.insert(user.id(), user);
        Ok(())
    }

    /// Returns the number of committed users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.shared.users.lock().map(|users| users.len()).unwrap_or(0)
    }

    /// Returns the number of transactions begun but not yet committed or
    /// rolled back. Transactions dropped without either count as open.
    #[must_use]
    pub fn open_transactions(&self) -> usize {
        self.shared.open_transactions.load(Ordering::SeqCst)
    }

    /// Panics if any transaction was left open.
    pub fn assert_no_open_transactions(&self) {
        let open = self.open_transactions();
        assert_eq!(open, 0, "{open} transaction(s) left open");
    }

    /// Makes every subsequent operation fail with `StoreError::Backend`
    /// until called again with `false`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, Report<StoreError>> {
        drop(self.shared.users()?);
        self.shared.open_transactions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            staged: HashMap::new(),
        }))
    }

    async fn find_user_by_identity(
        &self,
        provider: Provider,
        provider_user_id: &ProviderUserId,
    ) -> Result<Option<User>, Report<StoreError>> {
        let users = self.shared.users()?;
        Ok(find_by_identity(users.values(), provider, provider_user_id).cloned())
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
        Ok(self.shared.users()?.get(&id).cloned())
    }

    async fn users(&self) -> Result<Vec<User>, Report<StoreError>> {
        let mut users: Vec<User> = self.shared.users()?.values().cloned().collect();
        users.sort_by_key(User::id);
        Ok(users)
    }
}

struct MemoryTransaction {
    shared: Arc<Shared>,
    /// Rows written by this transaction, keyed by ID.
    staged: HashMap<UserId, User>,
}

impl MemoryTransaction {
    fn read(&self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
        if let Some(user) = self.staged.get(&id) {
            return Ok(Some(user.clone()));
        }
        Ok(self.shared.users()?.get(&id).cloned())
    }

    fn finish(&self) {
        self.shared.open_transactions.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn find_user_by_identity(
        &mut self,
        provider: Provider,
        provider_user_id: &ProviderUserId,
    ) -> Result<Option<User>, Report<StoreError>> {
        if let Some(user) = find_by_identity(self.staged.values(), provider, provider_user_id) {
            return Ok(Some(user.clone()));
        }
        let users = self.shared.users()?;
        Ok(find_by_identity(users.values(), provider, provider_user_id).cloned())
    }

    async fn user(&mut self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
        self.read(id)
    }

    async fn create_user(&mut self, new_user: NewUser) -> Result<User, Report<StoreError>> {
        {
            let users = self.shared.users()?;
            ensure_unique(&users, new_user.provider, &new_user.provider_user_id)?;
        }
        ensure_unique(&self.staged, new_user.provider, &new_user.provider_user_id)?;

        let user = new_user.into_user(Utc::now());
        self.staged.insert(user.id(), user.clone());
        Ok(user)
    }

    async fn update_user(
        &mut self,
        id: UserId,
        mutations: &[UserMutation],
    ) -> Result<User, Report<StoreError>> {
        let mut user = self.read(id)?.ok_or_else(|| StoreError::NotFound {
            entity: "user",
            id: id.to_string(),
        })?;
        for mutation in mutations {
            user.apply(mutation);
        }
        self.staged.insert(id, user.clone());
        Ok(user)
    }

    async fn commit(self: Box<Self>) -> Result<(), Report<StoreError>> {
        self.finish();
        let mut users = self.shared.users()?;
        for user in self.staged.values() {
            if !users.contains_key(&user.id()) {
                ensure_unique(&users, user.provider(), user.provider_user_id())?;
            }
        }
        for (id, user) in &self.staged {
            users.insert(*id, user.clone());
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), Report<StoreError>> {
        self.finish();
        Ok(())
    }
}

fn find_by_identity<'a>(
    mut users: impl Iterator<Item = &'a User>,
    provider: Provider,
    provider_user_id: &ProviderUserId,
) -> Option<&'a User> {
    users.find(|user| user.provider() == provider && user.provider_user_id() == provider_user_id)
}

fn ensure_unique(
    users: &HashMap<UserId, User>,
    provider: Provider,
    provider_user_id: &ProviderUserId,
) -> Result<(), Report<StoreError>> {
    if find_by_identity(users.values(), provider, provider_user_id).is_some() {
        return Err(StoreError::AlreadyExists {
            provider: provider.to_string(),
            provider_user_id: provider_user_id.to_string(),
        }
        .into());
    }
    Ok(())
}
