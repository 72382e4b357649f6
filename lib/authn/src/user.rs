//! Application user records.
//!
//! An application user is created exactly once per distinct
//! `(provider, provider_user_id)` pair. Its ID and provider identity never
//! change; name and email can be mutated through `UserMutation`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sessiongate_core::UserId;

use crate::identity::{IdentityAssertion, Provider, ProviderUserId, truncate_to_seconds};

/// Placeholder display name for users who did not supply one at first login.
pub const DEFAULT_USER_NAME: &str = "Unnamed User";

/// An application-local user bound to a provider identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
    #[serde(rename = "auth_provider")]
    provider: Provider,
    #[serde(rename = "auth_provider_id")]
    provider_user_id: ProviderUserId,
}

impl User {
    /// Creates a user with all fields specified.
    ///
    /// Use this when reconstituting a user from storage.
    #[must_use]
    pub fn with_all_fields(
        id: UserId,
        name: String,
        email: String,
        created_at: DateTime<Utc>,
        provider: Provider,
        provider_user_id: ProviderUserId,
    ) -> Self {
        Self {
            id,
            name,
            email,
            created_at,
            provider,
            provider_user_id,
        }
    }

    /// Returns the application user ID.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns when the user was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the provider that owns this user's identity.
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Returns the provider-scoped user ID.
    #[must_use]
    pub fn provider_user_id(&self) -> &ProviderUserId {
        &self.provider_user_id
    }

    /// Applies a mutation to the writable fields.
    pub fn apply(&mut self, mutation: &UserMutation) {
        match mutation {
            UserMutation::SetName(name) => self.name.clone_from(name),
            UserMutation::SetEmail(email) => self.email.clone_from(email),
        }
    }
}

/// The input to `Transaction::create_user`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub provider: Provider,
    pub provider_user_id: ProviderUserId,
    pub name: String,
    pub email: String,
}

impl NewUser {
    /// Builds the record for a first login, falling back to
    /// [`DEFAULT_USER_NAME`] when `display_name` is blank.
    #[must_use]
    pub fn from_assertion(assertion: &IdentityAssertion, display_name: &str) -> Self {
        let name = if display_name.trim().is_empty() {
            DEFAULT_USER_NAME.to_string()
        } else {
            display_name.to_string()
        };
        Self {
            provider: assertion.provider(),
            provider_user_id: assertion.provider_user_id().clone(),
            name,
            email: assertion.email().to_string(),
        }
    }

    /// Materialises the record with a fresh ID.
    #[must_use]
    pub fn into_user(self, created_at: DateTime<Utc>) -> User {
        User::with_all_fields(
            UserId::new(),
            self.name,
            self.email,
            truncate_to_seconds(created_at),
            self.provider,
            self.provider_user_id,
        )
    }
}

/// A change to a user's mutable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserMutation {
    SetName(String),
    SetEmail(String),
}
