//! Deterministic in-memory collaborators for tests.
//!
//! These implement the same contracts as the production verifier and
//! PostgreSQL store, so the session client and HTTP layer can be exercised
//! without a network or database.

mod fake_auth;
mod memory_store;

pub use fake_auth::FakeAuth;
pub use memory_store::MemoryStore;
