//! Persistence collaborator for user records.
//!
//! The authenticator only needs a read path: fetch at most one record from the
//! record space of a given user kind. `ping` backs the health endpoint.

mod memory;
mod postgres;

pub use self::memory::MemoryUserStore;
pub use self::postgres::{PgUserStore, PoolConfig};

use crate::auth::UserKind;
use anyhow::Result;
use async_trait::async_trait;

/// A stored account, read-only from the authenticator's point of view.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Email for teachers, username for students.
    pub identifier: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2id PHC string.
    pub password_hash: String,
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("identifier", &self.identifier)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password_hash", &"***")
            .finish()
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up the single record of `kind` whose identifier equals `identifier`.
    ///
    /// # Errors
    /// Returns an error only when the backing store fails; a missing record is `Ok(None)`.
    async fn find_one(&self, kind: UserKind, identifier: &str) -> Result<Option<UserRecord>>;

    /// Check that the backing store is reachable.
    ///
    /// # Errors
    /// Returns an error if the store cannot be reached.
    async fn ping(&self) -> Result<()>;
}
