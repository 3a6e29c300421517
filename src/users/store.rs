use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::model::{NewUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The unique index on `email` rejected an insert.
    #[error("duplicate key: email already exists")]
    DuplicateEmail,
    #[error("user {id} has an unreadable record: {reason}")]
    Corrupt { id: Uuid, reason: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence for user records. Implementations must be safe to share across
/// concurrent requests and must enforce email uniqueness themselves.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact-match lookup on the login key.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Persists a new user; the store assigns `id` and `created_at`.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    /// Releases connections. Called once during shutdown.
    async fn close(&self) {}
}
