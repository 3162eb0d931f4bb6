//! Database layer: the `Store` seam plus PostgreSQL and in-memory backends.

mod memory;
mod pool;
mod repositories;

pub use memory::MemoryStore;
pub use pool::{create_pool, run_migrations, DbPool};
pub use repositories::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewTask, NewUser, PublicUser, Task, TaskChanges, UserRow};

/// Datastore failures, classified so callers can map constraint violations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,

    #[error("row not found")]
    NotFound,

    #[error("referenced row does not exist")]
    ForeignKeyViolation,

    #[error("database error: {0}")]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation,
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::ForeignKeyViolation
            }
            _ => StoreError::Sqlx(e),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent storage for users and tasks.
///
/// Email uniqueness is the store's job: `create_user` must fail with
/// `UniqueViolation` for an existing email even under concurrent calls.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>>;

    async fn create_user(&self, user: NewUser) -> StoreResult<UserRow>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRow>>;

    async fn update_user_name(&self, id: Uuid, name: &str) -> StoreResult<UserRow>;

    async fn update_user_avatar(&self, id: Uuid, avatar_url: &str) -> StoreResult<UserRow>;

    async fn list_users(&self) -> StoreResult<Vec<PublicUser>>;

    async fn create_task(&self, task: NewTask) -> StoreResult<Task>;

    /// Tasks authored by or assigned to `user_id`, newest first.
    async fn list_tasks_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Task>>;

    async fn update_task(&self, id: Uuid, changes: TaskChanges) -> StoreResult<Task>;

    async fn delete_task(&self, id: Uuid) -> StoreResult<()>;
}
