//!
//! # Record Store
//!
//! Persistence for `User` and `Task` records behind the object-safe
//! [`RecordStore`] trait. Handlers and guards only ever see
//! `web::Data<dyn RecordStore>`, so the Postgres and in-memory backends are
//! interchangeable.
//!
//! Task writes are conditional: [`RecordStore::save_task`] and
//! [`RecordStore::delete_task`] refuse to touch a row whose stored status is
//! `completed`, which closes the window between the status guard's read and
//! the handler's write.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::{NewTask, NewUser, Task, TaskFilter, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors raised by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying database call failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness constraint was violated.
    #[error("{0} already exists")]
    Conflict(String),

    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a conditional task write.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskWrite<T> {
    /// The write went through.
    Applied(T),
    /// The stored task is `completed`; nothing was written.
    Locked,
    /// No task with that id exists.
    Missing,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name reported by the health endpoint.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_user(&self, id: i32) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Persists username, password hash and role. `None` if the row is gone.
    async fn save_user(&self, user: &User) -> Result<Option<User>, StoreError>;

    /// Deletes the user and every task they own.
    async fn delete_user(&self, id: i32) -> Result<bool, StoreError>;

    async fn find_task(&self, id: i32) -> Result<Option<Task>, StoreError>;

    /// Newest first.
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError>;

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError>;

    /// Persists title, description and status unless the stored task is completed.
    async fn save_task(&self, task: &Task) -> Result<TaskWrite<Task>, StoreError>;

    /// Deletes the task unless the stored task is completed.
    async fn delete_task(&self, id: i32) -> Result<TaskWrite<()>, StoreError>;
}
