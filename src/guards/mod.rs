//!
//! # Task Guards
//!
//! Read-only checks that run in front of task routes and either allow the
//! request through or reject it with a terminal response.
//!
//! - [`OwnershipGuard`]: the requester must exist, the task must exist, and the
//!   requester must own the task or be an admin.
//! - [`StatusGuard`]: the task must exist and must not be `completed`.
//!
//! A [`GuardPipeline`] runs guards in order and stops at the first rejection.
//! Reading a single task runs ownership only; updates and deletes run
//! ownership, then status, so a caller without rights learns nothing about
//! the task's lifecycle. [`RequireTaskAccess`] mounts a pipeline on an
//! actix-web resource.
//!
//! Guards never write. Running them twice against an unchanged store yields
//! the same verdict.

pub mod middleware;
pub mod ownership;
pub mod pipeline;
pub mod status;

use async_trait::async_trait;

use crate::models::{Task, User};
use crate::store::{RecordStore, StoreError};

pub use middleware::RequireTaskAccess;
pub use ownership::{check_ownership, OwnershipGuard};
pub use pipeline::GuardPipeline;
pub use status::{check_not_completed, StatusGuard};

/// Why a guard refused a request.
#[derive(Debug, thiserror::Error)]
pub enum GuardRejection {
    #[error("User not found")]
    UserNotFound,

    #[error("Task not found")]
    TaskNotFound,

    #[error("You do not have permission to access this task")]
    Forbidden,

    #[error("Task is already completed and can no longer be edited or deleted")]
    TaskLocked,

    /// The store failed while a guard was reading from it.
    #[error("{context}: {source}")]
    Internal {
        context: &'static str,
        source: StoreError,
    },
}

/// State threaded through a pipeline run.
///
/// Guards fill in the records they load so later guards and the terminal
/// handler can use them.
#[derive(Debug, Clone)]
pub struct GuardContext {
    pub requester_id: i32,
    pub task_id: i32,
    pub requester: Option<User>,
    pub task: Option<Task>,
}

impl GuardContext {
    pub fn new(requester_id: i32, task_id: i32) -> Self {
        Self {
            requester_id,
            task_id,
            requester: None,
            task: None,
        }
    }
}

/// What a successful pipeline run hands to the terminal handler.
///
/// `task` is the copy read by the last guard that loaded it.
#[derive(Debug, Clone)]
pub struct TaskAccess {
    pub requester: User,
    pub task: Task,
}

#[async_trait]
pub trait TaskGuard: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(
        &self,
        store: &dyn RecordStore,
        ctx: &mut GuardContext,
    ) -> Result<(), GuardRejection>;
}
