use async_trait::async_trait;
use log::{debug, error};

use super::{GuardContext, GuardRejection, TaskGuard};
use crate::models::Task;
use crate::store::RecordStore;

const CONTEXT: &str = "Failed to check task status";

/// Checks that task `task_id` exists and is not `completed`.
pub async fn check_not_completed(
    store: &dyn RecordStore,
    task_id: i32,
) -> Result<Task, GuardRejection> {
    let task = store
        .find_task(task_id)
        .await
        .map_err(|source| {
            error!("status check: task lookup {} failed: {}", task_id, source);
            GuardRejection::Internal {
                context: CONTEXT,
                source,
            }
        })?
        .ok_or(GuardRejection::TaskNotFound)?;

    if task.status.is_completed() {
        debug!("task {} is completed, rejecting mutation", task.id);
        return Err(GuardRejection::TaskLocked);
    }

    Ok(task)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StatusGuard;

#[async_trait]
impl TaskGuard for StatusGuard {
    fn name(&self) -> &'static str {
        "status"
    }

    async fn check(
        &self,
        store: &dyn RecordStore,
        ctx: &mut GuardContext,
    ) -> Result<(), GuardRejection> {
        let task = check_not_completed(store, ctx.task_id).await?;
        ctx.task = Some(task);
        Ok(())
    }
}
