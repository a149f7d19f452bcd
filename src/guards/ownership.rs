use async_trait::async_trait;
use log::{debug, error};

use super::{GuardContext, GuardRejection, TaskGuard};
use crate::models::{Task, User};
use crate::store::RecordStore;

const CONTEXT: &str = "Failed to verify task ownership";

/// Checks that `requester_id` may act on task `task_id`.
///
/// The requester is looked up first, then the task. Access is granted to the
/// task's owner and to admins. On success both records are returned.
pub async fn check_ownership(
    store: &dyn RecordStore,
    requester_id: i32,
    task_id: i32,
) -> Result<(User, Task), GuardRejection> {
    let requester = store
        .find_user(requester_id)
        .await
        .map_err(|source| {
            error!("ownership check: user lookup {} failed: {}", requester_id, source);
            GuardRejection::Internal {
                context: CONTEXT,
                source,
            }
        })?
        .ok_or(GuardRejection::UserNotFound)?;

    let task = store
        .find_task(task_id)
        .await
        .map_err(|source| {
            error!("ownership check: task lookup {} failed: {}", task_id, source);
            GuardRejection::Internal {
                context: CONTEXT,
                source,
            }
        })?
        .ok_or(GuardRejection::TaskNotFound)?;

    if !requester.can_act_for(task.user_id) {
        debug!(
            "user {} denied access to task {} owned by {}",
            requester.id, task.id, task.user_id
        );
        return Err(GuardRejection::Forbidden);
    }

    Ok((requester, task))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OwnershipGuard;

#[async_trait]
impl TaskGuard for OwnershipGuard {
    fn name(&self) -> &'static str {
        "ownership"
    }

    async fn check(
        &self,
        store: &dyn RecordStore,
        ctx: &mut GuardContext,
    ) -> Result<(), GuardRejection> {
        let (requester, task) = check_ownership(store, ctx.requester_id, ctx.task_id).await?;
        ctx.requester = Some(requester);
        ctx.task = Some(task);
        Ok(())
    }
}
