use std::fmt;
use std::sync::Arc;

use log::debug;

use super::{GuardContext, GuardRejection, OwnershipGuard, StatusGuard, TaskAccess, TaskGuard};
use crate::store::RecordStore;

/// An ordered list of guards evaluated in front of a task route.
///
/// Evaluation stops at the first rejection: later guards and the terminal
/// handler never run.
#[derive(Clone, Default)]
pub struct GuardPipeline {
    guards: Vec<Arc<dyn TaskGuard>>,
}

impl GuardPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, guard: impl TaskGuard + 'static) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    /// Guards for reading a single task: ownership only.
    pub fn read_single() -> Self {
        Self::new().with(OwnershipGuard)
    }

    /// Guards for updating or deleting a task: ownership, then status.
    pub fn mutate() -> Self {
        Self::new().with(OwnershipGuard).with(StatusGuard)
    }

    pub fn guard_names(&self) -> Vec<&'static str> {
        self.guards.iter().map(|g| g.name()).collect()
    }

    /// Runs every guard in order for `requester_id` acting on `task_id`.
    ///
    /// Returns the requester and the most recently loaded task. A pipeline whose
    /// guards load neither record is rejected as if the records did not exist.
    pub async fn run(
        &self,
        store: &dyn RecordStore,
        requester_id: i32,
        task_id: i32,
    ) -> Result<TaskAccess, GuardRejection> {
        let mut ctx = GuardContext::new(requester_id, task_id);

        for guard in &self.guards {
            if let Err(rejection) = guard.check(store, &mut ctx).await {
                debug!(
                    "{} guard rejected user {} on task {}: {}",
                    guard.name(),
                    requester_id,
                    task_id,
                    rejection
                );
                return Err(rejection);
            }
        }

        let requester = ctx.requester.ok_or(GuardRejection::UserNotFound)?;
        let task = ctx.task.ok_or(GuardRejection::TaskNotFound)?;
        Ok(TaskAccess { requester, task })
    }
}

impl fmt::Debug for GuardPipeline {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.guard_names()).finish()
    }
}
