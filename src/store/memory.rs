use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{RecordStore, StoreError, TaskWrite};
use crate::models::{NewTask, NewUser, Task, TaskFilter, User};

#[derive(Default)]
struct State {
    users: BTreeMap<i32, User>,
    tasks: BTreeMap<i32, Task>,
    last_user_id: i32,
    last_task_id: i32,
}

/// Process-local store used when no database is configured, and by tests.
///
/// Ids are assigned sequentially starting at 1, like a `SERIAL` column.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!("username '{}'", user.username)));
        }

        state.last_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: state.last_user_id,
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn save_user(&self, user: &User) -> Result<Option<User>, StoreError> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(StoreError::Conflict(format!("username '{}'", user.username)));
        }

        Ok(state.users.get_mut(&user.id).map(|stored| {
            stored.username = user.username.clone();
            stored.password_hash = user.password_hash.clone();
            stored.role = user.role;
            stored.updated_at = Utc::now();
            stored.clone()
        }))
    }

    async fn delete_user(&self, id: i32) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        state.tasks.retain(|_, task| task.user_id != id);
        Ok(true)
    }

    async fn find_task(&self, id: i32) -> Result<Option<Task>, StoreError> {
        Ok(self.state.read().await.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        let mut state = self.state.write().await;
        state.last_task_id += 1;
        let now = Utc::now();
        let created = Task {
            id: state.last_task_id,
            title: task.title,
            description: task.description,
            status: task.status,
            user_id: task.user_id,
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(created.id, created.clone());
        Ok(created)
    }

    async fn save_task(&self, task: &Task) -> Result<TaskWrite<Task>, StoreError> {
        let mut state = self.state.write().await;
        let Some(stored) = state.tasks.get_mut(&task.id) else {
            return Ok(TaskWrite::Missing);
        };
        if stored.status.is_completed() {
            return Ok(TaskWrite::Locked);
        }

        stored.title = task.title.clone();
        stored.description = task.description.clone();
        stored.status = task.status.clone();
        stored.updated_at = Utc::now();
        Ok(TaskWrite::Applied(stored.clone()))
    }

    async fn delete_task(&self, id: i32) -> Result<TaskWrite<()>, StoreError> {
        let mut state = self.state.write().await;
        match state.tasks.get(&id) {
            None => Ok(TaskWrite::Missing),
            Some(task) if task.status.is_completed() => Ok(TaskWrite::Locked),
            Some(_) => {
                state.tasks.remove(&id);
                Ok(TaskWrite::Applied(()))
            }
        }
    }
}
