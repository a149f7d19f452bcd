use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use validator::Validate;

/// Lifecycle status of a task.
///
/// Stored as free-form text: any string is accepted and written back as-is.
/// Only the exact literal `completed` carries meaning, it locks the task
/// against further updates and deletes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct TaskStatus(String);

impl TaskStatus {
    pub const IN_PROGRESS: &'static str = "in progress";
    pub const COMPLETED: &'static str = "completed";

    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn in_progress() -> Self {
        Self::new(Self::IN_PROGRESS)
    }

    pub fn completed() -> Self {
        Self::new(Self::COMPLETED)
    }

    /// True only for the exact literal `completed`.
    pub fn is_completed(&self) -> bool {
        self.0 == Self::COMPLETED
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::in_progress()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskStatus {
    fn from(status: &str) -> Self {
        Self::new(status)
    }
}

/// Payload for creating a task. The owner is always the authenticated caller.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Must be between 1 and 1000 characters.
    #[validate(length(min = 1, max = 1000))]
    pub description: String,
}

/// Payload for updating a task.
///
/// Every field is optional. Missing or empty values keep the current value.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct TaskUpdate {
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub status: Option<String>,
}

/// A task as stored and returned by the API.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    /// Identifier of the owning user.
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a new task; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub user_id: i32,
}

impl NewTask {
    pub fn new(input: TaskInput, owner_id: i32) -> Self {
        Self {
            title: input.title,
            description: input.description,
            status: TaskStatus::default(),
            user_id: owner_id,
        }
    }
}

/// Query parameters accepted by the task listing endpoint.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    /// Exact status match.
    pub status: Option<String>,
    /// Case-insensitive match against title and description.
    pub search: Option<String>,
}

/// Filter handed to the store when listing tasks. Always scoped to one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFilter {
    pub user_id: i32,
    pub status: Option<TaskStatus>,
    pub search: Option<String>,
}

impl TaskFilter {
    pub fn owned_by(user_id: i32) -> Self {
        Self {
            user_id,
            status: None,
            search: None,
        }
    }

    pub fn from_query(user_id: i32, query: TaskQuery) -> Self {
        Self {
            user_id,
            status: query.status.map(TaskStatus::new),
            search: query.search.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        if task.user_id != self.user_id {
            return false;
        }
        if let Some(status) = &self.status {
            if &task.status != status {
                return false;
            }
        }
        match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                task.title.to_lowercase().contains(&term)
                    || task.description.to_lowercase().contains(&term)
            }
            None => true,
        }
    }
}

impl Task {
    /// Applies an update in place. Empty strings count as "not provided".
    pub fn apply(&mut self, update: TaskUpdate) {
        if let Some(title) = update.title.filter(|t| !t.is_empty()) {
            self.title = title;
        }
        if let Some(description) = update.description.filter(|d| !d.is_empty()) {
            self.description = description;
        }
        if let Some(status) = update.status.filter(|s| !s.is_empty()) {
            self.status = TaskStatus::new(status);
        }
    }
}
