use async_trait::async_trait;
use sqlx::PgPool;

use super::{RecordStore, StoreError, TaskWrite};
use crate::models::{NewTask, NewUser, Task, TaskFilter, User};

const USER_COLUMNS: &str = "id, username, password_hash, role, created_at, updated_at";
const TASK_COLUMNS: &str = "id, title, description, status, user_id, created_at, updated_at";

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Applies pending migrations from `migrations/`.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Distinguishes a zero-row conditional write into `Locked` or `Missing`.
    async fn explain_skipped_write<T>(&self, id: i32) -> Result<TaskWrite<T>, StoreError> {
        let exists = sqlx::query_as::<_, (i32,)>("SELECT id FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match exists {
            Some(_) => TaskWrite::Locked,
            None => TaskWrite::Missing,
        })
    }
}

fn map_unique_violation(error: sqlx::Error, what: String) -> StoreError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what),
        _ => StoreError::Database(error),
    }
}

#[async_trait]
impl RecordStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (username, password_hash, role) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, format!("username '{}'", user.username)))
    }

    async fn save_user(&self, user: &User) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "UPDATE users SET username = $1, password_hash = $2, role = $3, updated_at = NOW() \
             WHERE id = $4 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, format!("username '{}'", user.username)))
    }

    async fn delete_user(&self, id: i32) -> Result<bool, StoreError> {
        // tasks.user_id is ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_task(&self, id: i32) -> Result<Option<Task>, StoreError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        // Conditions for status and search are appended after the owner scope.
        let mut sql = format!("SELECT {} FROM tasks WHERE user_id = $1", TASK_COLUMNS);
        let mut param_count = 2;

        if filter.status.is_some() {
            sql.push_str(&format!(" AND status = ${}", param_count));
            param_count += 1;
        }
        if filter.search.is_some() {
            sql.push_str(&format!(
                " AND (title ILIKE ${0} OR description ILIKE ${0})",
                param_count
            ));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut query = sqlx::query_as::<_, Task>(&sql).bind(filter.user_id);
        if let Some(status) = &filter.status {
            query = query.bind(status.clone());
        }
        if let Some(search) = &filter.search {
            query = query.bind(format!("%{}%", search));
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        let sql = format!(
            "INSERT INTO tasks (title, description, status, user_id) VALUES ($1, $2, $3, $4) \
             RETURNING {}",
            TASK_COLUMNS
        );
        let created = sqlx::query_as::<_, Task>(&sql)
            .bind(task.title)
            .bind(task.description)
            .bind(task.status)
            .bind(task.user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn save_task(&self, task: &Task) -> Result<TaskWrite<Task>, StoreError> {
        let sql = format!(
            "UPDATE tasks SET title = $1, description = $2, status = $3, updated_at = NOW() \
             WHERE id = $4 AND status <> 'completed' RETURNING {}",
            TASK_COLUMNS
        );
        let saved = sqlx::query_as::<_, Task>(&sql)
            .bind(&task.title)
            .bind(&task.description)
            .bind(&task.status)
            .bind(task.id)
            .fetch_optional(&self.pool)
            .await?;

        match saved {
            Some(saved) => Ok(TaskWrite::Applied(saved)),
            None => self.explain_skipped_write(task.id).await,
        }
    }

    async fn delete_task(&self, id: i32) -> Result<TaskWrite<()>, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND status <> 'completed'")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            Ok(TaskWrite::Applied(()))
        } else {
            self.explain_skipped_write(id).await
        }
    }
}
