#![allow(dead_code)]

use std::sync::Arc;

use actix_web::{body::MessageBody, dev::ServiceResponse, test};
use async_trait::async_trait;
use serde_json::Value;

use taskguard::auth::{generate_token, AuthResponse};
use taskguard::models::{NewTask, NewUser, Role, Task, TaskFilter, TaskStatus, User};
use taskguard::store::{MemoryStore, RecordStore, StoreError, TaskWrite};

pub const JWT_SECRET: &str = "taskguard-integration-secret";

/// Builds the full application around a store, the way `main` does.
macro_rules! init_app {
    ($store:expr) => {{
        let store: std::sync::Arc<dyn taskguard::store::RecordStore> = $store;
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::from(store))
                .wrap(taskguard::logging::request_logger())
                .service(taskguard::routes::health::health)
                .service(
                    actix_web::web::scope("/api")
                        .wrap(taskguard::auth::AuthMiddleware)
                        .configure(taskguard::routes::config),
                ),
        )
        .await
    }};
}

/// Every test binary signs with the same secret and a cheap bcrypt cost.
pub fn setup_env() {
    std::env::set_var("JWT_SECRET", JWT_SECRET);
    std::env::set_var("BCRYPT_COST", "4");
}

pub struct TestUser {
    pub id: i32,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", self.token))
    }
}

/// Inserts a user straight into the store and mints a token for it.
pub async fn seed_user(store: &dyn RecordStore, username: &str, role: Role) -> TestUser {
    setup_env();
    let user = store
        .create_user(NewUser {
            username: username.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            role,
        })
        .await
        .expect("seed user");
    TestUser {
        id: user.id,
        token: generate_token(user.id).expect("token"),
    }
}

pub async fn seed_task(store: &dyn RecordStore, owner: i32, title: &str, status: &str) -> Task {
    store
        .create_task(NewTask {
            title: title.to_string(),
            description: format!("{} description", title),
            status: TaskStatus::new(status),
            user_id: owner,
        })
        .await
        .expect("seed task")
}

pub async fn read_json<B: MessageBody>(resp: ServiceResponse<B>) -> Value {
    let body = test::read_body(resp).await;
    serde_json::from_slice(&body).unwrap_or_else(|_| {
        panic!("response body is not JSON: {}", String::from_utf8_lossy(&body))
    })
}

pub fn parse_auth(body: &Value) -> AuthResponse {
    serde_json::from_value(body.clone()).expect("auth response")
}

/// Completes every task right before it is written, as if another request
/// finished it between the guards' read and the handler's write.
pub struct RacingStore {
    pub inner: Arc<MemoryStore>,
}

impl RacingStore {
    /// Marks the stored task completed through the regular write path.
    async fn complete_concurrently(&self, id: i32) -> Result<(), StoreError> {
        if let Some(mut stored) = self.inner.find_task(id).await? {
            if !stored.status.is_completed() {
                stored.status = TaskStatus::completed();
                self.inner.save_task(&stored).await?;
            }
        }
        Ok(())
    }
}

/// Lets accounts and listings work but fails every single-task lookup.
pub struct FlakyTaskStore {
    pub inner: Arc<MemoryStore>,
}

fn refused() -> StoreError {
    StoreError::Unavailable("connection refused".into())
}

#[async_trait]
impl RecordStore for RacingStore {
    fn backend(&self) -> &'static str {
        "racing"
    }
    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
    async fn find_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        self.inner.find_user(id).await
    }
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_username(username).await
    }
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.inner.create_user(user).await
    }
    async fn save_user(&self, user: &User) -> Result<Option<User>, StoreError> {
        self.inner.save_user(user).await
    }
    async fn delete_user(&self, id: i32) -> Result<bool, StoreError> {
        self.inner.delete_user(id).await
    }
    async fn find_task(&self, id: i32) -> Result<Option<Task>, StoreError> {
        self.inner.find_task(id).await
    }
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        self.inner.list_tasks(filter).await
    }
    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        self.inner.create_task(task).await
    }
    async fn save_task(&self, task: &Task) -> Result<TaskWrite<Task>, StoreError> {
        self.complete_concurrently(task.id).await?;
        self.inner.save_task(task).await
    }
    async fn delete_task(&self, id: i32) -> Result<TaskWrite<()>, StoreError> {
        self.complete_concurrently(id).await?;
        self.inner.delete_task(id).await
    }
}

#[async_trait]
impl RecordStore for FlakyTaskStore {
    fn backend(&self) -> &'static str {
        "flaky"
    }
    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
    async fn find_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        self.inner.find_user(id).await
    }
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_username(username).await
    }
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.inner.create_user(user).await
    }
    async fn save_user(&self, user: &User) -> Result<Option<User>, StoreError> {
        self.inner.save_user(user).await
    }
    async fn delete_user(&self, id: i32) -> Result<bool, StoreError> {
        self.inner.delete_user(id).await
    }
    async fn find_task(&self, _: i32) -> Result<Option<Task>, StoreError> {
        Err(refused())
    }
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        self.inner.list_tasks(filter).await
    }
    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        self.inner.create_task(task).await
    }
    async fn save_task(&self, task: &Task) -> Result<TaskWrite<Task>, StoreError> {
        self.inner.save_task(task).await
    }
    async fn delete_task(&self, id: i32) -> Result<TaskWrite<()>, StoreError> {
        self.inner.delete_task(id).await
    }
}
