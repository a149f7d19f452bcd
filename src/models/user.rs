use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Role of a user account.
/// Corresponds to the `user_role` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account, may only act on its own tasks.
    #[default]
    User,
    /// May act on any task and any account.
    Admin,
}

/// A user account as stored. The password hash is never serialized.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this user may act on a resource owned by `owner_id`.
    pub fn can_act_for(&self, owner_id: i32) -> bool {
        self.id == owner_id || self.is_admin()
    }
}

/// Fields needed to insert a new user; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// Payload for updating an account. Missing or empty fields keep the current value.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "crate::auth::USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: Option<String>,
    #[validate(length(min = 6))]
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl UserUpdate {
    /// Drops empty `username` and `password` so they count as "not provided".
    pub fn without_blanks(self) -> Self {
        Self {
            username: self.username.filter(|u| !u.is_empty()),
            password: self.password.filter(|p| !p.is_empty()),
            role: self.role,
        }
    }
}
