use log::info;

use crate::auth::hash_password;
use crate::error::AppError;
use crate::models::{NewUser, Role, User};
use crate::store::{RecordStore, StoreError};

/// Makes sure an admin account named `username` exists.
///
/// An existing account with that name is returned untouched, whatever its
/// role; only a missing one is created.
pub async fn ensure_admin(
    store: &dyn RecordStore,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    if let Some(existing) = store.find_user_by_username(username).await? {
        if !existing.is_admin() {
            log::warn!(
                "bootstrap account '{}' exists without the admin role",
                username
            );
        }
        return Ok(existing);
    }

    let new_admin = NewUser {
        username: username.to_string(),
        password_hash: hash_password(password)?,
        role: Role::Admin,
    };

    match store.create_user(new_admin).await {
        Ok(admin) => {
            info!("created admin account '{}' (id {})", admin.username, admin.id);
            Ok(admin)
        }
        // Another instance won the race.
        Err(StoreError::Conflict(_)) => store
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::internal("Failed to create admin", "account vanished")),
        Err(e) => Err(e.into()),
    }
}
