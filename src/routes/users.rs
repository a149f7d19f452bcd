use crate::{
    auth::{
        generate_token, hash_password, verify_password, AuthResponse, AuthenticatedUserId,
        LoginRequest, RegisterRequest,
    },
    error::AppError,
    models::{NewUser, Role, User, UserUpdate},
    store::RecordStore,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use log::{debug, info};
use serde_json::json;
use validator::Validate;

/// Loads the caller and checks they may act on account `target_id`.
///
/// Same rule as task ownership: the account itself or an admin.
async fn authorize_account(
    store: &dyn RecordStore,
    caller_id: i32,
    target_id: i32,
) -> Result<User, AppError> {
    let caller = store
        .find_user(caller_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if !caller.can_act_for(target_id) {
        debug!("user {} denied access to account {}", caller_id, target_id);
        return Err(AppError::Forbidden(
            "You do not have permission to access this account".into(),
        ));
    }
    Ok(caller)
}

/// Register a new user
///
/// Creates a new account with the `user` role and returns an authentication token.
#[post("/register")]
pub async fn register(
    store: web::Data<dyn RecordStore>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;
    let register_data = register_data.into_inner();

    if store
        .find_user_by_username(&register_data.username)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest("Username already registered".into()));
    }

    let user = store
        .create_user(NewUser {
            username: register_data.username,
            password_hash: hash_password(&register_data.password)?,
            role: Role::User,
        })
        .await?;
    info!("registered user {} ({})", user.id, user.username);

    let token = generate_token(user.id)?;

    Ok(HttpResponse::Created().json(AuthResponse {
        token,
        user_id: user.id,
    }))
}

/// Login user
///
/// Authenticates a user and returns an authentication token.
#[post("/login")]
pub async fn login(
    store: web::Data<dyn RecordStore>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let user = store.find_user_by_username(&login_data.username).await?;

    match user {
        Some(user) if verify_password(&login_data.password, &user.password_hash)? => {
            let token = generate_token(user.id)?;
            Ok(HttpResponse::Ok().json(AuthResponse {
                token,
                user_id: user.id,
            }))
        }
        _ => Err(AppError::Unauthorized("Invalid credentials".into())),
    }
}

/// Fetch an account. Self or admin.
#[get("/{id}")]
pub async fn get_user(
    store: web::Data<dyn RecordStore>,
    user_id: web::Path<i32>,
    caller: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let target_id = user_id.into_inner();
    authorize_account(store.get_ref(), caller.0, target_id).await?;

    let user = store
        .find_user(target_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(user))
}

/// Update an account. Self or admin; only admins may change a role.
///
/// Empty `username` or `password` keep the current value.
#[put("/{id}")]
pub async fn update_user(
    store: web::Data<dyn RecordStore>,
    user_id: web::Path<i32>,
    update: web::Json<UserUpdate>,
    caller: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let update = update.into_inner().without_blanks();
    update.validate()?;
    let target_id = user_id.into_inner();
    let caller = authorize_account(store.get_ref(), caller.0, target_id).await?;

    let mut user = store
        .find_user(target_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if let Some(role) = update.role {
        if role != user.role && !caller.is_admin() {
            return Err(AppError::Forbidden("Only admins can change roles".into()));
        }
        user.role = role;
    }
    if let Some(username) = update.username {
        user.username = username;
    }
    if let Some(password) = update.password {
        user.password_hash = hash_password(&password)?;
    }

    let saved = store
        .save_user(&user)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    info!("user {} updated account {}", caller.id, saved.id);

    Ok(HttpResponse::Ok().json(saved))
}

/// Delete an account and all of its tasks. Self or admin.
#[delete("/{id}")]
pub async fn delete_user(
    store: web::Data<dyn RecordStore>,
    user_id: web::Path<i32>,
    caller: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let target_id = user_id.into_inner();
    authorize_account(store.get_ref(), caller.0, target_id).await?;

    if !store.delete_user(target_id).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    info!("user {} deleted account {}", caller.0, target_id);

    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully" })))
}
