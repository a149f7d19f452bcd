//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every handler and middleware returns it, and `actix_web::error::ResponseError`
//! turns it into a JSON response.
//!
//! Client errors carry a single human-readable `message`. Server errors carry the
//! `message` plus the underlying fault under `error` for diagnostics.
//!
//! `From` implementations exist for store faults, guard rejections, validation
//! failures, JWT errors and bcrypt errors so `?` can be used everywhere.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::guards::GuardRejection;
use crate::store::StoreError;

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Authentication failed or is missing (HTTP 401).
    Unauthorized(String),
    /// Malformed or conflicting request (HTTP 400).
    BadRequest(String),
    /// The caller is authenticated but not allowed to do this (HTTP 403).
    Forbidden(String),
    /// A referenced resource does not exist (HTTP 404).
    NotFound(String),
    /// Unexpected server-side fault (HTTP 500).
    /// `message` describes what was being attempted, `error` the underlying cause.
    InternalServerError { message: String, error: String },
    /// A database call failed (HTTP 500).
    DatabaseError(String),
    /// Input validation failed (HTTP 422).
    ValidationError(String),
}

impl AppError {
    pub fn internal(message: impl Into<String>, error: impl fmt::Display) -> Self {
        AppError::InternalServerError {
            message: message.into(),
            error: error.to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError { message, error } => {
                write!(f, "Internal Server Error: {} ({})", message, error)
            }
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError { .. } | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::ValidationError(msg) => json!({ "message": msg }),
            AppError::InternalServerError { message, error } => json!({
                "message": message,
                "error": error
            }),
            AppError::DatabaseError(msg) => json!({
                "message": "Database error",
                "error": msg
            }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Uniqueness conflicts become 400s; everything else is a server fault.
impl From<StoreError> for AppError {
    fn from(error: StoreError) -> AppError {
        match error {
            StoreError::Conflict(what) => AppError::BadRequest(format!("{} already exists", what)),
            StoreError::Database(e) => AppError::DatabaseError(e.to_string()),
            StoreError::Unavailable(_) => AppError::internal("Store unavailable", error),
        }
    }
}

impl From<GuardRejection> for AppError {
    fn from(rejection: GuardRejection) -> AppError {
        let message = rejection.to_string();
        match rejection {
            GuardRejection::UserNotFound | GuardRejection::TaskNotFound => {
                AppError::NotFound(message)
            }
            GuardRejection::Forbidden | GuardRejection::TaskLocked => AppError::Forbidden(message),
            GuardRejection::Internal { context, source } => AppError::internal(context, source),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// JWT processing failures are authentication failures.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::internal("Password hashing failed", error)
    }
}
