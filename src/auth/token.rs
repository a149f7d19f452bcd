use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::error;
use serde::{Deserialize, Serialize};

/// Lifetime of an issued token.
const TOKEN_TTL_HOURS: i64 = 24;

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's id.
    pub sub: i32,
    /// Expiration timestamp (seconds since epoch) for the token.
    pub exp: usize,
}

fn jwt_secret() -> Result<String, AppError> {
    std::env::var("JWT_SECRET").map_err(|_| {
        error!("JWT_SECRET is not set");
        AppError::internal("Token signing unavailable", "JWT_SECRET not set")
    })
}

/// Generates a JWT for a given user ID.
///
/// The token expires after 24 hours and is signed with `JWT_SECRET`.
///
/// # Returns
/// `AppError::InternalServerError` if `JWT_SECRET` is not set or if encoding fails.
pub fn generate_token(user_id: i32) -> Result<String, AppError> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(TOKEN_TTL_HOURS))
        .ok_or_else(|| AppError::internal("Failed to generate token", "timestamp overflow"))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        exp: expiration,
    };

    let secret = jwt_secret()?;
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal("Failed to generate token", e))
}

/// Verifies a JWT string and decodes its claims.
///
/// Signature and expiration are checked against `JWT_SECRET`.
///
/// # Returns
/// `AppError::Unauthorized` if the token is malformed, its signature is invalid,
/// or it has expired.
pub fn verify_token(token: &str) -> Result<Claims, AppError> {
    let secret = jwt_secret()?;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}
