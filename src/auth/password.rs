use crate::error::AppError;
use bcrypt::{hash, verify, DEFAULT_COST};

/// Work factor for new hashes: `BCRYPT_COST`, else bcrypt's default (12).
/// Values outside bcrypt's 4..=31 range are clamped.
pub fn hash_cost() -> u32 {
    parse_cost(std::env::var("BCRYPT_COST").ok().as_deref())
}

fn parse_cost(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .map(|cost| cost.clamp(4, 31))
        .unwrap_or(DEFAULT_COST)
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, hash_cost()).map_err(|e| AppError::internal("Failed to hash password", e))
}

pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AppError> {
    verify(password, hashed_password)
        .map_err(|e| AppError::internal("Failed to verify password", e))
}
