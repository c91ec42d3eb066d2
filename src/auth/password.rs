/// Password Hashing and Verification
///
/// bcrypt hashing. Both operations are CPU-bound; async callers go through
/// the `*_blocking` wrappers so they never stall an actix worker.

use bcrypt::{hash, verify, DEFAULT_COST};
use lazy_static::lazy_static;

use crate::error::ApiError;
use crate::validators::validate_password_complexity;

lazy_static! {
    // Same cost as stored hashes, so verifying against it takes as long as a
    // real mismatch.
    static ref PLACEHOLDER_HASH: String =
        hash("placeholder-for-unknown-accounts", DEFAULT_COST).unwrap_or_default();
}

/// Hash a password using bcrypt
///
/// # Errors
/// Returns error if:
/// - Password fails the complexity rules
/// - Bcrypt hashing fails
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    validate_password_complexity(password)
        .map_err(|e| ApiError::validation(format!("password - {}", e)))?;

    hash(password, DEFAULT_COST)
        .map_err(|e| ApiError::internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// A malformed stored hash is an error, not a mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    verify(password, hash)
        .map_err(|e| ApiError::internal(format!("Password verification failed: {}", e)))
}

pub async fn hash_password_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(ApiError::internal)?
}

pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(ApiError::internal)?
}

/// Spend one bcrypt verification on a lookup miss, so an unknown account
/// costs the same as a wrong password.
pub async fn verify_password_for_missing_user(password: String) {
    let placeholder = PLACEHOLDER_HASH.clone();
    if let Err(e) = verify_password_blocking(password, placeholder).await {
        tracing::debug!(error = %e, "Placeholder verification failed");
    }
}
