//! Argon2id password hashing. Both operations are CPU-bound and run on the blocking pool.

use std::sync::OnceLock;

use argon2::{
    Argon2,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

use crate::error::ApiError;

/// Stand-in hash checked when a sign-in names no known login, so that branch pays for the same
/// Argon2 run as a wrong password.
static DECOY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Hashes `password` with a fresh random salt into a PHC string.
pub async fn hash(password: String) -> Result<String, ApiError> {
    run_blocking(move || hash_blocking(&password)).await
}

/// verify
///
/// `Ok(false)` on a plain mismatch. A stored hash that does not parse is an internal error,
/// not a failed login.
pub async fn verify(password: String, stored: String) -> Result<bool, ApiError> {
    run_blocking(move || verify_blocking(&password, &stored)).await
}

/// Runs a verification against the decoy hash and discards the outcome.
pub async fn verify_decoy(password: String) -> Result<(), ApiError> {
    run_blocking(move || {
        let decoy = DECOY_HASH.get_or_init(|| hash_blocking("decoy").ok());
        if let Some(stored) = decoy {
            verify_blocking(&password, stored)?;
        }
        Ok(())
    })
    .await
}

fn hash_blocking(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

fn verify_blocking(password: &str, stored: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| ApiError::Internal(format!("invalid stored password hash: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ApiError::Internal(format!(
            "password verification failed: {e}"
        ))),
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}
