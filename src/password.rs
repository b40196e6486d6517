//! Password hashing
//!
//! Onboarding still collects a password even though nothing authenticates
//! with it yet. It is stored as an argon2 PHC string, never as plaintext.

use crate::error::AppError;
use crate::Result;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

const THROWAWAY_PASSWORD_LEN: usize = 24;

pub fn hash_password(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Password(e.to_string()))
}

#[cfg(test)]
pub(crate) fn verify_password(plaintext: &str, stored_hash: &str) -> Result<bool> {
    use argon2::password_hash::{PasswordHash, PasswordVerifier};

    let parsed = PasswordHash::new(stored_hash).map_err(|e| AppError::Password(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok())
}

/// Random alphanumeric secret for clients that have no login flow.
pub fn generate_throwaway_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(THROWAWAY_PASSWORD_LEN)
        .map(char::from)
        .collect()
}
