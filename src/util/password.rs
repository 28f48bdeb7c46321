// src/util/password.rs
//! Argon2id password hashing in PHC string format.
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use password_hash::rand_core::OsRng;

use crate::domain::error::{DomainError, DomainResult};

pub fn hash_password(password: &str) -> DomainResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::Other(format!("failed to hash password: {}", e)))
}

/// Returns `Ok(false)` on mismatch; malformed stored hashes are errors.
pub fn verify_password(password: &str, password_hash: &str) -> DomainResult<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| DomainError::Other(format!("malformed password hash: {}", e)))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(DomainError::Other(format!("failed to verify password: {}", e))),
    }
}
