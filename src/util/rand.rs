// src/util/rand.rs
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::domain::error::{DomainError, DomainResult};

/// Byte length of session remember tokens.
pub const REMEMBER_TOKEN_BYTES: usize = 32;

/// Fills `buf` from the operating system CSPRNG.
pub fn fill_random(buf: &mut [u8]) -> DomainResult<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| DomainError::Entropy(e.to_string()))
}

pub fn random_bytes(n: usize) -> DomainResult<Vec<u8>> {
    let mut buf = vec![0u8; n];
    fill_random(&mut buf)?;
    Ok(buf)
}

/// Returns `n` random bytes as padded URL-safe base64.
pub fn random_base64_url_string(n: usize) -> DomainResult<String> {
    random_bytes(n).map(|bytes| URL_SAFE.encode(bytes))
}
