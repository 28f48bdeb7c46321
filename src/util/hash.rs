// src/util/hash.rs
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::domain::error::{DomainError, DomainResult};

type HmacSha256 = Hmac<Sha256>;

/// Keyed HMAC-SHA256 hasher producing padded URL-safe base64 digests.
#[derive(Clone)]
pub struct HmacHasher {
    key: SecretString,
}

impl std::fmt::Debug for HmacHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacHasher").finish_non_exhaustive()
    }
}

impl HmacHasher {
    pub fn new(key: SecretString) -> Self {
        Self { key }
    }

    pub fn hash(&self, input: &str) -> DomainResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|e| DomainError::Other(format!("invalid HMAC key: {}", e)))?;
        mac.update(input.as_bytes());
        Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
    }
}
