// src/domain/session.rs
use chrono::{DateTime, Duration, Utc};

/// Default lifetime of a remember-me session.
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 30;

/// A web session binding a remember token to a user.
///
/// Only `remember_token_hash` is persisted; the clear token lives in the
/// client's cookie.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user_uuid: String,
    pub remember_token: String,
    pub remember_token_hash: String,
    /// `None` marks a rotated session that no cookie should reference any more.
    pub remember_token_expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_uuid", &self.user_uuid)
            .field("remember_token_expires_at", &self.remember_token_expires_at)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(
        user_uuid: impl Into<String>,
        remember_token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            user_uuid: user_uuid.into(),
            remember_token: remember_token.into(),
            remember_token_hash: String::new(),
            remember_token_expires_at: expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.remember_token_expires_at {
            Some(expires_at) => expires_at <= now,
            None => true,
        }
    }
}

pub fn default_expiry(now: DateTime<Utc>, ttl_days: i64) -> DateTime<Utc> {
    now + Duration::days(ttl_days)
}
