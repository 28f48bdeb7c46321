// src/application/services/session_service.rs
use std::fmt::Debug;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::application::error::ApplicationResult;
use crate::domain::context::RequestContext;
use crate::domain::error::DomainError;
use crate::domain::repositories::session_repository::SessionRepository;
use crate::domain::session::Session;
use crate::util::hash::HmacHasher;
use crate::util::rand::{random_base64_url_string, REMEMBER_TOKEN_BYTES};

/// Service interface for remember-me sessions
pub trait SessionService: Send + Sync + Debug {
    /// Persist a session; only the keyed hash of its token is stored
    fn add(&self, ctx: &RequestContext, session: &Session) -> ApplicationResult<()>;

    /// Create and persist a session with a fresh random token
    fn start(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> ApplicationResult<Session>;

    fn by_remember_token(&self, ctx: &RequestContext, remember_token: &str)
        -> ApplicationResult<Session>;

    fn delete_by_remember_token(&self, ctx: &RequestContext, remember_token: &str)
        -> ApplicationResult<()>;

    /// Drop the user's expired and rotated sessions, returning how many were removed
    fn purge_expired(&self, ctx: &RequestContext, user_uuid: &str) -> ApplicationResult<usize>;
}

#[derive(Debug)]
pub struct SessionServiceImpl<R: SessionRepository> {
    repository: Arc<R>,
    hasher: HmacHasher,
}

impl<R: SessionRepository> SessionServiceImpl<R> {
    pub fn new(repository: Arc<R>, hasher: HmacHasher) -> Self {
        Self { repository, hasher }
    }

    fn token_hash(&self, remember_token: &str) -> ApplicationResult<String> {
        if remember_token.is_empty() {
            return Err(DomainError::RememberTokenRequired.into());
        }
        Ok(self.hasher.hash(remember_token)?)
    }
}

impl<R: SessionRepository> SessionService for SessionServiceImpl<R> {
    #[instrument(skip(self, ctx), level = "debug")]
    fn add(&self, ctx: &RequestContext, session: &Session) -> ApplicationResult<()> {
        if session.user_uuid.is_empty() {
            return Err(DomainError::UserUuidRequired.into());
        }
        let mut stored = session.clone();
        stored.remember_token_hash = self.token_hash(&session.remember_token)?;
        self.repository.add(ctx, &stored)?;
        Ok(())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn start(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> ApplicationResult<Session> {
        let remember_token = random_base64_url_string(REMEMBER_TOKEN_BYTES)?;
        let mut session = Session::new(user_uuid, remember_token, expires_at);
        self.add(ctx, &session)?;
        session.remember_token_hash = self.token_hash(&session.remember_token)?;
        Ok(session)
    }

    #[instrument(skip(self, ctx, remember_token), level = "debug")]
    fn by_remember_token(
        &self,
        ctx: &RequestContext,
        remember_token: &str,
    ) -> ApplicationResult<Session> {
        let hash = self.token_hash(remember_token)?;
        let mut session = self
            .repository
            .get_by_remember_token_hash(ctx, &hash)?
            .ok_or(DomainError::SessionNotFound)?;
        session.remember_token = remember_token.to_string();
        Ok(session)
    }

    #[instrument(skip(self, ctx, remember_token), level = "debug")]
    fn delete_by_remember_token(
        &self,
        ctx: &RequestContext,
        remember_token: &str,
    ) -> ApplicationResult<()> {
        let hash = self.token_hash(remember_token)?;
        if !self.repository.delete_by_remember_token_hash(ctx, &hash)? {
            return Err(DomainError::SessionNotFound.into());
        }
        Ok(())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn purge_expired(&self, ctx: &RequestContext, user_uuid: &str) -> ApplicationResult<usize> {
        let purged = self
            .repository
            .delete_expired_by_user_uuid(ctx, user_uuid, Utc::now())?;
        if purged > 0 {
            debug!(purged, "purged stale sessions");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::{default_expiry, DEFAULT_SESSION_TTL_DAYS};
    use crate::infrastructure::repositories::memory::{MemoryDatabase, MemorySessionRepository};
    use secrecy::SecretString;

    fn create_test_service() -> SessionServiceImpl<MemorySessionRepository> {
        let repository = MemorySessionRepository::new(Arc::new(MemoryDatabase::new()));
        SessionServiceImpl::new(
            Arc::new(repository),
            HmacHasher::new(SecretString::from("test-hmac-key")),
        )
    }

    #[test]
    fn given_started_session_when_looked_up_by_token_then_found() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();
        let expires_at = default_expiry(Utc::now(), DEFAULT_SESSION_TTL_DAYS);

        let session = service.start(&ctx, "u-1", Some(expires_at)).unwrap();
        let found = service.by_remember_token(&ctx, &session.remember_token).unwrap();

        assert_eq!(session.remember_token.len(), 44);
        assert_eq!(found.user_uuid, "u-1");
        assert_eq!(found.remember_token_expires_at, Some(expires_at));
        assert_ne!(found.remember_token_hash, session.remember_token);
    }

    #[test]
    fn given_unknown_token_when_looked_up_then_session_not_found() {
        let service = create_test_service();
        let err = service
            .by_remember_token(&RequestContext::anonymous(), "unknown")
            .unwrap_err();

        assert!(matches!(err.domain(), Some(DomainError::SessionNotFound)));
    }

    #[test]
    fn given_deleted_session_when_looked_up_then_gone() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();
        let session = service.start(&ctx, "u-1", None).unwrap();

        service
            .delete_by_remember_token(&ctx, &session.remember_token)
            .unwrap();

        assert!(service.by_remember_token(&ctx, &session.remember_token).is_err());
    }

    #[test]
    fn given_empty_token_when_added_then_rejected() {
        let service = create_test_service();
        let err = service
            .add(&RequestContext::anonymous(), &Session::new("u-1", "", None))
            .unwrap_err();

        assert!(matches!(err.domain(), Some(DomainError::RememberTokenRequired)));
    }

    #[test]
    fn given_repeated_logouts_when_purged_before_rotation_then_one_rotated_session_kept() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();
        let live = service
            .start(&ctx, "u-1", Some(default_expiry(Utc::now(), DEFAULT_SESSION_TTL_DAYS)))
            .unwrap();

        let mut rotated = Vec::new();
        for _ in 0..3 {
            service.purge_expired(&ctx, "u-1").unwrap();
            rotated.push(service.start(&ctx, "u-1", None).unwrap());
        }

        assert!(service.by_remember_token(&ctx, &live.remember_token).is_ok());
        assert!(service.by_remember_token(&ctx, &rotated[0].remember_token).is_err());
        assert!(service.by_remember_token(&ctx, &rotated[1].remember_token).is_err());
        assert!(service.by_remember_token(&ctx, &rotated[2].remember_token).is_ok());
        assert_eq!(service.purge_expired(&ctx, "u-1").unwrap(), 1);
        assert_eq!(service.purge_expired(&ctx, "u-1").unwrap(), 0);
    }
}
