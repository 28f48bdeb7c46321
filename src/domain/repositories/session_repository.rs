// src/domain/repositories/session_repository.rs
use chrono::{DateTime, Utc};

use crate::domain::context::RequestContext;
use crate::domain::error::DomainResult;
use crate::domain::session::Session;

pub trait SessionRepository: std::fmt::Debug + Send + Sync {
    /// Persist a session keyed by its remember token hash
    fn add(&self, ctx: &RequestContext, session: &Session) -> DomainResult<()>;

    fn get_by_remember_token_hash(
        &self,
        ctx: &RequestContext,
        hash: &str,
    ) -> DomainResult<Option<Session>>;

    fn delete_by_remember_token_hash(&self, ctx: &RequestContext, hash: &str)
        -> DomainResult<bool>;

    /// Delete the user's sessions that expired at `now` or carry no expiry
    fn delete_expired_by_user_uuid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<usize>;
}
