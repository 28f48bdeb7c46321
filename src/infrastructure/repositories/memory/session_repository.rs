// src/infrastructure/repositories/memory/session_repository.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::context::RequestContext;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::repositories::session_repository::SessionRepository;
use crate::domain::session::Session;

use super::MemoryDatabase;

#[derive(Debug, Clone, Default)]
pub struct MemorySessionRepository {
    db: Arc<MemoryDatabase>,
}

impl MemorySessionRepository {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }
}

impl SessionRepository for MemorySessionRepository {
    fn add(&self, ctx: &RequestContext, session: &Session) -> DomainResult<()> {
        let mut tables = self.db.write(ctx)?;
        if tables.sessions.contains_key(&session.remember_token_hash) {
            return Err(DomainError::StoreConflict("session already stored".to_string()));
        }
        let mut stored = session.clone();
        stored.remember_token.clear();
        tables
            .sessions
            .insert(session.remember_token_hash.clone(), stored);
        Ok(())
    }

    fn get_by_remember_token_hash(
        &self,
        ctx: &RequestContext,
        hash: &str,
    ) -> DomainResult<Option<Session>> {
        let tables = self.db.read(ctx)?;
        Ok(tables.sessions.get(hash).cloned())
    }

    fn delete_by_remember_token_hash(
        &self,
        ctx: &RequestContext,
        hash: &str,
    ) -> DomainResult<bool> {
        let mut tables = self.db.write(ctx)?;
        Ok(tables.sessions.remove(hash).is_some())
    }

    fn delete_expired_by_user_uuid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<usize> {
        let mut tables = self.db.write(ctx)?;
        let before = tables.sessions.len();
        tables
            .sessions
            .retain(|_, s| s.user_uuid != user_uuid || !s.is_expired_at(now));
        Ok(before - tables.sessions.len())
    }
}
