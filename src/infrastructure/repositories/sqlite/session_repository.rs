// src/infrastructure/repositories/sqlite/session_repository.rs
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tracing::instrument;

use super::connection::{ConnectionPool, PooledConnection};
use super::error::SqliteRepositoryError;
use super::model::DbSession;
use super::schema::sessions::dsl;
use crate::domain::context::RequestContext;
use crate::domain::error::DomainResult;
use crate::domain::repositories::session_repository::SessionRepository;
use crate::domain::session::Session;

/// Remember-me sessions; only the token hash is persisted.
#[derive(Clone, Debug)]
pub struct SqliteSessionRepository {
    pool: ConnectionPool,
}

impl SqliteSessionRepository {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    fn connection(&self, ctx: &RequestContext) -> DomainResult<PooledConnection> {
        ctx.ensure_active()?;
        Ok(self.pool.get().map_err(SqliteRepositoryError::from)?)
    }
}

impl SessionRepository for SqliteSessionRepository {
    #[instrument(skip_all, level = "debug", fields(user_uuid = %session.user_uuid))]
    fn add(&self, ctx: &RequestContext, session: &Session) -> DomainResult<()> {
        let mut conn = self.connection(ctx)?;
        diesel::insert_into(dsl::sessions)
            .values(DbSession::from(session))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(())
    }

    fn get_by_remember_token_hash(
        &self,
        ctx: &RequestContext,
        hash: &str,
    ) -> DomainResult<Option<Session>> {
        let mut conn = self.connection(ctx)?;
        let row = dsl::sessions
            .filter(dsl::remember_token_hash.eq(hash))
            .select(DbSession::as_select())
            .first(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(row.map(Session::from))
    }

    #[instrument(skip_all, level = "debug")]
    fn delete_by_remember_token_hash(
        &self,
        ctx: &RequestContext,
        hash: &str,
    ) -> DomainResult<bool> {
        let mut conn = self.connection(ctx)?;
        let deleted = diesel::delete(dsl::sessions.filter(dsl::remember_token_hash.eq(hash)))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(deleted > 0)
    }

    #[instrument(skip_all, level = "debug", fields(user_uuid = %user_uuid))]
    fn delete_expired_by_user_uuid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<usize> {
        let mut conn = self.connection(ctx)?;
        let deleted = diesel::delete(
            dsl::sessions.filter(dsl::user_uuid.eq(user_uuid)).filter(
                dsl::remember_token_expires_at
                    .is_null()
                    .or(dsl::remember_token_expires_at.le(now.naive_utc())),
            ),
        )
        .execute(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;
    use crate::util::testing::{sqlite_user, TestDatabase};
    use chrono::{TimeZone, Utc};
    use serial_test::serial;

    #[test]
    #[serial]
    fn given_session_when_stored_then_token_is_not_persisted() {
        let db = TestDatabase::new();
        let user = sqlite_user(&db.pool, "ann");
        let repo = SqliteSessionRepository::new(db.pool.clone());
        let ctx = RequestContext::anonymous();
        let expires = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let mut session = Session::new(&user.uuid, "clear-token", Some(expires));
        session.remember_token_hash = "token-hash".to_string();

        repo.add(&ctx, &session).unwrap();

        let stored = repo
            .get_by_remember_token_hash(&ctx, "token-hash")
            .unwrap()
            .unwrap();
        assert!(stored.remember_token.is_empty());
        assert_eq!(stored.user_uuid, user.uuid);
        assert_eq!(stored.remember_token_expires_at, Some(expires));
        assert!(matches!(repo.add(&ctx, &session), Err(DomainError::StoreConflict(_))));

        assert!(repo.delete_by_remember_token_hash(&ctx, "token-hash").unwrap());
        assert!(!repo.delete_by_remember_token_hash(&ctx, "token-hash").unwrap());
    }

    #[test]
    #[serial]
    fn given_rotated_and_expired_sessions_when_purged_then_only_live_ones_remain() {
        let db = TestDatabase::new();
        let ann = sqlite_user(&db.pool, "ann");
        let bob = sqlite_user(&db.pool, "bob");
        let repo = SqliteSessionRepository::new(db.pool.clone());
        let ctx = RequestContext::anonymous();
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let stored = |user_uuid: &str, hash: &str, expires_at| {
            let mut session = Session::new(user_uuid, "clear-token", expires_at);
            session.remember_token_hash = hash.to_string();
            repo.add(&ctx, &session).unwrap();
        };
        stored(&ann.uuid, "rotated", None);
        stored(&ann.uuid, "expired", Some(now - chrono::Duration::days(1)));
        stored(&ann.uuid, "live", Some(now + chrono::Duration::days(1)));
        stored(&bob.uuid, "other-user", None);

        assert_eq!(repo.delete_expired_by_user_uuid(&ctx, &ann.uuid, now).unwrap(), 2);

        assert!(repo.get_by_remember_token_hash(&ctx, "live").unwrap().is_some());
        assert!(repo.get_by_remember_token_hash(&ctx, "rotated").unwrap().is_none());
        assert!(repo.get_by_remember_token_hash(&ctx, "expired").unwrap().is_none());
        assert!(repo.get_by_remember_token_hash(&ctx, "other-user").unwrap().is_some());
    }
}
