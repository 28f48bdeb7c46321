// src/infrastructure/repositories/sqlite/user_repository.rs
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Bool;
use diesel::sqlite::Sqlite;
use tracing::instrument;

use super::connection::{ConnectionPool, PooledConnection};
use super::error::SqliteRepositoryError;
use super::model::DbUser;
use super::schema::users;
use super::schema::users::dsl;
use crate::domain::context::RequestContext;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::repositories::user_repository::UserRepository;
use crate::domain::user::{InfoUpdate, User};

type UserPredicate = Box<dyn BoxableExpression<users::table, Sqlite, SqlType = Bool>>;

#[derive(Clone, Debug)]
pub struct SqliteUserRepository {
    pool: ConnectionPool,
}

impl SqliteUserRepository {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    fn connection(&self, ctx: &RequestContext) -> DomainResult<PooledConnection> {
        ctx.ensure_active()?;
        Ok(self.pool.get().map_err(SqliteRepositoryError::from)?)
    }

    fn find(&self, ctx: &RequestContext, predicate: UserPredicate) -> DomainResult<Option<User>> {
        let mut conn = self.connection(ctx)?;
        let row = users::table
            .filter(predicate)
            .select(DbUser::as_select())
            .first(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(row.map(User::from))
    }

    fn exists(&self, ctx: &RequestContext, predicate: UserPredicate) -> DomainResult<bool> {
        Ok(self.find(ctx, predicate)?.is_some())
    }
}

impl UserRepository for SqliteUserRepository {
    #[instrument(skip(self, ctx), level = "debug")]
    fn add(&self, ctx: &RequestContext, user: &User) -> DomainResult<()> {
        let mut conn = self.connection(ctx)?;
        diesel::insert_into(dsl::users)
            .values(DbUser::from(user))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn delete_by_uuid(&self, ctx: &RequestContext, uuid: &str) -> DomainResult<bool> {
        let mut conn = self.connection(ctx)?;
        let deleted = diesel::delete(dsl::users.filter(dsl::uuid.eq(uuid)))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(deleted > 0)
    }

    fn get_all(&self, ctx: &RequestContext) -> DomainResult<Vec<User>> {
        let mut conn = self.connection(ctx)?;
        let rows = dsl::users
            .order(dsl::nick_name.asc())
            .select(DbUser::as_select())
            .load(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    fn get_by_email(&self, ctx: &RequestContext, email: &str) -> DomainResult<Option<User>> {
        self.find(ctx, Box::new(dsl::email.eq(email.to_string())))
    }

    fn get_by_nick_name(
        &self,
        ctx: &RequestContext,
        nick_name: &str,
    ) -> DomainResult<Option<User>> {
        self.find(ctx, Box::new(dsl::nick_name.eq(nick_name.to_string())))
    }

    fn get_by_uuid(&self, ctx: &RequestContext, uuid: &str) -> DomainResult<Option<User>> {
        self.find(ctx, Box::new(dsl::uuid.eq(uuid.to_string())))
    }

    fn is_email_registered(&self, ctx: &RequestContext, email: &str) -> DomainResult<bool> {
        self.exists(ctx, Box::new(dsl::email.eq(email.to_string())))
    }

    fn is_email_registered_to_another_user(
        &self,
        ctx: &RequestContext,
        email: &str,
        uuid: &str,
    ) -> DomainResult<bool> {
        self.exists(
            ctx,
            Box::new(
                dsl::email
                    .eq(email.to_string())
                    .and(dsl::uuid.ne(uuid.to_string())),
            ),
        )
    }

    fn is_nick_name_registered(
        &self,
        ctx: &RequestContext,
        nick_name: &str,
    ) -> DomainResult<bool> {
        self.exists(ctx, Box::new(dsl::nick_name.eq(nick_name.to_string())))
    }

    fn is_nick_name_registered_to_another_user(
        &self,
        ctx: &RequestContext,
        nick_name: &str,
        uuid: &str,
    ) -> DomainResult<bool> {
        self.exists(
            ctx,
            Box::new(
                dsl::nick_name
                    .eq(nick_name.to_string())
                    .and(dsl::uuid.ne(uuid.to_string())),
            ),
        )
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn update_info(
        &self,
        ctx: &RequestContext,
        info: &InfoUpdate,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut conn = self.connection(ctx)?;
        let updated = diesel::update(dsl::users.filter(dsl::uuid.eq(&info.uuid)))
            .set((
                dsl::email.eq(&info.email),
                dsl::nick_name.eq(&info.nick_name),
                dsl::display_name.eq(&info.display_name),
                dsl::updated_at.eq(updated_at.naive_utc()),
            ))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        if updated == 0 {
            return Err(DomainError::UserNotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, ctx, password_hash), level = "debug")]
    fn update_password_hash(
        &self,
        ctx: &RequestContext,
        uuid: &str,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut conn = self.connection(ctx)?;
        let updated = diesel::update(dsl::users.filter(dsl::uuid.eq(uuid)))
            .set((
                dsl::password_hash.eq(password_hash),
                dsl::updated_at.eq(updated_at.naive_utc()),
            ))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        if updated == 0 {
            return Err(DomainError::UserNotFound);
        }
        Ok(())
    }
}
