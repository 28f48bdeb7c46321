// src/domain/repositories/user_repository.rs
use chrono::{DateTime, Utc};

use crate::domain::context::RequestContext;
use crate::domain::error::DomainResult;
use crate::domain::user::{InfoUpdate, User};

pub trait UserRepository: std::fmt::Debug + Send + Sync {
    fn add(&self, ctx: &RequestContext, user: &User) -> DomainResult<()>;

    /// Delete a user and every row they own
    fn delete_by_uuid(&self, ctx: &RequestContext, uuid: &str) -> DomainResult<bool>;

    fn get_all(&self, ctx: &RequestContext) -> DomainResult<Vec<User>>;

    fn get_by_email(&self, ctx: &RequestContext, email: &str) -> DomainResult<Option<User>>;

    fn get_by_nick_name(&self, ctx: &RequestContext, nick_name: &str)
        -> DomainResult<Option<User>>;

    fn get_by_uuid(&self, ctx: &RequestContext, uuid: &str) -> DomainResult<Option<User>>;

    fn is_email_registered(&self, ctx: &RequestContext, email: &str) -> DomainResult<bool>;

    fn is_email_registered_to_another_user(
        &self,
        ctx: &RequestContext,
        email: &str,
        uuid: &str,
    ) -> DomainResult<bool>;

    fn is_nick_name_registered(&self, ctx: &RequestContext, nick_name: &str)
        -> DomainResult<bool>;

    fn is_nick_name_registered_to_another_user(
        &self,
        ctx: &RequestContext,
        nick_name: &str,
        uuid: &str,
    ) -> DomainResult<bool>;

    fn update_info(
        &self,
        ctx: &RequestContext,
        info: &InfoUpdate,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()>;

    fn update_password_hash(
        &self,
        ctx: &RequestContext,
        uuid: &str,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()>;
}
