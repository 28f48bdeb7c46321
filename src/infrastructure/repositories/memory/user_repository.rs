// src/infrastructure/repositories/memory/user_repository.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::context::RequestContext;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::repositories::user_repository::UserRepository;
use crate::domain::user::{InfoUpdate, User};

use super::MemoryDatabase;

#[derive(Debug, Clone, Default)]
pub struct MemoryUserRepository {
    db: Arc<MemoryDatabase>,
}

impl MemoryUserRepository {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }
}

/// Stored copy of a user: the clear password never reaches the store.
fn stored(user: &User) -> User {
    let mut user = user.clone();
    user.password.clear();
    user
}

impl UserRepository for MemoryUserRepository {
    fn add(&self, ctx: &RequestContext, user: &User) -> DomainResult<()> {
        let mut tables = self.db.write(ctx)?;
        if tables.users.iter().any(|u| {
            u.uuid == user.uuid || u.email == user.email || u.nick_name == user.nick_name
        }) {
            return Err(DomainError::StoreConflict(format!(
                "user already stored: {}",
                user.nick_name
            )));
        }
        tables.users.push(stored(user));
        Ok(())
    }

    fn delete_by_uuid(&self, ctx: &RequestContext, uuid: &str) -> DomainResult<bool> {
        self.db.transaction(ctx, |tables| {
            let before = tables.users.len();
            tables.users.retain(|u| u.uuid != uuid);
            if tables.users.len() == before {
                return Ok(false);
            }
            tables.bookmarks.retain(|b| b.user_uuid != uuid);
            tables.sessions.retain(|_, s| s.user_uuid != uuid);
            tables.categories.retain(|c| c.user_uuid != uuid);
            tables.subscriptions.retain(|s| s.user_uuid != uuid);
            tables.entry_metadata.retain(|_, m| m.user_uuid != uuid);
            tables.preferences.remove(uuid);
            Ok(true)
        })
    }

    fn get_all(&self, ctx: &RequestContext) -> DomainResult<Vec<User>> {
        let tables = self.db.read(ctx)?;
        let mut users = tables.users.clone();
        users.sort_by(|a, b| a.nick_name.cmp(&b.nick_name));
        Ok(users)
    }

    fn get_by_email(&self, ctx: &RequestContext, email: &str) -> DomainResult<Option<User>> {
        let tables = self.db.read(ctx)?;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    fn get_by_nick_name(
        &self,
        ctx: &RequestContext,
        nick_name: &str,
    ) -> DomainResult<Option<User>> {
        let tables = self.db.read(ctx)?;
        Ok(tables.users.iter().find(|u| u.nick_name == nick_name).cloned())
    }

    fn get_by_uuid(&self, ctx: &RequestContext, uuid: &str) -> DomainResult<Option<User>> {
        let tables = self.db.read(ctx)?;
        Ok(tables.users.iter().find(|u| u.uuid == uuid).cloned())
    }

    fn is_email_registered(&self, ctx: &RequestContext, email: &str) -> DomainResult<bool> {
        let tables = self.db.read(ctx)?;
        Ok(tables.users.iter().any(|u| u.email == email))
    }

    fn is_email_registered_to_another_user(
        &self,
        ctx: &RequestContext,
        email: &str,
        uuid: &str,
    ) -> DomainResult<bool> {
        let tables = self.db.read(ctx)?;
        Ok(tables.users.iter().any(|u| u.email == email && u.uuid != uuid))
    }

    fn is_nick_name_registered(
        &self,
        ctx: &RequestContext,
        nick_name: &str,
    ) -> DomainResult<bool> {
        let tables = self.db.read(ctx)?;
        Ok(tables.users.iter().any(|u| u.nick_name == nick_name))
    }

    fn is_nick_name_registered_to_another_user(
        &self,
        ctx: &RequestContext,
        nick_name: &str,
        uuid: &str,
    ) -> DomainResult<bool> {
        let tables = self.db.read(ctx)?;
        Ok(tables
            .users
            .iter()
            .any(|u| u.nick_name == nick_name && u.uuid != uuid))
    }

    fn update_info(
        &self,
        ctx: &RequestContext,
        info: &InfoUpdate,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut tables = self.db.write(ctx)?;
        if tables.users.iter().any(|u| {
            u.uuid != info.uuid && (u.email == info.email || u.nick_name == info.nick_name)
        }) {
            return Err(DomainError::StoreConflict(format!(
                "user already stored: {}",
                info.nick_name
            )));
        }
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.uuid == info.uuid)
            .ok_or(DomainError::UserNotFound)?;
        user.email = info.email.clone();
        user.nick_name = info.nick_name.clone();
        user.display_name = info.display_name.clone();
        user.updated_at = updated_at;
        Ok(())
    }

    fn update_password_hash(
        &self,
        ctx: &RequestContext,
        uuid: &str,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut tables = self.db.write(ctx)?;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.uuid == uuid)
            .ok_or(DomainError::UserNotFound)?;
        user.password_hash = password_hash.to_string();
        user.updated_at = updated_at;
        Ok(())
    }
}
