// src/infrastructure/repositories/memory/mod.rs
//! In-memory stores backing service tests.
//!
//! All four stores share one [`MemoryDatabase`] so that deleting a user
//! cascades to the rows they own, as it does in SQLite.
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::bookmark::Bookmark;
use crate::domain::context::RequestContext;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::feed::{Category, Entry, EntryMetadata, Feed, Preferences, Subscription};
use crate::domain::session::Session;
use crate::domain::user::User;

pub mod bookmark_repository;
pub mod feed_repository;
pub mod session_repository;
pub mod user_repository;

pub use bookmark_repository::MemoryBookmarkRepository;
pub use feed_repository::MemoryFeedRepository;
pub use session_repository::MemorySessionRepository;
pub use user_repository::MemoryUserRepository;

#[derive(Debug, Default, Clone)]
pub(crate) struct Tables {
    pub users: Vec<User>,
    /// Insertion order is kept; listings sort explicitly.
    pub bookmarks: Vec<Bookmark>,
    /// Keyed by remember token hash.
    pub sessions: HashMap<String, Session>,
    pub feeds: Vec<Feed>,
    pub categories: Vec<Category>,
    pub subscriptions: Vec<Subscription>,
    pub entries: Vec<Entry>,
    /// Keyed by `(user_uuid, entry_uid)`.
    pub entry_metadata: HashMap<(String, String), EntryMetadata>,
    pub preferences: HashMap<String, Preferences>,
}

#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: RwLock<Tables>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read(&self, ctx: &RequestContext) -> DomainResult<RwLockReadGuard<'_, Tables>> {
        ctx.ensure_active()?;
        self.tables
            .read()
            .map_err(|_| DomainError::RepositoryError("in-memory store lock poisoned".to_string()))
    }

    pub(crate) fn write(&self, ctx: &RequestContext) -> DomainResult<RwLockWriteGuard<'_, Tables>> {
        ctx.ensure_active()?;
        self.tables
            .write()
            .map_err(|_| DomainError::RepositoryError("in-memory store lock poisoned".to_string()))
    }

    /// Runs `f` against a copy of the tables and commits it only when `f` succeeds.
    pub(crate) fn transaction<T, F>(&self, ctx: &RequestContext, f: F) -> DomainResult<T>
    where
        F: FnOnce(&mut Tables) -> DomainResult<T>,
    {
        let mut tables = self.write(ctx)?;
        let mut staged = tables.clone();
        let out = f(&mut staged)?;
        *tables = staged;
        Ok(out)
    }
}

/// Applies offset/limit to an already ordered listing.
pub(crate) fn page<T>(items: Vec<T>, n: u32, offset: u32) -> Vec<T> {
    items
        .into_iter()
        .skip(offset as usize)
        .take(n as usize)
        .collect()
}
