// src/application/services/bookmark_service.rs
use crate::application::error::ApplicationResult;
use crate::domain::bookmark::{Bookmark, TagDeleteQuery, TagUpdateQuery};
use crate::domain::context::RequestContext;
use std::fmt::Debug;

/// Service interface for bookmark mutations and direct lookups
pub trait BookmarkService: Send + Sync + Debug {
    /// Add a new bookmark; the service assigns UID and timestamps
    fn add(&self, ctx: &RequestContext, bookmark: Bookmark) -> ApplicationResult<Bookmark>;

    /// Update an existing bookmark identified by its UID
    fn update(&self, ctx: &RequestContext, bookmark: Bookmark) -> ApplicationResult<Bookmark>;

    /// Delete a bookmark; `BookmarkNotFound` when nothing was deleted
    fn delete(&self, ctx: &RequestContext, user_uuid: &str, uid: &str) -> ApplicationResult<()>;

    fn by_uid(&self, ctx: &RequestContext, user_uuid: &str, uid: &str)
        -> ApplicationResult<Bookmark>;

    fn by_url(&self, ctx: &RequestContext, user_uuid: &str, url: &str)
        -> ApplicationResult<Bookmark>;

    /// Remove a tag from every bookmark carrying it; returns the number of bookmarks rewritten
    fn delete_tag(&self, ctx: &RequestContext, query: TagDeleteQuery) -> ApplicationResult<u64>;

    /// Rename a tag on every bookmark carrying it; returns the number of bookmarks rewritten
    fn update_tag(&self, ctx: &RequestContext, query: TagUpdateQuery) -> ApplicationResult<u64>;
}
