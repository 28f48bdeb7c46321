// src/domain/repositories/repository.rs

use crate::domain::bookmark::{Bookmark, Visibility};
use crate::domain::context::RequestContext;
use crate::domain::error::DomainResult;
use crate::domain::search::WebSearchQuery;
use crate::domain::tag::Tag;

/*
   Bookmark store.
   Every call takes the request context and fails with `Cancelled` once it is
   cancelled; batched writes run in one transaction. A `(user_uuid, url)`
   collision surfaces as `StoreConflict`.
*/
pub trait BookmarkRepository: std::fmt::Debug + Send + Sync {
    /// Insert a new bookmark
    fn add(&self, ctx: &RequestContext, bookmark: &Bookmark) -> DomainResult<()>;

    /// Insert bookmarks whose `(user_uuid, url)` is not stored yet; returns the number inserted
    fn add_many(&self, ctx: &RequestContext, bookmarks: &[Bookmark]) -> DomainResult<u64>;

    /// Insert or replace bookmarks keyed by `(user_uuid, url)`; returns the number written
    fn upsert_many(&self, ctx: &RequestContext, bookmarks: &[Bookmark]) -> DomainResult<u64>;

    /// Update an existing bookmark; `BookmarkNotFound` if its UID is unknown
    fn update(&self, ctx: &RequestContext, bookmark: &Bookmark) -> DomainResult<()>;

    /// Rewrite tags and update time of existing bookmarks; returns the number updated
    fn tag_update_many(&self, ctx: &RequestContext, bookmarks: &[Bookmark]) -> DomainResult<u64>;

    /// Delete a bookmark; `false` when nothing was deleted
    fn delete(&self, ctx: &RequestContext, user_uuid: &str, uid: &str) -> DomainResult<bool>;

    fn get_by_uid(&self, ctx: &RequestContext, user_uuid: &str, uid: &str)
        -> DomainResult<Option<Bookmark>>;

    fn get_by_url(&self, ctx: &RequestContext, user_uuid: &str, url: &str)
        -> DomainResult<Option<Bookmark>>;

    /// All bookmarks of a user carrying `tag`
    fn get_by_tag(&self, ctx: &RequestContext, user_uuid: &str, tag: &str)
        -> DomainResult<Vec<Bookmark>>;

    /// All bookmarks matching the visibility, oldest first
    fn get_all(&self, ctx: &RequestContext, user_uuid: &str, visibility: Visibility)
        -> DomainResult<Vec<Bookmark>>;

    fn is_url_registered(&self, ctx: &RequestContext, user_uuid: &str, url: &str)
        -> DomainResult<bool>;

    fn is_url_registered_to_another_uid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        url: &str,
        uid: &str,
    ) -> DomainResult<bool>;

    fn count(&self, ctx: &RequestContext, user_uuid: &str, visibility: Visibility)
        -> DomainResult<u32>;

    /// At most `n` bookmarks starting at `offset`, newest first
    fn get_n(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        n: u32,
        offset: u32,
    ) -> DomainResult<Vec<Bookmark>>;

    fn search_count(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        query: &WebSearchQuery,
    ) -> DomainResult<u32>;

    /// Full-text variant of `get_n`
    fn search_n(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        query: &WebSearchQuery,
        n: u32,
        offset: u32,
    ) -> DomainResult<Vec<Bookmark>>;

    /// A public bookmark by UID; private or unknown bookmarks yield `None`
    fn get_public_by_uid(&self, ctx: &RequestContext, user_uuid: &str, uid: &str)
        -> DomainResult<Option<Bookmark>>;

    /// All tags, count descending then name ascending
    fn tags_by_count(&self, ctx: &RequestContext, user_uuid: &str, visibility: Visibility)
        -> DomainResult<Vec<Tag>>;

    /// Number of distinct tags, optionally restricted to names containing `filter`
    fn tag_count(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        filter: Option<&str>,
    ) -> DomainResult<u32>;

    fn tags_n(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        filter: Option<&str>,
        n: u32,
        offset: u32,
    ) -> DomainResult<Vec<Tag>>;
}
