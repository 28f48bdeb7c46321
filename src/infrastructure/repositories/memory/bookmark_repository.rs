// src/infrastructure/repositories/memory/bookmark_repository.rs
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::bookmark::{Bookmark, Visibility};
use crate::domain::context::RequestContext;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::repositories::repository::BookmarkRepository;
use crate::domain::search::WebSearchQuery;
use crate::domain::tag::{sort_tags, Tag};

use super::{page, MemoryDatabase, Tables};

#[derive(Debug, Clone, Default)]
pub struct MemoryBookmarkRepository {
    db: Arc<MemoryDatabase>,
}

impl MemoryBookmarkRepository {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }
}

fn conflict(b: &Bookmark) -> DomainError {
    DomainError::StoreConflict(format!("bookmark url already stored for user: {}", b.url))
}

fn position_by_url(tables: &Tables, user_uuid: &str, url: &str) -> Option<usize> {
    tables
        .bookmarks
        .iter()
        .position(|b| b.user_uuid == user_uuid && b.url == url)
}

/// Bookmarks of a user matching the visibility, newest first.
fn newest_first<'a>(
    tables: &'a Tables,
    user_uuid: &'a str,
    visibility: Visibility,
) -> Vec<&'a Bookmark> {
    let mut out: Vec<&Bookmark> = tables
        .bookmarks
        .iter()
        .filter(|b| b.user_uuid == user_uuid && visibility.matches(b.private))
        .collect();
    out.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.uid.cmp(&a.uid))
    });
    out
}

fn matching_search<'a>(
    tables: &'a Tables,
    user_uuid: &'a str,
    visibility: Visibility,
    query: &WebSearchQuery,
) -> Vec<&'a Bookmark> {
    newest_first(tables, user_uuid, visibility)
        .into_iter()
        .filter(|b| query.matches(&b.full_text_string()))
        .collect()
}

fn tag_counts(
    tables: &Tables,
    user_uuid: &str,
    visibility: Visibility,
    filter: Option<&str>,
) -> Vec<Tag> {
    let filter = filter.map(str::to_ascii_lowercase);
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for bookmark in tables
        .bookmarks
        .iter()
        .filter(|b| b.user_uuid == user_uuid && visibility.matches(b.private))
    {
        for tag in &bookmark.tags {
            if let Some(f) = &filter {
                if !tag.to_ascii_lowercase().contains(f.as_str()) {
                    continue;
                }
            }
            *counts.entry(tag.as_str()).or_insert(0) += 1;
        }
    }
    let mut tags: Vec<Tag> = counts
        .into_iter()
        .map(|(name, count)| Tag::new(name, count))
        .collect();
    sort_tags(&mut tags);
    tags
}

impl BookmarkRepository for MemoryBookmarkRepository {
    fn add(&self, ctx: &RequestContext, bookmark: &Bookmark) -> DomainResult<()> {
        let mut tables = self.db.write(ctx)?;
        if position_by_url(&tables, &bookmark.user_uuid, &bookmark.url).is_some()
            || tables.bookmarks.iter().any(|b| b.uid == bookmark.uid)
        {
            return Err(conflict(bookmark));
        }
        tables.bookmarks.push(bookmark.clone());
        Ok(())
    }

    fn add_many(&self, ctx: &RequestContext, bookmarks: &[Bookmark]) -> DomainResult<u64> {
        self.db.transaction(ctx, |tables| {
            let mut inserted = 0;
            for bookmark in bookmarks {
                ctx.ensure_active()?;
                if position_by_url(tables, &bookmark.user_uuid, &bookmark.url).is_some() {
                    continue;
                }
                tables.bookmarks.push(bookmark.clone());
                inserted += 1;
            }
            Ok(inserted)
        })
    }

    fn upsert_many(&self, ctx: &RequestContext, bookmarks: &[Bookmark]) -> DomainResult<u64> {
        self.db.transaction(ctx, |tables| {
            let mut written = 0;
            for bookmark in bookmarks {
                ctx.ensure_active()?;
                match position_by_url(tables, &bookmark.user_uuid, &bookmark.url) {
                    Some(i) => {
                        let stored = &mut tables.bookmarks[i];
                        stored.title = bookmark.title.clone();
                        stored.description = bookmark.description.clone();
                        stored.private = bookmark.private;
                        stored.tags = bookmark.tags.clone();
                        stored.created_at = bookmark.created_at;
                        stored.updated_at = bookmark.updated_at;
                    }
                    None => tables.bookmarks.push(bookmark.clone()),
                }
                written += 1;
            }
            Ok(written)
        })
    }

    fn update(&self, ctx: &RequestContext, bookmark: &Bookmark) -> DomainResult<()> {
        let mut tables = self.db.write(ctx)?;
        if tables.bookmarks.iter().any(|b| {
            b.user_uuid == bookmark.user_uuid && b.url == bookmark.url && b.uid != bookmark.uid
        }) {
            return Err(conflict(bookmark));
        }
        let stored = tables
            .bookmarks
            .iter_mut()
            .find(|b| b.user_uuid == bookmark.user_uuid && b.uid == bookmark.uid)
            .ok_or(DomainError::BookmarkNotFound)?;
        stored.url = bookmark.url.clone();
        stored.title = bookmark.title.clone();
        stored.description = bookmark.description.clone();
        stored.private = bookmark.private;
        stored.tags = bookmark.tags.clone();
        stored.updated_at = bookmark.updated_at;
        Ok(())
    }

    fn tag_update_many(&self, ctx: &RequestContext, bookmarks: &[Bookmark]) -> DomainResult<u64> {
        self.db.transaction(ctx, |tables| {
            let mut updated = 0;
            for bookmark in bookmarks {
                ctx.ensure_active()?;
                if let Some(stored) = tables
                    .bookmarks
                    .iter_mut()
                    .find(|b| b.user_uuid == bookmark.user_uuid && b.uid == bookmark.uid)
                {
                    stored.tags = bookmark.tags.clone();
                    stored.updated_at = bookmark.updated_at;
                    updated += 1;
                }
            }
            Ok(updated)
        })
    }

    fn delete(&self, ctx: &RequestContext, user_uuid: &str, uid: &str) -> DomainResult<bool> {
        let mut tables = self.db.write(ctx)?;
        let before = tables.bookmarks.len();
        tables
            .bookmarks
            .retain(|b| !(b.user_uuid == user_uuid && b.uid == uid));
        Ok(tables.bookmarks.len() != before)
    }

    fn get_by_uid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uid: &str,
    ) -> DomainResult<Option<Bookmark>> {
        let tables = self.db.read(ctx)?;
        Ok(tables
            .bookmarks
            .iter()
            .find(|b| b.user_uuid == user_uuid && b.uid == uid)
            .cloned())
    }

    fn get_by_url(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        url: &str,
    ) -> DomainResult<Option<Bookmark>> {
        let tables = self.db.read(ctx)?;
        Ok(position_by_url(&tables, user_uuid, url).map(|i| tables.bookmarks[i].clone()))
    }

    fn get_by_tag(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        tag: &str,
    ) -> DomainResult<Vec<Bookmark>> {
        let tables = self.db.read(ctx)?;
        Ok(tables
            .bookmarks
            .iter()
            .filter(|b| b.user_uuid == user_uuid && b.has_tag(tag))
            .cloned()
            .collect())
    }

    fn get_all(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
    ) -> DomainResult<Vec<Bookmark>> {
        let tables = self.db.read(ctx)?;
        let mut out: Vec<Bookmark> = newest_first(&tables, user_uuid, visibility)
            .into_iter()
            .cloned()
            .collect();
        out.reverse();
        Ok(out)
    }

    fn is_url_registered(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        url: &str,
    ) -> DomainResult<bool> {
        let tables = self.db.read(ctx)?;
        Ok(position_by_url(&tables, user_uuid, url).is_some())
    }

    fn is_url_registered_to_another_uid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        url: &str,
        uid: &str,
    ) -> DomainResult<bool> {
        let tables = self.db.read(ctx)?;
        Ok(tables
            .bookmarks
            .iter()
            .any(|b| b.user_uuid == user_uuid && b.url == url && b.uid != uid))
    }

    fn count(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
    ) -> DomainResult<u32> {
        let tables = self.db.read(ctx)?;
        Ok(newest_first(&tables, user_uuid, visibility).len() as u32)
    }

    fn get_n(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        n: u32,
        offset: u32,
    ) -> DomainResult<Vec<Bookmark>> {
        let tables = self.db.read(ctx)?;
        let all: Vec<Bookmark> = newest_first(&tables, user_uuid, visibility)
            .into_iter()
            .cloned()
            .collect();
        Ok(page(all, n, offset))
    }

    fn search_count(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        query: &WebSearchQuery,
    ) -> DomainResult<u32> {
        let tables = self.db.read(ctx)?;
        Ok(matching_search(&tables, user_uuid, visibility, query).len() as u32)
    }

    fn search_n(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        query: &WebSearchQuery,
        n: u32,
        offset: u32,
    ) -> DomainResult<Vec<Bookmark>> {
        let tables = self.db.read(ctx)?;
        let all: Vec<Bookmark> = matching_search(&tables, user_uuid, visibility, query)
            .into_iter()
            .cloned()
            .collect();
        Ok(page(all, n, offset))
    }

    fn get_public_by_uid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uid: &str,
    ) -> DomainResult<Option<Bookmark>> {
        let tables = self.db.read(ctx)?;
        Ok(tables
            .bookmarks
            .iter()
            .find(|b| b.user_uuid == user_uuid && b.uid == uid && !b.private)
            .cloned())
    }

    fn tags_by_count(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
    ) -> DomainResult<Vec<Tag>> {
        let tables = self.db.read(ctx)?;
        Ok(tag_counts(&tables, user_uuid, visibility, None))
    }

    fn tag_count(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        filter: Option<&str>,
    ) -> DomainResult<u32> {
        let tables = self.db.read(ctx)?;
        Ok(tag_counts(&tables, user_uuid, visibility, filter).len() as u32)
    }

    fn tags_n(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        filter: Option<&str>,
        n: u32,
        offset: u32,
    ) -> DomainResult<Vec<Tag>> {
        let tables = self.db.read(ctx)?;
        Ok(page(tag_counts(&tables, user_uuid, visibility, filter), n, offset))
    }
}
