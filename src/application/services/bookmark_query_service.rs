// src/application/services/bookmark_query_service.rs
use std::fmt::Debug;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::error::ApplicationResult;
use crate::domain::bookmark::{validate_uid, Bookmark, Visibility};
use crate::domain::context::RequestContext;
use crate::domain::error::DomainError;
use crate::domain::pagination::{check_page_number, page_count, PageMetadata};
use crate::domain::repositories::repository::BookmarkRepository;
use crate::domain::repositories::user_repository::UserRepository;
use crate::domain::search::WebSearchQuery;
use crate::domain::tag::Tag;
use crate::domain::user::Owner;

const BOOKMARKS_PER_PAGE: u32 = 20;
const TAGS_PER_PAGE: u32 = 90;

/// A page of bookmarks with its owner and pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookmarkPage {
    pub page: PageMetadata,
    pub owner: Owner,
    pub search_terms: String,
    pub bookmarks: Vec<Bookmark>,
}

/// A page of tags, ordered by count then name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagPage {
    pub page: PageMetadata,
    pub filter_term: String,
    pub tags: Vec<Tag>,
}

/// Read-side service for bookmark listings, search and tag indexes
pub trait BookmarkQueryService: Send + Sync + Debug {
    /// Resolve the public view of a user from their handle
    fn owner_by_nick_name(&self, ctx: &RequestContext, nick_name: &str)
        -> ApplicationResult<Owner>;

    /// Bookmarks of `owner_uuid` matching the visibility, newest first
    fn bookmarks_by_page(
        &self,
        ctx: &RequestContext,
        owner_uuid: &str,
        visibility: Visibility,
        number: u32,
    ) -> ApplicationResult<BookmarkPage>;

    /// Like `bookmarks_by_page`, restricted to a web-search query
    fn bookmarks_by_search_query_and_page(
        &self,
        ctx: &RequestContext,
        owner_uuid: &str,
        visibility: Visibility,
        search_terms: &str,
        number: u32,
    ) -> ApplicationResult<BookmarkPage>;

    fn public_bookmarks_by_page(
        &self,
        ctx: &RequestContext,
        owner_uuid: &str,
        number: u32,
    ) -> ApplicationResult<BookmarkPage> {
        self.bookmarks_by_page(ctx, owner_uuid, Visibility::Public, number)
    }

    /// A single public bookmark; private or unknown UIDs yield an empty page
    fn public_bookmark_by_uid(
        &self,
        ctx: &RequestContext,
        owner_uuid: &str,
        uid: &str,
    ) -> ApplicationResult<BookmarkPage>;

    /// All tags of a user, count descending then name ascending
    fn tags(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
    ) -> ApplicationResult<Vec<Tag>>;

    fn tags_by_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        number: u32,
    ) -> ApplicationResult<TagPage>;

    /// Tags whose name contains `filter_term`, ignoring case
    fn tags_by_filter_query_and_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        filter_term: &str,
        number: u32,
    ) -> ApplicationResult<TagPage>;
}

#[derive(Debug)]
pub struct BookmarkQueryServiceImpl<B: BookmarkRepository, U: UserRepository> {
    bookmarks: Arc<B>,
    users: Arc<U>,
}

impl<B: BookmarkRepository, U: UserRepository> BookmarkQueryServiceImpl<B, U> {
    pub fn new(bookmarks: Arc<B>, users: Arc<U>) -> Self {
        Self { bookmarks, users }
    }

    fn owner(&self, ctx: &RequestContext, owner_uuid: &str) -> ApplicationResult<Owner> {
        self.users
            .get_by_uuid(ctx, owner_uuid)?
            .map(|u| u.owner())
            .ok_or_else(|| DomainError::OwnerNotFound.into())
    }

    /// Validates `number` against `count` and returns the page metadata.
    fn paginate(number: u32, count: u32, per_page: u32) -> ApplicationResult<PageMetadata> {
        let total_pages = page_count(count, per_page);
        check_page_number(number, total_pages, count)?;
        Ok(PageMetadata::new(number, total_pages, per_page, count))
    }

    fn tag_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        filter: Option<&str>,
        number: u32,
    ) -> ApplicationResult<TagPage> {
        if number < 1 {
            return Err(DomainError::PageNumberOutOfBounds.into());
        }
        let count = self.bookmarks.tag_count(ctx, user_uuid, visibility, filter)?;
        let page = Self::paginate(number, count, TAGS_PER_PAGE)?;
        let tags = if count == 0 {
            Vec::new()
        } else {
            self.bookmarks.tags_n(
                ctx,
                user_uuid,
                visibility,
                filter,
                TAGS_PER_PAGE,
                page.db_offset,
            )?
        };
        Ok(TagPage {
            page,
            filter_term: filter.unwrap_or_default().to_string(),
            tags,
        })
    }
}

impl<B: BookmarkRepository, U: UserRepository> BookmarkQueryService
    for BookmarkQueryServiceImpl<B, U>
{
    #[instrument(skip(self, ctx), level = "debug")]
    fn owner_by_nick_name(
        &self,
        ctx: &RequestContext,
        nick_name: &str,
    ) -> ApplicationResult<Owner> {
        self.users
            .get_by_nick_name(ctx, nick_name)?
            .map(|u| u.owner())
            .ok_or_else(|| DomainError::OwnerNotFound.into())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn bookmarks_by_page(
        &self,
        ctx: &RequestContext,
        owner_uuid: &str,
        visibility: Visibility,
        number: u32,
    ) -> ApplicationResult<BookmarkPage> {
        let owner = self.owner(ctx, owner_uuid)?;
        if number < 1 {
            return Err(DomainError::PageNumberOutOfBounds.into());
        }

        let count = self.bookmarks.count(ctx, owner_uuid, visibility)?;
        let page = Self::paginate(number, count, BOOKMARKS_PER_PAGE)?;
        let bookmarks = if count == 0 {
            Vec::new()
        } else {
            self.bookmarks.get_n(
                ctx,
                owner_uuid,
                visibility,
                BOOKMARKS_PER_PAGE,
                page.db_offset,
            )?
        };

        Ok(BookmarkPage {
            page,
            owner,
            search_terms: String::new(),
            bookmarks,
        })
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn bookmarks_by_search_query_and_page(
        &self,
        ctx: &RequestContext,
        owner_uuid: &str,
        visibility: Visibility,
        search_terms: &str,
        number: u32,
    ) -> ApplicationResult<BookmarkPage> {
        let owner = self.owner(ctx, owner_uuid)?;
        if number < 1 {
            return Err(DomainError::PageNumberOutOfBounds.into());
        }

        let query = WebSearchQuery::parse(search_terms);
        let count = self
            .bookmarks
            .search_count(ctx, owner_uuid, visibility, &query)?;
        let page = Self::paginate(number, count, BOOKMARKS_PER_PAGE)?;
        let bookmarks = if count == 0 {
            Vec::new()
        } else {
            self.bookmarks.search_n(
                ctx,
                owner_uuid,
                visibility,
                &query,
                BOOKMARKS_PER_PAGE,
                page.db_offset,
            )?
        };

        Ok(BookmarkPage {
            page,
            owner,
            search_terms: search_terms.to_string(),
            bookmarks,
        })
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn public_bookmark_by_uid(
        &self,
        ctx: &RequestContext,
        owner_uuid: &str,
        uid: &str,
    ) -> ApplicationResult<BookmarkPage> {
        let owner = self.owner(ctx, owner_uuid)?;

        // a malformed UID cannot name a stored bookmark
        let bookmarks: Vec<Bookmark> = match validate_uid(uid) {
            Ok(()) => self
                .bookmarks
                .get_public_by_uid(ctx, owner_uuid, uid)?
                .into_iter()
                .collect(),
            Err(e) => {
                debug!("Ignoring permalink lookup: {}", e);
                Vec::new()
            }
        };

        Ok(BookmarkPage {
            page: PageMetadata::new(1, 1, BOOKMARKS_PER_PAGE, bookmarks.len() as u32),
            owner,
            search_terms: String::new(),
            bookmarks,
        })
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn tags(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
    ) -> ApplicationResult<Vec<Tag>> {
        Ok(self.bookmarks.tags_by_count(ctx, user_uuid, visibility)?)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn tags_by_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        number: u32,
    ) -> ApplicationResult<TagPage> {
        self.tag_page(ctx, user_uuid, visibility, None, number)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn tags_by_filter_query_and_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        filter_term: &str,
        number: u32,
    ) -> ApplicationResult<TagPage> {
        let filter_term = filter_term.trim();
        let filter = (!filter_term.is_empty()).then_some(filter_term);
        self.tag_page(ctx, user_uuid, visibility, filter, number)
    }
}
