// src/application/services/feed_query_service.rs
use std::fmt::Debug;
use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::application::error::ApplicationResult;
use crate::domain::context::RequestContext;
use crate::domain::error::DomainError;
use crate::domain::feed::{Preferences, Subscription};
use crate::domain::feed_query::{
    EntryScope, SubscribedFeedEntry, SubscribedFeedsByCategory, SubscriptionView,
};
use crate::domain::pagination::{check_page_number, page_count, PageMetadata};
use crate::domain::repositories::feed_repository::FeedRepository;
use crate::domain::search::WebSearchQuery;

const ENTRIES_PER_PAGE: u32 = 20;

/// A page of feed entries with the subscription sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedPage {
    pub page: PageMetadata,
    /// "All", the category name, or the subscription's display title.
    pub header: String,
    pub search_terms: String,
    /// Unread entries across every subscription of the user.
    pub unread: u32,
    pub categories: Vec<SubscribedFeedsByCategory>,
    pub entries: Vec<SubscribedFeedEntry>,
    pub preferences: Preferences,
}

/// Read-side service for feed entry listings and subscription lookups
pub trait FeedQueryService: Send + Sync + Debug {
    fn feeds_by_page(&self, ctx: &RequestContext, user_uuid: &str, number: u32)
        -> ApplicationResult<FeedPage>;

    fn feeds_by_query_and_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        search_terms: &str,
        number: u32,
    ) -> ApplicationResult<FeedPage>;

    fn feeds_by_category_and_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        category_slug: &str,
        number: u32,
    ) -> ApplicationResult<FeedPage>;

    fn feeds_by_category_and_query_and_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        category_slug: &str,
        search_terms: &str,
        number: u32,
    ) -> ApplicationResult<FeedPage>;

    fn feeds_by_subscription_and_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        subscription_uuid: &str,
        number: u32,
    ) -> ApplicationResult<FeedPage>;

    fn feeds_by_subscription_and_query_and_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        subscription_uuid: &str,
        search_terms: &str,
        number: u32,
    ) -> ApplicationResult<FeedPage>;

    /// Subscriptions grouped by category with unread counts
    fn subscriptions_by_category(&self, ctx: &RequestContext, user_uuid: &str)
        -> ApplicationResult<Vec<SubscribedFeedsByCategory>>;

    fn subscription_by_uuid(&self, ctx: &RequestContext, user_uuid: &str, uuid: &str)
        -> ApplicationResult<SubscriptionView>;

    fn subscription_by_feed(&self, ctx: &RequestContext, user_uuid: &str, feed_uuid: &str)
        -> ApplicationResult<Subscription>;
}

#[derive(Debug)]
pub struct FeedQueryServiceImpl<R: FeedRepository> {
    repository: Arc<R>,
}

impl<R: FeedRepository> FeedQueryServiceImpl<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Resolves a URL-level scope to a store scope and its page header.
    fn resolve_scope(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        scope: ScopeRef<'_>,
    ) -> ApplicationResult<(EntryScope, String)> {
        match scope {
            ScopeRef::All => Ok((EntryScope::All, "All".to_string())),
            ScopeRef::CategorySlug(slug) => {
                let category = self
                    .repository
                    .category_get_by_slug(ctx, user_uuid, slug)?
                    .ok_or(DomainError::CategoryNotFound)?;
                Ok((EntryScope::Category(category.uuid), category.name))
            }
            ScopeRef::Subscription(uuid) => {
                let view = self.subscription_by_uuid(ctx, user_uuid, uuid)?;
                let header = if view.alias.is_empty() {
                    view.feed_title
                } else {
                    view.alias
                };
                Ok((EntryScope::Subscription(view.uuid), header))
            }
        }
    }

    fn feed_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        scope: ScopeRef<'_>,
        search_terms: Option<&str>,
        number: u32,
    ) -> ApplicationResult<FeedPage> {
        if number < 1 {
            return Err(DomainError::PageNumberOutOfBounds.into());
        }
        let (scope, header) = self.resolve_scope(ctx, user_uuid, scope)?;
        let preferences = self
            .repository
            .preferences_get(ctx, user_uuid)?
            .unwrap_or_else(|| Preferences::default_for(user_uuid));
        let show = preferences.show_entries;

        let query = search_terms.map(WebSearchQuery::parse);
        let count = self
            .repository
            .entry_count(ctx, user_uuid, &scope, show, query.as_ref())?;
        let total_pages = page_count(count, ENTRIES_PER_PAGE);
        check_page_number(number, total_pages, count)?;
        let page = PageMetadata::new(number, total_pages, ENTRIES_PER_PAGE, count);

        let entries = if count == 0 {
            Vec::new()
        } else {
            self.repository.entries_n(
                ctx,
                user_uuid,
                &scope,
                show,
                query.as_ref(),
                ENTRIES_PER_PAGE,
                page.db_offset,
            )?
        };

        let categories = self.repository.subscribed_feeds_by_category(ctx, user_uuid)?;
        Ok(FeedPage {
            page,
            header,
            search_terms: search_terms.unwrap_or_default().to_string(),
            unread: categories.iter().map(|c| c.unread).sum(),
            categories,
            entries,
            preferences,
        })
    }
}

/// Listing scope as addressed in URLs: categories by slug, subscriptions by UUID.
#[derive(Debug, Clone, Copy)]
enum ScopeRef<'a> {
    All,
    CategorySlug(&'a str),
    Subscription(&'a str),
}

impl<R: FeedRepository> FeedQueryService for FeedQueryServiceImpl<R> {
    #[instrument(skip(self, ctx), level = "debug")]
    fn feeds_by_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        number: u32,
    ) -> ApplicationResult<FeedPage> {
        self.feed_page(ctx, user_uuid, ScopeRef::All, None, number)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn feeds_by_query_and_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        search_terms: &str,
        number: u32,
    ) -> ApplicationResult<FeedPage> {
        self.feed_page(ctx, user_uuid, ScopeRef::All, Some(search_terms), number)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn feeds_by_category_and_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        category_slug: &str,
        number: u32,
    ) -> ApplicationResult<FeedPage> {
        self.feed_page(ctx, user_uuid, ScopeRef::CategorySlug(category_slug), None, number)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn feeds_by_category_and_query_and_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        category_slug: &str,
        search_terms: &str,
        number: u32,
    ) -> ApplicationResult<FeedPage> {
        self.feed_page(
            ctx,
            user_uuid,
            ScopeRef::CategorySlug(category_slug),
            Some(search_terms),
            number,
        )
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn feeds_by_subscription_and_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        subscription_uuid: &str,
        number: u32,
    ) -> ApplicationResult<FeedPage> {
        self.feed_page(
            ctx,
            user_uuid,
            ScopeRef::Subscription(subscription_uuid),
            None,
            number,
        )
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn feeds_by_subscription_and_query_and_page(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        subscription_uuid: &str,
        search_terms: &str,
        number: u32,
    ) -> ApplicationResult<FeedPage> {
        self.feed_page(
            ctx,
            user_uuid,
            ScopeRef::Subscription(subscription_uuid),
            Some(search_terms),
            number,
        )
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn subscriptions_by_category(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
    ) -> ApplicationResult<Vec<SubscribedFeedsByCategory>> {
        Ok(self.repository.subscribed_feeds_by_category(ctx, user_uuid)?)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn subscription_by_uuid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
    ) -> ApplicationResult<SubscriptionView> {
        if uuid.is_empty() {
            return Err(DomainError::SubscriptionUuidRequired.into());
        }
        self.repository
            .subscription_view_by_uuid(ctx, user_uuid, uuid)?
            .ok_or_else(|| DomainError::SubscriptionNotFound.into())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn subscription_by_feed(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        feed_uuid: &str,
    ) -> ApplicationResult<Subscription> {
        self.repository
            .subscription_get_by_feed(ctx, user_uuid, feed_uuid)?
            .ok_or_else(|| DomainError::SubscriptionNotFound.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::feed_service::{FeedService, FeedServiceImpl};
    use crate::domain::feed::{Category, Entry, EntryVisibility};
    use crate::infrastructure::repositories::memory::{MemoryDatabase, MemoryFeedRepository};
    use chrono::{Duration, TimeZone, Utc};

    const USER: &str = "4fae6d3c-9a5b-4c7d-be8f-2a3b4c5d6e7f";

    struct Fixture {
        feeds: FeedServiceImpl<MemoryFeedRepository>,
        queries: FeedQueryServiceImpl<MemoryFeedRepository>,
        ctx: RequestContext,
    }

    fn fixture() -> Fixture {
        let repository = Arc::new(MemoryFeedRepository::new(Arc::new(MemoryDatabase::new())));
        Fixture {
            feeds: FeedServiceImpl::new(repository.clone()),
            queries: FeedQueryServiceImpl::new(repository),
            ctx: RequestContext::anonymous(),
        }
    }

    /// Subscribes to `url` under `category` and ingests `n` hourly entries.
    fn subscribe_with_entries(
        f: &Fixture,
        category: &Category,
        url: &str,
        alias: &str,
        n: usize,
    ) -> Subscription {
        let sub = f
            .feeds
            .subscribe(&f.ctx, USER, &category.uuid, url, alias)
            .unwrap();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let entries = (0..n)
            .map(|i| {
                Entry::new(
                    "",
                    format!("{url}/{i}"),
                    format!("Entry {i} from {alias}"),
                    base + Duration::hours(i as i64),
                )
                .with_summary(if i % 2 == 0 { "rust release notes" } else { "gardening" })
            })
            .collect();
        f.feeds.add_entries(&f.ctx, &sub.feed_uuid, entries).unwrap();
        sub
    }

    #[test]
    fn given_entries_across_feeds_when_listed_then_newest_first_with_unread_total() {
        let f = fixture();
        let tech = f.feeds.add_category(&f.ctx, Category::new(USER, "Tech")).unwrap();
        subscribe_with_entries(&f, &tech, "https://a.test/feed", "A", 15);
        subscribe_with_entries(&f, &tech, "https://b.test/feed", "B", 10);

        let first = f.queries.feeds_by_page(&f.ctx, USER, 1).unwrap();
        let second = f.queries.feeds_by_page(&f.ctx, USER, 2).unwrap();

        assert_eq!(first.header, "All");
        assert_eq!(first.page.item_count, 25);
        assert_eq!(first.page.total_pages, 2);
        assert_eq!(first.entries.len(), 20);
        assert_eq!(second.entries.len(), 5);
        assert_eq!(first.unread, 25);
        assert!(first
            .entries
            .windows(2)
            .all(|w| w[0].entry.published_at >= w[1].entry.published_at));
        assert!(f.queries.feeds_by_page(&f.ctx, USER, 3).is_err());
    }

    #[test]
    fn given_category_slug_when_listed_then_scoped_with_category_header() {
        let f = fixture();
        let tech = f.feeds.add_category(&f.ctx, Category::new(USER, "Tech News")).unwrap();
        let other = f.feeds.add_category(&f.ctx, Category::new(USER, "Other")).unwrap();
        subscribe_with_entries(&f, &tech, "https://a.test/feed", "A", 3);
        subscribe_with_entries(&f, &other, "https://b.test/feed", "B", 4);

        let page = f
            .queries
            .feeds_by_category_and_page(&f.ctx, USER, "tech-news", 1)
            .unwrap();

        assert_eq!(page.header, "Tech News");
        assert_eq!(page.entries.len(), 3);
        assert_eq!(page.unread, 7);
        assert!(matches!(
            f.queries
                .feeds_by_category_and_page(&f.ctx, USER, "missing", 1)
                .unwrap_err()
                .domain(),
            Some(DomainError::CategoryNotFound)
        ));
    }

    #[test]
    fn given_subscription_alias_when_listed_then_header_uses_alias() {
        let f = fixture();
        let tech = f.feeds.add_category(&f.ctx, Category::new(USER, "Tech")).unwrap();
        let sub = subscribe_with_entries(&f, &tech, "https://a.test/feed", "Alpha", 2);

        let page = f
            .queries
            .feeds_by_subscription_and_page(&f.ctx, USER, &sub.uuid, 1)
            .unwrap();

        assert_eq!(page.header, "Alpha");
        assert!(page.entries.iter().all(|e| e.subscription_alias == "Alpha"));
    }

    #[test]
    fn given_search_terms_when_listed_then_only_matching_entries() {
        let f = fixture();
        let tech = f.feeds.add_category(&f.ctx, Category::new(USER, "Tech")).unwrap();
        subscribe_with_entries(&f, &tech, "https://a.test/feed", "A", 6);

        let page = f
            .queries
            .feeds_by_query_and_page(&f.ctx, USER, "rust -gardening", 1)
            .unwrap();
        assert_eq!(page.entries.len(), 3);
        assert_eq!(page.search_terms, "rust -gardening");

        let empty = f.queries.feeds_by_query_and_page(&f.ctx, USER, "", 1).unwrap();
        assert!(empty.entries.is_empty());
    }

    #[test]
    fn given_unread_preference_when_listed_then_read_entries_hidden() {
        let f = fixture();
        let tech = f.feeds.add_category(&f.ctx, Category::new(USER, "Tech")).unwrap();
        subscribe_with_entries(&f, &tech, "https://a.test/feed", "A", 4);

        let page = f.queries.feeds_by_page(&f.ctx, USER, 1).unwrap();
        f.feeds
            .toggle_entry_read(&f.ctx, USER, &page.entries[0].entry.uid)
            .unwrap();

        let mut prefs = f.feeds.preferences(&f.ctx, USER).unwrap();
        prefs.show_entries = EntryVisibility::Unread;
        f.feeds.update_preferences(&f.ctx, prefs).unwrap();

        let page = f.queries.feeds_by_page(&f.ctx, USER, 1).unwrap();
        assert_eq!(page.entries.len(), 3);
        assert!(page.entries.iter().all(|e| !e.read));
        assert_eq!(page.unread, 3);
    }

    #[test]
    fn given_subscriptions_when_grouped_then_unread_per_feed() {
        let f = fixture();
        let tech = f.feeds.add_category(&f.ctx, Category::new(USER, "Tech")).unwrap();
        let news = f.feeds.add_category(&f.ctx, Category::new(USER, "News")).unwrap();
        let a = subscribe_with_entries(&f, &tech, "https://a.test/feed", "A", 2);
        subscribe_with_entries(&f, &news, "https://b.test/feed", "B", 5);
        f.feeds
            .mark_all_entries_as_read_by_subscription(&f.ctx, USER, &a.uuid)
            .unwrap();

        let grouped = f.queries.subscriptions_by_category(&f.ctx, USER).unwrap();

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].category.name, "News");
        assert_eq!(grouped[0].unread, 5);
        assert_eq!(grouped[1].category.name, "Tech");
        assert_eq!(grouped[1].subscribed_feeds[0].unread, 0);

        let by_feed = f.queries.subscription_by_feed(&f.ctx, USER, &a.feed_uuid).unwrap();
        assert_eq!(by_feed.uuid, a.uuid);
        let view = f.queries.subscription_by_uuid(&f.ctx, USER, &a.uuid).unwrap();
        assert_eq!(view.feed_url, "https://a.test/feed");
    }
}
