// src/domain/repositories/feed_repository.rs
use chrono::{DateTime, Utc};

use crate::domain::context::RequestContext;
use crate::domain::error::DomainResult;
use crate::domain::feed::{Category, Entry, EntryMetadata, EntryVisibility, Feed, Preferences, Subscription};
use crate::domain::feed_query::{
    EntryScope, SubscribedFeedEntry, SubscribedFeedsByCategory, SubscriptionView,
};
use crate::domain::search::WebSearchQuery;

/// Store for feeds, categories, subscriptions, entries and per-user read state.
pub trait FeedRepository: std::fmt::Debug + Send + Sync {
    // Feeds
    fn feed_create(&self, ctx: &RequestContext, feed: &Feed) -> DomainResult<()>;

    fn feed_get_by_url(&self, ctx: &RequestContext, feed_url: &str) -> DomainResult<Option<Feed>>;

    fn feed_get_by_uuid(&self, ctx: &RequestContext, uuid: &str) -> DomainResult<Option<Feed>>;

    // Categories
    fn category_create(&self, ctx: &RequestContext, category: &Category) -> DomainResult<()>;

    fn category_update(&self, ctx: &RequestContext, category: &Category) -> DomainResult<()>;

    /// Delete a category and the subscriptions filed under it
    fn category_delete(&self, ctx: &RequestContext, user_uuid: &str, uuid: &str)
        -> DomainResult<bool>;

    fn category_get_by_uuid(&self, ctx: &RequestContext, user_uuid: &str, uuid: &str)
        -> DomainResult<Option<Category>>;

    fn category_get_by_name(&self, ctx: &RequestContext, user_uuid: &str, name: &str)
        -> DomainResult<Option<Category>>;

    fn category_get_by_slug(&self, ctx: &RequestContext, user_uuid: &str, slug: &str)
        -> DomainResult<Option<Category>>;

    /// All categories of a user, by name
    fn category_get_many(&self, ctx: &RequestContext, user_uuid: &str)
        -> DomainResult<Vec<Category>>;

    fn category_name_and_slug_are_registered(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        name: &str,
        slug: &str,
    ) -> DomainResult<bool>;

    fn category_name_and_slug_are_registered_to_another_category(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
        name: &str,
        slug: &str,
    ) -> DomainResult<bool>;

    // Subscriptions
    fn subscription_create(&self, ctx: &RequestContext, subscription: &Subscription)
        -> DomainResult<()>;

    fn subscription_update(&self, ctx: &RequestContext, subscription: &Subscription)
        -> DomainResult<()>;

    fn subscription_delete(&self, ctx: &RequestContext, user_uuid: &str, uuid: &str)
        -> DomainResult<bool>;

    fn subscription_get_by_uuid(&self, ctx: &RequestContext, user_uuid: &str, uuid: &str)
        -> DomainResult<Option<Subscription>>;

    fn subscription_get_by_feed(&self, ctx: &RequestContext, user_uuid: &str, feed_uuid: &str)
        -> DomainResult<Option<Subscription>>;

    fn subscription_is_registered(&self, ctx: &RequestContext, user_uuid: &str, feed_uuid: &str)
        -> DomainResult<bool>;

    // Entries
    /// Insert entries not yet known by `(feed_uuid, url)`; returns the number inserted
    fn entry_create_many(&self, ctx: &RequestContext, entries: &[Entry]) -> DomainResult<u64>;

    fn entry_get_by_uid(&self, ctx: &RequestContext, uid: &str) -> DomainResult<Option<Entry>>;

    fn entry_metadata_get(&self, ctx: &RequestContext, user_uuid: &str, entry_uid: &str)
        -> DomainResult<Option<EntryMetadata>>;

    fn entry_metadata_upsert(&self, ctx: &RequestContext, metadata: &EntryMetadata)
        -> DomainResult<()>;

    /// Mark every entry in scope as read; returns the number of entries touched
    fn entry_mark_all_as_read(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        scope: &EntryScope,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<u64>;

    // Preferences
    fn preferences_get(&self, ctx: &RequestContext, user_uuid: &str)
        -> DomainResult<Option<Preferences>>;

    fn preferences_upsert(&self, ctx: &RequestContext, preferences: &Preferences)
        -> DomainResult<()>;

    // Queries
    /// Subscriptions grouped by category, with unread counts; categories by name, feeds by title
    fn subscribed_feeds_by_category(&self, ctx: &RequestContext, user_uuid: &str)
        -> DomainResult<Vec<SubscribedFeedsByCategory>>;

    fn subscription_view_by_uuid(&self, ctx: &RequestContext, user_uuid: &str, uuid: &str)
        -> DomainResult<Option<SubscriptionView>>;

    fn entry_count(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        scope: &EntryScope,
        show: EntryVisibility,
        query: Option<&WebSearchQuery>,
    ) -> DomainResult<u32>;

    /// At most `n` entries starting at `offset`, newest publication first
    #[allow(clippy::too_many_arguments)]
    fn entries_n(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        scope: &EntryScope,
        show: EntryVisibility,
        query: Option<&WebSearchQuery>,
        n: u32,
        offset: u32,
    ) -> DomainResult<Vec<SubscribedFeedEntry>>;
}
