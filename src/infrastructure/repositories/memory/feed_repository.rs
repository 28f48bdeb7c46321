// src/infrastructure/repositories/memory/feed_repository.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::context::RequestContext;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::feed::{
    Category, Entry, EntryMetadata, EntryVisibility, Feed, Preferences, Subscription,
};
use crate::domain::feed_query::{
    EntryScope, SubscribedFeed, SubscribedFeedEntry, SubscribedFeedsByCategory, SubscriptionView,
};
use crate::domain::repositories::feed_repository::FeedRepository;
use crate::domain::search::WebSearchQuery;

use super::{page, MemoryDatabase, Tables};

#[derive(Debug, Clone, Default)]
pub struct MemoryFeedRepository {
    db: Arc<MemoryDatabase>,
}

impl MemoryFeedRepository {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }
}

fn is_read(tables: &Tables, user_uuid: &str, entry_uid: &str) -> bool {
    tables
        .entry_metadata
        .get(&(user_uuid.to_string(), entry_uid.to_string()))
        .is_some_and(|m| m.read)
}

/// Subscriptions of a user that fall within the scope.
fn scoped_subscriptions<'a>(
    tables: &'a Tables,
    user_uuid: &'a str,
    scope: &'a EntryScope,
) -> impl Iterator<Item = &'a Subscription> + 'a {
    tables.subscriptions.iter().filter(move |s| {
        s.user_uuid == user_uuid
            && match scope {
                EntryScope::All => true,
                EntryScope::Category(uuid) => &s.category_uuid == uuid,
                EntryScope::Subscription(uuid) => &s.uuid == uuid,
            }
    })
}

/// Entries visible through the scope, newest publication first.
fn scoped_entries(
    tables: &Tables,
    user_uuid: &str,
    scope: &EntryScope,
    show: EntryVisibility,
    query: Option<&WebSearchQuery>,
) -> Vec<SubscribedFeedEntry> {
    let mut out = Vec::new();
    for subscription in scoped_subscriptions(tables, user_uuid, scope) {
        let feed_title = tables
            .feeds
            .iter()
            .find(|f| f.uuid == subscription.feed_uuid)
            .map(|f| f.title.clone())
            .unwrap_or_default();
        for entry in tables
            .entries
            .iter()
            .filter(|e| e.feed_uuid == subscription.feed_uuid)
        {
            let read = is_read(tables, user_uuid, &entry.uid);
            if !show.matches(read) {
                continue;
            }
            if let Some(q) = query {
                if !q.matches(&entry.full_text_string()) {
                    continue;
                }
            }
            out.push(SubscribedFeedEntry {
                entry: entry.clone(),
                subscription_alias: subscription.alias.clone(),
                feed_title: feed_title.clone(),
                read,
            });
        }
    }
    out.sort_by(|a, b| {
        b.entry
            .published_at
            .cmp(&a.entry.published_at)
            .then_with(|| b.entry.uid.cmp(&a.entry.uid))
    });
    out
}

fn category_clash(tables: &Tables, category: &Category, exclude_self: bool) -> bool {
    tables.categories.iter().any(|c| {
        c.user_uuid == category.user_uuid
            && (!exclude_self || c.uuid != category.uuid)
            && (c.name == category.name || c.slug == category.slug)
    })
}

impl FeedRepository for MemoryFeedRepository {
    fn feed_create(&self, ctx: &RequestContext, feed: &Feed) -> DomainResult<()> {
        let mut tables = self.db.write(ctx)?;
        if tables
            .feeds
            .iter()
            .any(|f| f.uuid == feed.uuid || f.feed_url == feed.feed_url)
        {
            return Err(DomainError::StoreConflict(format!(
                "feed already stored: {}",
                feed.feed_url
            )));
        }
        tables.feeds.push(feed.clone());
        Ok(())
    }

    fn feed_get_by_url(&self, ctx: &RequestContext, feed_url: &str) -> DomainResult<Option<Feed>> {
        let tables = self.db.read(ctx)?;
        Ok(tables.feeds.iter().find(|f| f.feed_url == feed_url).cloned())
    }

    fn feed_get_by_uuid(&self, ctx: &RequestContext, uuid: &str) -> DomainResult<Option<Feed>> {
        let tables = self.db.read(ctx)?;
        Ok(tables.feeds.iter().find(|f| f.uuid == uuid).cloned())
    }

    fn category_create(&self, ctx: &RequestContext, category: &Category) -> DomainResult<()> {
        let mut tables = self.db.write(ctx)?;
        if category_clash(&tables, category, false) {
            return Err(DomainError::StoreConflict(format!(
                "category already stored: {}",
                category.slug
            )));
        }
        tables.categories.push(category.clone());
        Ok(())
    }

    fn category_update(&self, ctx: &RequestContext, category: &Category) -> DomainResult<()> {
        let mut tables = self.db.write(ctx)?;
        if category_clash(&tables, category, true) {
            return Err(DomainError::StoreConflict(format!(
                "category already stored: {}",
                category.slug
            )));
        }
        let stored = tables
            .categories
            .iter_mut()
            .find(|c| c.user_uuid == category.user_uuid && c.uuid == category.uuid)
            .ok_or(DomainError::CategoryNotFound)?;
        stored.name = category.name.clone();
        stored.slug = category.slug.clone();
        stored.updated_at = category.updated_at;
        Ok(())
    }

    fn category_delete(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
    ) -> DomainResult<bool> {
        self.db.transaction(ctx, |tables| {
            let before = tables.categories.len();
            tables
                .categories
                .retain(|c| !(c.user_uuid == user_uuid && c.uuid == uuid));
            if tables.categories.len() == before {
                return Ok(false);
            }
            tables
                .subscriptions
                .retain(|s| !(s.user_uuid == user_uuid && s.category_uuid == uuid));
            Ok(true)
        })
    }

    fn category_get_by_uuid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
    ) -> DomainResult<Option<Category>> {
        let tables = self.db.read(ctx)?;
        Ok(tables
            .categories
            .iter()
            .find(|c| c.user_uuid == user_uuid && c.uuid == uuid)
            .cloned())
    }

    fn category_get_by_name(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        name: &str,
    ) -> DomainResult<Option<Category>> {
        let tables = self.db.read(ctx)?;
        Ok(tables
            .categories
            .iter()
            .find(|c| c.user_uuid == user_uuid && c.name == name)
            .cloned())
    }

    fn category_get_by_slug(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        slug: &str,
    ) -> DomainResult<Option<Category>> {
        let tables = self.db.read(ctx)?;
        Ok(tables
            .categories
            .iter()
            .find(|c| c.user_uuid == user_uuid && c.slug == slug)
            .cloned())
    }

    fn category_get_many(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
    ) -> DomainResult<Vec<Category>> {
        let tables = self.db.read(ctx)?;
        let mut categories: Vec<Category> = tables
            .categories
            .iter()
            .filter(|c| c.user_uuid == user_uuid)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    fn category_name_and_slug_are_registered(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        name: &str,
        slug: &str,
    ) -> DomainResult<bool> {
        let tables = self.db.read(ctx)?;
        Ok(tables
            .categories
            .iter()
            .any(|c| c.user_uuid == user_uuid && (c.name == name || c.slug == slug)))
    }

    fn category_name_and_slug_are_registered_to_another_category(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
        name: &str,
        slug: &str,
    ) -> DomainResult<bool> {
        let tables = self.db.read(ctx)?;
        Ok(tables.categories.iter().any(|c| {
            c.user_uuid == user_uuid && c.uuid != uuid && (c.name == name || c.slug == slug)
        }))
    }

    fn subscription_create(
        &self,
        ctx: &RequestContext,
        subscription: &Subscription,
    ) -> DomainResult<()> {
        let mut tables = self.db.write(ctx)?;
        if tables.subscriptions.iter().any(|s| {
            s.uuid == subscription.uuid
                || (s.user_uuid == subscription.user_uuid && s.feed_uuid == subscription.feed_uuid)
        }) {
            return Err(DomainError::StoreConflict(
                "subscription already stored".to_string(),
            ));
        }
        tables.subscriptions.push(subscription.clone());
        Ok(())
    }

    fn subscription_update(
        &self,
        ctx: &RequestContext,
        subscription: &Subscription,
    ) -> DomainResult<()> {
        let mut tables = self.db.write(ctx)?;
        let stored = tables
            .subscriptions
            .iter_mut()
            .find(|s| s.user_uuid == subscription.user_uuid && s.uuid == subscription.uuid)
            .ok_or(DomainError::SubscriptionNotFound)?;
        stored.category_uuid = subscription.category_uuid.clone();
        stored.alias = subscription.alias.clone();
        stored.updated_at = subscription.updated_at;
        Ok(())
    }

    fn subscription_delete(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
    ) -> DomainResult<bool> {
        let mut tables = self.db.write(ctx)?;
        let before = tables.subscriptions.len();
        tables
            .subscriptions
            .retain(|s| !(s.user_uuid == user_uuid && s.uuid == uuid));
        Ok(tables.subscriptions.len() != before)
    }

    fn subscription_get_by_uuid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
    ) -> DomainResult<Option<Subscription>> {
        let tables = self.db.read(ctx)?;
        Ok(tables
            .subscriptions
            .iter()
            .find(|s| s.user_uuid == user_uuid && s.uuid == uuid)
            .cloned())
    }

    fn subscription_get_by_feed(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        feed_uuid: &str,
    ) -> DomainResult<Option<Subscription>> {
        let tables = self.db.read(ctx)?;
        Ok(tables
            .subscriptions
            .iter()
            .find(|s| s.user_uuid == user_uuid && s.feed_uuid == feed_uuid)
            .cloned())
    }

    fn subscription_is_registered(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        feed_uuid: &str,
    ) -> DomainResult<bool> {
        let tables = self.db.read(ctx)?;
        Ok(tables
            .subscriptions
            .iter()
            .any(|s| s.user_uuid == user_uuid && s.feed_uuid == feed_uuid))
    }

    fn entry_create_many(&self, ctx: &RequestContext, entries: &[Entry]) -> DomainResult<u64> {
        self.db.transaction(ctx, |tables| {
            let mut inserted = 0;
            for entry in entries {
                ctx.ensure_active()?;
                if tables
                    .entries
                    .iter()
                    .any(|e| e.feed_uuid == entry.feed_uuid && e.url == entry.url)
                {
                    continue;
                }
                tables.entries.push(entry.clone());
                inserted += 1;
            }
            Ok(inserted)
        })
    }

    fn entry_get_by_uid(&self, ctx: &RequestContext, uid: &str) -> DomainResult<Option<Entry>> {
        let tables = self.db.read(ctx)?;
        Ok(tables.entries.iter().find(|e| e.uid == uid).cloned())
    }

    fn entry_metadata_get(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        entry_uid: &str,
    ) -> DomainResult<Option<EntryMetadata>> {
        let tables = self.db.read(ctx)?;
        Ok(tables
            .entry_metadata
            .get(&(user_uuid.to_string(), entry_uid.to_string()))
            .cloned())
    }

    fn entry_metadata_upsert(
        &self,
        ctx: &RequestContext,
        metadata: &EntryMetadata,
    ) -> DomainResult<()> {
        let mut tables = self.db.write(ctx)?;
        tables.entry_metadata.insert(
            (metadata.user_uuid.clone(), metadata.entry_uid.clone()),
            metadata.clone(),
        );
        Ok(())
    }

    fn entry_mark_all_as_read(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        scope: &EntryScope,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<u64> {
        self.db.transaction(ctx, |tables| {
            let entry_uids: Vec<String> =
                scoped_entries(tables, user_uuid, scope, EntryVisibility::All, None)
                    .into_iter()
                    .map(|e| e.entry.uid)
                    .collect();
            for uid in &entry_uids {
                ctx.ensure_active()?;
                tables.entry_metadata.insert(
                    (user_uuid.to_string(), uid.clone()),
                    EntryMetadata {
                        user_uuid: user_uuid.to_string(),
                        entry_uid: uid.clone(),
                        read: true,
                        updated_at,
                    },
                );
            }
            Ok(entry_uids.len() as u64)
        })
    }

    fn preferences_get(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
    ) -> DomainResult<Option<Preferences>> {
        let tables = self.db.read(ctx)?;
        Ok(tables.preferences.get(user_uuid).cloned())
    }

    fn preferences_upsert(
        &self,
        ctx: &RequestContext,
        preferences: &Preferences,
    ) -> DomainResult<()> {
        let mut tables = self.db.write(ctx)?;
        tables
            .preferences
            .insert(preferences.user_uuid.clone(), preferences.clone());
        Ok(())
    }

    fn subscribed_feeds_by_category(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
    ) -> DomainResult<Vec<SubscribedFeedsByCategory>> {
        let tables = self.db.read(ctx)?;
        let mut categories: Vec<&Category> = tables
            .categories
            .iter()
            .filter(|c| c.user_uuid == user_uuid)
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));

        let mut out = Vec::with_capacity(categories.len());
        for category in categories {
            let mut subscribed_feeds = Vec::new();
            for subscription in tables
                .subscriptions
                .iter()
                .filter(|s| s.user_uuid == user_uuid && s.category_uuid == category.uuid)
            {
                let Some(feed) = tables.feeds.iter().find(|f| f.uuid == subscription.feed_uuid)
                else {
                    continue;
                };
                let unread = tables
                    .entries
                    .iter()
                    .filter(|e| e.feed_uuid == feed.uuid && !is_read(&tables, user_uuid, &e.uid))
                    .count() as u32;
                subscribed_feeds.push(SubscribedFeed {
                    feed: feed.clone(),
                    subscription_uuid: subscription.uuid.clone(),
                    alias: subscription.alias.clone(),
                    unread,
                });
            }
            subscribed_feeds.sort_by(|a, b| a.display_title().cmp(b.display_title()));
            out.push(SubscribedFeedsByCategory {
                category: category.clone(),
                unread: subscribed_feeds.iter().map(|f| f.unread).sum(),
                subscribed_feeds,
            });
        }
        Ok(out)
    }

    fn subscription_view_by_uuid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
    ) -> DomainResult<Option<SubscriptionView>> {
        let tables = self.db.read(ctx)?;
        let Some(subscription) = tables
            .subscriptions
            .iter()
            .find(|s| s.user_uuid == user_uuid && s.uuid == uuid)
        else {
            return Ok(None);
        };
        Ok(tables
            .feeds
            .iter()
            .find(|f| f.uuid == subscription.feed_uuid)
            .map(|feed| SubscriptionView {
                uuid: subscription.uuid.clone(),
                category_uuid: subscription.category_uuid.clone(),
                feed_uuid: feed.uuid.clone(),
                alias: subscription.alias.clone(),
                feed_url: feed.feed_url.clone(),
                feed_title: feed.title.clone(),
                feed_description: feed.description.clone(),
            }))
    }

    fn entry_count(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        scope: &EntryScope,
        show: EntryVisibility,
        query: Option<&WebSearchQuery>,
    ) -> DomainResult<u32> {
        let tables = self.db.read(ctx)?;
        Ok(scoped_entries(&tables, user_uuid, scope, show, query).len() as u32)
    }

    fn entries_n(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        scope: &EntryScope,
        show: EntryVisibility,
        query: Option<&WebSearchQuery>,
        n: u32,
        offset: u32,
    ) -> DomainResult<Vec<SubscribedFeedEntry>> {
        let tables = self.db.read(ctx)?;
        Ok(page(
            scoped_entries(&tables, user_uuid, scope, show, query),
            n,
            offset,
        ))
    }
}
