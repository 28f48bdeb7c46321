// src/application/services/feed_service.rs
use std::fmt::Debug;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::application::error::ApplicationResult;
use crate::domain::context::RequestContext;
use crate::domain::error::DomainError;
use crate::domain::feed::{
    validate_feed_url, Category, Entry, EntryMetadata, Feed, Preferences, Subscription,
};
use crate::domain::feed_query::EntryScope;
use crate::domain::repositories::feed_repository::FeedRepository;
use crate::domain::uid::Uid;

/// Write-side service for categories, subscriptions, entries and read state
pub trait FeedService: Send + Sync + Debug {
    fn categories(&self, ctx: &RequestContext, user_uuid: &str) -> ApplicationResult<Vec<Category>>;

    fn category_by_uuid(&self, ctx: &RequestContext, user_uuid: &str, uuid: &str)
        -> ApplicationResult<Category>;

    fn category_by_slug(&self, ctx: &RequestContext, user_uuid: &str, slug: &str)
        -> ApplicationResult<Category>;

    fn add_category(&self, ctx: &RequestContext, category: Category) -> ApplicationResult<Category>;

    /// Rename a category; the slug follows the name
    fn update_category(&self, ctx: &RequestContext, category: Category)
        -> ApplicationResult<Category>;

    /// Delete a category together with its subscriptions
    fn delete_category(&self, ctx: &RequestContext, user_uuid: &str, uuid: &str)
        -> ApplicationResult<()>;

    /// Subscribe to a feed URL, registering the shared feed on first use
    fn subscribe(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        category_uuid: &str,
        feed_url: &str,
        alias: &str,
    ) -> ApplicationResult<Subscription>;

    /// Move a subscription to another category and/or change its alias
    fn update_subscription(&self, ctx: &RequestContext, subscription: Subscription)
        -> ApplicationResult<Subscription>;

    fn unsubscribe(&self, ctx: &RequestContext, user_uuid: &str, uuid: &str)
        -> ApplicationResult<()>;

    /// Ingest entries produced by a feed poller; returns the number of new entries
    fn add_entries(&self, ctx: &RequestContext, feed_uuid: &str, entries: Vec<Entry>)
        -> ApplicationResult<u64>;

    /// Flip the read flag of an entry; returns the new state
    fn toggle_entry_read(&self, ctx: &RequestContext, user_uuid: &str, entry_uid: &str)
        -> ApplicationResult<bool>;

    fn mark_all_entries_as_read(&self, ctx: &RequestContext, user_uuid: &str)
        -> ApplicationResult<u64>;

    fn mark_all_entries_as_read_by_category(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        category_uuid: &str,
    ) -> ApplicationResult<u64>;

    fn mark_all_entries_as_read_by_subscription(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        subscription_uuid: &str,
    ) -> ApplicationResult<u64>;

    /// Stored preferences, or the defaults when none were saved
    fn preferences(&self, ctx: &RequestContext, user_uuid: &str) -> ApplicationResult<Preferences>;

    fn update_preferences(&self, ctx: &RequestContext, preferences: Preferences)
        -> ApplicationResult<()>;
}

#[derive(Debug)]
pub struct FeedServiceImpl<R: FeedRepository> {
    repository: Arc<R>,
}

impl<R: FeedRepository> FeedServiceImpl<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    fn category_conflict(e: DomainError) -> DomainError {
        match e {
            DomainError::StoreConflict(_) => DomainError::CategoryAlreadyRegistered,
            other => other,
        }
    }

    /// Returns the shared feed for `feed_url`, creating it when unknown.
    fn feed_get_or_create(&self, ctx: &RequestContext, feed_url: &str) -> ApplicationResult<Feed> {
        if let Some(feed) = self.repository.feed_get_by_url(ctx, feed_url)? {
            return Ok(feed);
        }

        let mut feed = Feed::from_url(feed_url);
        feed.uuid = Uuid::new_v4().to_string();
        feed.normalize();
        match self.repository.feed_create(ctx, &feed) {
            Ok(()) => {
                debug!("Registered feed {}", feed.feed_url);
                Ok(feed)
            }
            // another request registered the same URL first
            Err(DomainError::StoreConflict(_)) => self
                .repository
                .feed_get_by_url(ctx, feed_url)?
                .ok_or_else(|| DomainError::FeedNotFound.into()),
            Err(e) => Err(e.into()),
        }
    }

    fn require_subscription(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
    ) -> ApplicationResult<Subscription> {
        if uuid.is_empty() {
            return Err(DomainError::SubscriptionUuidRequired.into());
        }
        self.repository
            .subscription_get_by_uuid(ctx, user_uuid, uuid)?
            .ok_or_else(|| DomainError::SubscriptionNotFound.into())
    }
}

impl<R: FeedRepository> FeedService for FeedServiceImpl<R> {
    #[instrument(skip(self, ctx), level = "debug")]
    fn categories(&self, ctx: &RequestContext, user_uuid: &str) -> ApplicationResult<Vec<Category>> {
        Ok(self.repository.category_get_many(ctx, user_uuid)?)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn category_by_uuid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
    ) -> ApplicationResult<Category> {
        self.repository
            .category_get_by_uuid(ctx, user_uuid, uuid)?
            .ok_or_else(|| DomainError::CategoryNotFound.into())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn category_by_slug(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        slug: &str,
    ) -> ApplicationResult<Category> {
        self.repository
            .category_get_by_slug(ctx, user_uuid, slug)?
            .ok_or_else(|| DomainError::CategoryNotFound.into())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn add_category(
        &self,
        ctx: &RequestContext,
        mut category: Category,
    ) -> ApplicationResult<Category> {
        let now = Utc::now();
        category.uuid = Uuid::new_v4().to_string();
        category.created_at = now;
        category.updated_at = now;
        category.normalize();
        category.validate_fields()?;

        if self.repository.category_name_and_slug_are_registered(
            ctx,
            &category.user_uuid,
            &category.name,
            &category.slug,
        )? {
            return Err(DomainError::CategoryAlreadyRegistered.into());
        }

        self.repository
            .category_create(ctx, &category)
            .map_err(Self::category_conflict)?;
        Ok(category)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn update_category(
        &self,
        ctx: &RequestContext,
        mut category: Category,
    ) -> ApplicationResult<Category> {
        category.validate_uuid()?;
        category.updated_at = Utc::now();
        category.normalize();
        category.validate_fields()?;

        if self
            .repository
            .category_name_and_slug_are_registered_to_another_category(
                ctx,
                &category.user_uuid,
                &category.uuid,
                &category.name,
                &category.slug,
            )?
        {
            return Err(DomainError::CategoryAlreadyRegistered.into());
        }

        self.repository
            .category_update(ctx, &category)
            .map_err(Self::category_conflict)?;
        self.category_by_uuid(ctx, &category.user_uuid, &category.uuid)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn delete_category(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
    ) -> ApplicationResult<()> {
        if !self.repository.category_delete(ctx, user_uuid, uuid)? {
            return Err(DomainError::CategoryNotFound.into());
        }
        Ok(())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn subscribe(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        category_uuid: &str,
        feed_url: &str,
        alias: &str,
    ) -> ApplicationResult<Subscription> {
        let feed_url = feed_url.trim();
        validate_feed_url(feed_url)?;
        self.category_by_uuid(ctx, user_uuid, category_uuid)?;

        let feed = self.feed_get_or_create(ctx, feed_url)?;
        if self
            .repository
            .subscription_is_registered(ctx, user_uuid, &feed.uuid)?
        {
            return Err(DomainError::SubscriptionAlreadyRegistered.into());
        }

        let mut subscription =
            Subscription::new(user_uuid, category_uuid, &feed.uuid).with_alias(alias);
        subscription.uuid = Uuid::new_v4().to_string();
        subscription.normalize();
        subscription.validate_fields()?;

        self.repository
            .subscription_create(ctx, &subscription)
            .map_err(|e| match e {
                DomainError::StoreConflict(_) => DomainError::SubscriptionAlreadyRegistered,
                other => other,
            })?;
        Ok(subscription)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn update_subscription(
        &self,
        ctx: &RequestContext,
        mut subscription: Subscription,
    ) -> ApplicationResult<Subscription> {
        let stored = self.require_subscription(ctx, &subscription.user_uuid, &subscription.uuid)?;
        self.category_by_uuid(ctx, &subscription.user_uuid, &subscription.category_uuid)?;

        subscription.feed_uuid = stored.feed_uuid;
        subscription.created_at = stored.created_at;
        subscription.updated_at = Utc::now();
        subscription.normalize();
        subscription.validate_fields()?;

        self.repository.subscription_update(ctx, &subscription)?;
        Ok(subscription)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn unsubscribe(&self, ctx: &RequestContext, user_uuid: &str, uuid: &str) -> ApplicationResult<()> {
        if uuid.is_empty() {
            return Err(DomainError::SubscriptionUuidRequired.into());
        }
        if !self.repository.subscription_delete(ctx, user_uuid, uuid)? {
            return Err(DomainError::SubscriptionNotFound.into());
        }
        Ok(())
    }

    #[instrument(skip(self, ctx, entries), level = "debug", fields(count = entries.len()))]
    fn add_entries(
        &self,
        ctx: &RequestContext,
        feed_uuid: &str,
        entries: Vec<Entry>,
    ) -> ApplicationResult<u64> {
        if self.repository.feed_get_by_uuid(ctx, feed_uuid)?.is_none() {
            return Err(DomainError::FeedNotFound.into());
        }

        let mut valid = Vec::with_capacity(entries.len());
        for mut entry in entries {
            entry.uid = Uid::new()?.to_string();
            entry.feed_uuid = feed_uuid.to_string();
            entry.normalize();
            match entry.validate_for_addition() {
                Ok(()) => valid.push(entry),
                Err(e) => warn!("Skipping invalid entry {:?}: {}", entry.url, e),
            }
        }

        let inserted = self.repository.entry_create_many(ctx, &valid)?;
        debug!("Inserted {} new entries for feed {}", inserted, feed_uuid);
        Ok(inserted)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn toggle_entry_read(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        entry_uid: &str,
    ) -> ApplicationResult<bool> {
        Uid::validate(entry_uid)?;
        let entry = self
            .repository
            .entry_get_by_uid(ctx, entry_uid)?
            .ok_or(DomainError::EntryNotFound)?;
        // entries are only visible through a subscription
        if !self
            .repository
            .subscription_is_registered(ctx, user_uuid, &entry.feed_uuid)?
        {
            return Err(DomainError::EntryNotFound.into());
        }

        let read = !self
            .repository
            .entry_metadata_get(ctx, user_uuid, entry_uid)?
            .is_some_and(|m| m.read);
        self.repository.entry_metadata_upsert(
            ctx,
            &EntryMetadata {
                user_uuid: user_uuid.to_string(),
                entry_uid: entry_uid.to_string(),
                read,
                updated_at: Utc::now(),
            },
        )?;
        Ok(read)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn mark_all_entries_as_read(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
    ) -> ApplicationResult<u64> {
        Ok(self
            .repository
            .entry_mark_all_as_read(ctx, user_uuid, &EntryScope::All, Utc::now())?)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn mark_all_entries_as_read_by_category(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        category_uuid: &str,
    ) -> ApplicationResult<u64> {
        let category = self.category_by_uuid(ctx, user_uuid, category_uuid)?;
        Ok(self.repository.entry_mark_all_as_read(
            ctx,
            user_uuid,
            &EntryScope::Category(category.uuid),
            Utc::now(),
        )?)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn mark_all_entries_as_read_by_subscription(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        subscription_uuid: &str,
    ) -> ApplicationResult<u64> {
        let subscription = self.require_subscription(ctx, user_uuid, subscription_uuid)?;
        Ok(self.repository.entry_mark_all_as_read(
            ctx,
            user_uuid,
            &EntryScope::Subscription(subscription.uuid),
            Utc::now(),
        )?)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn preferences(&self, ctx: &RequestContext, user_uuid: &str) -> ApplicationResult<Preferences> {
        Ok(self
            .repository
            .preferences_get(ctx, user_uuid)?
            .unwrap_or_else(|| Preferences::default_for(user_uuid)))
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn update_preferences(
        &self,
        ctx: &RequestContext,
        mut preferences: Preferences,
    ) -> ApplicationResult<()> {
        if preferences.user_uuid.is_empty() {
            return Err(DomainError::UserUuidRequired.into());
        }
        preferences.updated_at = Utc::now();
        self.repository.preferences_upsert(ctx, &preferences)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::feed::EntryVisibility;
    use crate::infrastructure::repositories::memory::{MemoryDatabase, MemoryFeedRepository};
    use chrono::{Duration, TimeZone};

    const USER: &str = "2d8c4b1a-7e3f-4a5b-9c6d-0e1f2a3b4c5d";
    const OTHER: &str = "3e9d5c2b-8f4a-4b6c-ad7e-1f2a3b4c5d6e";

    struct Fixture {
        repository: Arc<MemoryFeedRepository>,
        service: FeedServiceImpl<MemoryFeedRepository>,
        ctx: RequestContext,
    }

    impl Fixture {
        fn new() -> Self {
            let repository = Arc::new(MemoryFeedRepository::new(Arc::new(MemoryDatabase::new())));
            Self {
                service: FeedServiceImpl::new(repository.clone()),
                repository,
                ctx: RequestContext::anonymous(),
            }
        }

        fn category(&self, user: &str, name: &str) -> Category {
            self.service
                .add_category(&self.ctx, Category::new(user, name))
                .unwrap()
        }

        fn entries(&self, feed_uuid: &str, n: usize) {
            let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
            let entries = (0..n)
                .map(|i| {
                    Entry::new(
                        "",
                        format!("https://blog.test/posts/{i}"),
                        format!("Post {i}"),
                        base + Duration::hours(i as i64),
                    )
                })
                .collect();
            self.service.add_entries(&self.ctx, feed_uuid, entries).unwrap();
        }
    }

    fn domain(err: crate::application::error::ApplicationError) -> DomainError {
        match err {
            crate::application::error::ApplicationError::Domain(e) => e,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn given_new_category_when_added_then_slug_derived_and_name_unique() {
        let f = Fixture::new();
        let category = f.category(USER, " Rust News ");

        assert_eq!(category.name, "Rust News");
        assert_eq!(category.slug, "rust-news");

        let err = f
            .service
            .add_category(&f.ctx, Category::new(USER, "rust news!"))
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::CategoryAlreadyRegistered));

        // other users may reuse the name
        assert!(f.service.add_category(&f.ctx, Category::new(OTHER, "Rust News")).is_ok());
    }

    #[test]
    fn given_category_when_renamed_to_sibling_name_then_conflict() {
        let f = Fixture::new();
        let mut tech = f.category(USER, "Tech");
        f.category(USER, "News");

        tech.name = "News".to_string();
        let err = f.service.update_category(&f.ctx, tech.clone()).unwrap_err();
        assert!(matches!(domain(err), DomainError::CategoryAlreadyRegistered));

        tech.name = "Technology".to_string();
        let updated = f.service.update_category(&f.ctx, tech).unwrap();
        assert_eq!(updated.slug, "technology");
    }

    #[test]
    fn given_same_feed_url_when_two_users_subscribe_then_feed_is_shared() {
        let f = Fixture::new();
        let mine = f.category(USER, "Tech");
        let theirs = f.category(OTHER, "Tech");

        let a = f
            .service
            .subscribe(&f.ctx, USER, &mine.uuid, "https://blog.test/atom.xml", "")
            .unwrap();
        let b = f
            .service
            .subscribe(&f.ctx, OTHER, &theirs.uuid, " https://blog.test/atom.xml ", "Blog")
            .unwrap();

        assert_eq!(a.feed_uuid, b.feed_uuid);
        assert_eq!(b.alias, "Blog");
    }

    #[test]
    fn given_existing_subscription_when_subscribing_again_then_rejected() {
        let f = Fixture::new();
        let tech = f.category(USER, "Tech");
        let news = f.category(USER, "News");
        f.service
            .subscribe(&f.ctx, USER, &tech.uuid, "https://blog.test/atom.xml", "")
            .unwrap();

        let err = f
            .service
            .subscribe(&f.ctx, USER, &news.uuid, "https://blog.test/atom.xml", "")
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::SubscriptionAlreadyRegistered));
    }

    #[test]
    fn given_bad_feed_url_or_unknown_category_when_subscribing_then_rejected() {
        let f = Fixture::new();
        let tech = f.category(USER, "Tech");

        let err = f
            .service
            .subscribe(&f.ctx, USER, &tech.uuid, "gopher://blog.test", "")
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::FeedUrlUnsupportedScheme));

        let err = f
            .service
            .subscribe(&f.ctx, USER, &Uuid::new_v4().to_string(), "https://blog.test/feed", "")
            .unwrap_err();
        assert!(matches!(domain(err), DomainError::CategoryNotFound));
    }

    #[test]
    fn given_category_with_subscriptions_when_deleted_then_subscriptions_removed() {
        let f = Fixture::new();
        let tech = f.category(USER, "Tech");
        let sub = f
            .service
            .subscribe(&f.ctx, USER, &tech.uuid, "https://blog.test/atom.xml", "")
            .unwrap();

        f.service.delete_category(&f.ctx, USER, &tech.uuid).unwrap();

        assert!(f
            .repository
            .subscription_get_by_uuid(&f.ctx, USER, &sub.uuid)
            .unwrap()
            .is_none());
        assert!(matches!(
            domain(f.service.delete_category(&f.ctx, USER, &tech.uuid).unwrap_err()),
            DomainError::CategoryNotFound
        ));
    }

    #[test]
    fn given_subscription_when_moved_then_category_and_alias_change() {
        let f = Fixture::new();
        let tech = f.category(USER, "Tech");
        let news = f.category(USER, "News");
        let mut sub = f
            .service
            .subscribe(&f.ctx, USER, &tech.uuid, "https://blog.test/atom.xml", "")
            .unwrap();

        sub.category_uuid = news.uuid.clone();
        sub.alias = " Daily ".to_string();
        let updated = f.service.update_subscription(&f.ctx, sub).unwrap();

        assert_eq!(updated.category_uuid, news.uuid);
        assert_eq!(updated.alias, "Daily");
    }

    #[test]
    fn given_duplicate_entry_urls_when_ingested_then_inserted_once() {
        let f = Fixture::new();
        let tech = f.category(USER, "Tech");
        let sub = f
            .service
            .subscribe(&f.ctx, USER, &tech.uuid, "https://blog.test/atom.xml", "")
            .unwrap();

        f.entries(&sub.feed_uuid, 3);
        let again = f
            .service
            .add_entries(
                &f.ctx,
                &sub.feed_uuid,
                vec![
                    Entry::new("", "https://blog.test/posts/0", "Post 0", Utc::now()),
                    Entry::new("", "https://blog.test/posts/9", "Post 9", Utc::now()),
                    Entry::new("", "https://blog.test/posts/10", "   ", Utc::now()),
                ],
            )
            .unwrap();

        assert_eq!(again, 1);
    }

    #[test]
    fn given_entry_when_toggled_twice_then_read_state_flips_back() {
        let f = Fixture::new();
        let tech = f.category(USER, "Tech");
        let sub = f
            .service
            .subscribe(&f.ctx, USER, &tech.uuid, "https://blog.test/atom.xml", "")
            .unwrap();
        f.entries(&sub.feed_uuid, 1);
        let uid = f
            .repository
            .entries_n(&f.ctx, USER, &EntryScope::All, EntryVisibility::All, None, 1, 0)
            .unwrap()[0]
            .entry
            .uid
            .clone();

        assert!(f.service.toggle_entry_read(&f.ctx, USER, &uid).unwrap());
        assert!(!f.service.toggle_entry_read(&f.ctx, USER, &uid).unwrap());

        // not subscribed
        assert!(matches!(
            domain(f.service.toggle_entry_read(&f.ctx, OTHER, &uid).unwrap_err()),
            DomainError::EntryNotFound
        ));
    }

    #[test]
    fn given_two_categories_when_marking_one_as_read_then_other_stays_unread() {
        let f = Fixture::new();
        let tech = f.category(USER, "Tech");
        let news = f.category(USER, "News");
        let a = f
            .service
            .subscribe(&f.ctx, USER, &tech.uuid, "https://a.test/feed", "")
            .unwrap();
        let b = f
            .service
            .subscribe(&f.ctx, USER, &news.uuid, "https://b.test/feed", "")
            .unwrap();
        f.entries(&a.feed_uuid, 2);
        f.service
            .add_entries(
                &f.ctx,
                &b.feed_uuid,
                vec![Entry::new("", "https://b.test/1", "B1", Utc::now())],
            )
            .unwrap();

        let marked = f
            .service
            .mark_all_entries_as_read_by_category(&f.ctx, USER, &tech.uuid)
            .unwrap();
        assert_eq!(marked, 2);

        let unread = f
            .repository
            .entry_count(&f.ctx, USER, &EntryScope::All, EntryVisibility::Unread, None)
            .unwrap();
        assert_eq!(unread, 1);

        f.service.mark_all_entries_as_read(&f.ctx, USER).unwrap();
        let unread = f
            .repository
            .entry_count(&f.ctx, USER, &EntryScope::All, EntryVisibility::Unread, None)
            .unwrap();
        assert_eq!(unread, 0);
    }

    #[test]
    fn given_no_saved_preferences_when_read_then_defaults() {
        let f = Fixture::new();
        let prefs = f.service.preferences(&f.ctx, USER).unwrap();
        assert_eq!(prefs.show_entries, EntryVisibility::All);
        assert!(prefs.show_entry_summaries);

        let mut prefs = prefs;
        prefs.show_entries = EntryVisibility::Unread;
        prefs.show_entry_summaries = false;
        f.service.update_preferences(&f.ctx, prefs).unwrap();

        let stored = f.service.preferences(&f.ctx, USER).unwrap();
        assert_eq!(stored.show_entries, EntryVisibility::Unread);
        assert!(!stored.show_entry_summaries);
    }
}
