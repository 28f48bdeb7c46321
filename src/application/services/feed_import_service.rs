// src/application/services/feed_import_service.rs
use std::fmt::Debug;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::error::ApplicationResult;
use crate::domain::context::RequestContext;
use crate::domain::error::DomainError;
use crate::domain::exchange::{OutlineCodec, OutlineImportStatus, SubscriptionOutline};
use crate::domain::feed::{validate_feed_url, Category, Feed, Subscription};
use crate::domain::repositories::feed_repository::FeedRepository;

/// Counts of an OPML import, plus the subscriptions that could not be stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedImportReport {
    pub status: OutlineImportStatus,
    pub errors: Vec<String>,
}

pub trait FeedImportService: Send + Sync + Debug {
    /// Subscribe `user_uuid` to every feed listed in an OPML document
    fn import(&self, ctx: &RequestContext, user_uuid: &str, input: &str)
        -> ApplicationResult<FeedImportReport>;
}

#[derive(Debug)]
pub struct FeedImportServiceImpl<R: FeedRepository> {
    repository: Arc<R>,
    codec: Arc<dyn OutlineCodec>,
}

impl<R: FeedRepository> FeedImportServiceImpl<R> {
    pub fn new(repository: Arc<R>, codec: Arc<dyn OutlineCodec>) -> Self {
        Self { repository, codec }
    }

    fn category_get_or_create(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        name: &str,
    ) -> ApplicationResult<(Category, bool)> {
        let mut category = Category::new(user_uuid, name);
        category.normalize();
        category.validate_fields()?;

        if let Some(existing) = self
            .repository
            .category_get_by_name(ctx, user_uuid, &category.name)?
        {
            return Ok((existing, false));
        }

        category.uuid = Uuid::new_v4().to_string();
        self.repository
            .category_create(ctx, &category)
            .map_err(|e| match e {
                DomainError::StoreConflict(_) => DomainError::CategoryAlreadyRegistered,
                other => other,
            })?;
        Ok((category, true))
    }

    fn feed_get_or_create(
        &self,
        ctx: &RequestContext,
        outline: &SubscriptionOutline,
    ) -> ApplicationResult<(Feed, bool)> {
        if let Some(feed) = self.repository.feed_get_by_url(ctx, &outline.feed_url)? {
            return Ok((feed, false));
        }

        let mut feed = Feed::from_url(outline.feed_url.as_str());
        feed.uuid = Uuid::new_v4().to_string();
        feed.title = outline.title.clone();
        feed.normalize();
        match self.repository.feed_create(ctx, &feed) {
            Ok(()) => Ok((feed, true)),
            Err(DomainError::StoreConflict(_)) => {
                let feed = self
                    .repository
                    .feed_get_by_url(ctx, &outline.feed_url)?
                    .ok_or(DomainError::FeedNotFound)?;
                Ok((feed, false))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns whether a new subscription was stored.
    fn subscribe(
        &self,
        ctx: &RequestContext,
        category: &Category,
        outline: &SubscriptionOutline,
        report: &mut FeedImportReport,
    ) -> ApplicationResult<bool> {
        validate_feed_url(&outline.feed_url)?;
        let (feed, feed_created) = self.feed_get_or_create(ctx, outline)?;
        report.status.feeds.record(feed_created);

        if self
            .repository
            .subscription_get_by_feed(ctx, &category.user_uuid, &feed.uuid)?
            .is_some()
        {
            return Ok(false);
        }

        let mut subscription = Subscription::new(&category.user_uuid, &category.uuid, &feed.uuid);
        subscription.uuid = Uuid::new_v4().to_string();
        subscription.validate_fields()?;
        match self.repository.subscription_create(ctx, &subscription) {
            Ok(()) => Ok(true),
            Err(DomainError::StoreConflict(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl<R: FeedRepository> FeedImportService for FeedImportServiceImpl<R> {
    #[instrument(skip(self, ctx, input), level = "debug")]
    fn import(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        input: &str,
    ) -> ApplicationResult<FeedImportReport> {
        let document = self.codec.decode(input)?;
        let started = Utc::now();
        let mut report = FeedImportReport::default();

        for outline in &document.categories {
            let (category, created) = self.category_get_or_create(ctx, user_uuid, &outline.name)?;
            report.status.categories.record(created);

            for subscription in &outline.subscriptions {
                match self.subscribe(ctx, &category, subscription, &mut report) {
                    Ok(created) => report.status.subscriptions.record(created),
                    Err(e) if e.domain().is_some_and(|d| matches!(d, DomainError::Cancelled)) => {
                        return Err(e)
                    }
                    Err(e) => {
                        warn!("Failed to import subscription {}: {}", subscription.feed_url, e);
                        report.errors.push(format!("{}: {}", subscription.feed_url, e));
                    }
                }
            }
        }

        debug!(
            "OPML import took {} ms",
            (Utc::now() - started).num_milliseconds()
        );
        info!("Imported feeds for {}: {}", user_uuid, report.status.summary());
        Ok(report)
    }
}
