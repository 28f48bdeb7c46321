// src/application/services/feed_export_service.rs
use std::fmt::Debug;
use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use crate::application::error::ApplicationResult;
use crate::application::services::bookmark_export_service::ExportFile;
use crate::domain::context::RequestContext;
use crate::domain::exchange::{OutlineCodec, OutlineDocument, SubscriptionOutline};
use crate::domain::repositories::feed_repository::FeedRepository;
use crate::domain::user::Owner;

pub const OPML_CONTENT_TYPE: &str = "text/x-opml; charset=utf-8";

pub trait FeedExportService: Send + Sync + Debug {
    /// Encode the owner's subscriptions as OPML, one outline per category
    fn export(&self, ctx: &RequestContext, owner: &Owner) -> ApplicationResult<ExportFile>;
}

#[derive(Debug)]
pub struct FeedExportServiceImpl<R: FeedRepository> {
    repository: Arc<R>,
    codec: Arc<dyn OutlineCodec>,
}

impl<R: FeedRepository> FeedExportServiceImpl<R> {
    pub fn new(repository: Arc<R>, codec: Arc<dyn OutlineCodec>) -> Self {
        Self { repository, codec }
    }
}

impl<R: FeedRepository> FeedExportService for FeedExportServiceImpl<R> {
    #[instrument(skip(self, ctx), level = "debug", fields(nick_name = %owner.nick_name))]
    fn export(&self, ctx: &RequestContext, owner: &Owner) -> ApplicationResult<ExportFile> {
        let mut document = OutlineDocument {
            title: format!("{}'s feed subscriptions on Sparkmark", owner.display_name),
            created_at: Some(Utc::now()),
            categories: Vec::new(),
        };

        for category in self.repository.subscribed_feeds_by_category(ctx, &owner.uuid)? {
            for subscribed in category.subscribed_feeds {
                document.push(
                    &category.category.name,
                    SubscriptionOutline {
                        title: subscribed.feed.title,
                        feed_url: subscribed.feed.feed_url,
                    },
                );
            }
        }

        Ok(ExportFile {
            filename: "feeds.opml".to_string(),
            content_type: OPML_CONTENT_TYPE,
            content: self.codec.encode(&document)?,
        })
    }
}
