// src/application/services/bookmark_export_service.rs
use std::fmt::Debug;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};

use crate::application::error::ApplicationResult;
use crate::domain::bookmark::Visibility;
use crate::domain::context::RequestContext;
use crate::domain::exchange::{find_codec, BookmarkDocument, DocumentCodec, DocumentFormat};
use crate::domain::repositories::repository::BookmarkRepository;

/// An encoded export, ready to be sent as an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub content: String,
}

pub trait BookmarkExportService: Send + Sync + Debug {
    /// Encode every bookmark of `user_uuid` matching `visibility`, in insertion order
    fn export(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        format: DocumentFormat,
        visibility: Visibility,
    ) -> ApplicationResult<ExportFile>;
}

#[derive(Debug)]
pub struct BookmarkExportServiceImpl<R: BookmarkRepository> {
    repository: Arc<R>,
    codecs: Vec<Arc<dyn DocumentCodec>>,
}

impl<R: BookmarkRepository> BookmarkExportServiceImpl<R> {
    pub fn new(repository: Arc<R>, codecs: Vec<Arc<dyn DocumentCodec>>) -> Self {
        Self { repository, codecs }
    }
}

impl<R: BookmarkRepository> BookmarkExportService for BookmarkExportServiceImpl<R> {
    #[instrument(skip(self, ctx), level = "debug")]
    fn export(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        format: DocumentFormat,
        visibility: Visibility,
    ) -> ApplicationResult<ExportFile> {
        let codec = find_codec(&self.codecs, format)?;
        let bookmarks = self.repository.get_all(ctx, user_uuid, visibility)?;
        debug!("Exporting {} bookmarks", bookmarks.len());

        let document = BookmarkDocument {
            title: format!("Sparkmark export of {} bookmarks", visibility),
            exported_at: Some(Utc::now()),
            bookmarks: bookmarks.iter().map(Into::into).collect(),
        };

        Ok(ExportFile {
            filename: format!("bookmarks-{}.{}", visibility, format.file_extension()),
            content_type: format.content_type(),
            content: codec.encode(&document)?,
        })
    }
}
