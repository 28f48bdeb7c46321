// src/application/services/bookmark_import_service.rs
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::application::error::ApplicationResult;
use crate::domain::bookmark::Bookmark;
use crate::domain::context::RequestContext;
use crate::domain::exchange::{
    find_codec, BookmarkRecord, DocumentCodec, DocumentFormat, ImportStatus, ImportVisibility,
    OnConflict,
};
use crate::domain::repositories::repository::BookmarkRepository;
use crate::domain::uid::Uid;

/// Options chosen on the import form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookmarkImportOptions {
    pub format: DocumentFormat,
    pub visibility: ImportVisibility,
    pub on_conflict: OnConflict,
}

impl Default for BookmarkImportOptions {
    fn default() -> Self {
        Self {
            format: DocumentFormat::Netscape,
            visibility: ImportVisibility::Default,
            on_conflict: OnConflict::Keep,
        }
    }
}

/// Service interface for importing bookmark files
pub trait BookmarkImportService: Send + Sync + Debug {
    /// Decode `input` and store its bookmarks for `user_uuid` in one batch
    fn import(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        input: &str,
        options: BookmarkImportOptions,
    ) -> ApplicationResult<ImportStatus>;
}

#[derive(Debug)]
pub struct BookmarkImportServiceImpl<R: BookmarkRepository> {
    repository: Arc<R>,
    codecs: Vec<Arc<dyn DocumentCodec>>,
}

impl<R: BookmarkRepository> BookmarkImportServiceImpl<R> {
    pub fn new(repository: Arc<R>, codecs: Vec<Arc<dyn DocumentCodec>>) -> Self {
        Self { repository, codecs }
    }
}

/// Builds the bookmark to store from a file record.
///
/// Creation dates in the future are clamped to `now`; the update date falls
/// back to the creation date and never precedes it.
fn bookmark_from_record(
    user_uuid: &str,
    record: BookmarkRecord,
    visibility: ImportVisibility,
    now: DateTime<Utc>,
) -> ApplicationResult<Bookmark> {
    let created_at = record.created_at.unwrap_or(now).min(now);
    let updated_at = record
        .updated_at
        .unwrap_or(created_at)
        .clamp(created_at, now);

    let mut bookmark = Bookmark::new(user_uuid, record.url, record.title)
        .with_description(record.description)
        .with_tags(record.tags)
        .with_private(visibility.apply(record.private));
    bookmark.uid = Uid::new()?.to_string();
    bookmark.created_at = created_at;
    bookmark.updated_at = updated_at;
    bookmark.normalize();
    Ok(bookmark)
}

impl<R: BookmarkRepository> BookmarkImportService for BookmarkImportServiceImpl<R> {
    #[instrument(skip(self, ctx, input), level = "debug", fields(format = %options.format))]
    fn import(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        input: &str,
        options: BookmarkImportOptions,
    ) -> ApplicationResult<ImportStatus> {
        let codec = find_codec(&self.codecs, options.format)?;
        let document = codec.decode(input)?;
        let now = Utc::now();

        let mut status = ImportStatus {
            overwrite: options.on_conflict == OnConflict::Overwrite,
            ..ImportStatus::default()
        };
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut bookmarks = Vec::with_capacity(document.bookmarks.len());

        for record in document.bookmarks {
            let bookmark = bookmark_from_record(user_uuid, record, options.visibility, now)?;
            if let Err(e) = bookmark.validate_fields() {
                debug!("Skipping invalid bookmark {:?}: {}", bookmark.url, e);
                status.invalid += 1;
                continue;
            }
            if !seen_urls.insert(bookmark.url.clone()) {
                debug!("Skipping duplicate bookmark {:?}", bookmark.url);
                status.invalid += 1;
                continue;
            }
            bookmarks.push(bookmark);
        }

        let written = match options.on_conflict {
            OnConflict::Overwrite => self.repository.upsert_many(ctx, &bookmarks)?,
            OnConflict::Keep => self.repository.add_many(ctx, &bookmarks)?,
        };
        status.new_or_updated = written;
        status.skipped = (bookmarks.len() as u64).saturating_sub(written);

        info!("Imported bookmarks for {}: {}", user_uuid, status.summary());
        Ok(status)
    }
}
