// src/application/services/bookmark_service_impl.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};

use crate::application::error::ApplicationResult;
use crate::application::services::bookmark_service::BookmarkService;
use crate::domain::bookmark::{validate_uid, Bookmark, TagDeleteQuery, TagUpdateQuery};
use crate::domain::context::RequestContext;
use crate::domain::error::DomainError;
use crate::domain::repositories::repository::BookmarkRepository;
use crate::domain::uid::Uid;

#[derive(Debug)]
pub struct BookmarkServiceImpl<R: BookmarkRepository> {
    repository: Arc<R>,
}

impl<R: BookmarkRepository> BookmarkServiceImpl<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

/// The store is authoritative for `(user_uuid, url)` uniqueness; a race past
/// the advisory check surfaces here.
fn url_conflict(err: DomainError) -> DomainError {
    match err {
        DomainError::StoreConflict(_) => DomainError::UrlAlreadyRegistered,
        other => other,
    }
}

impl<R: BookmarkRepository> BookmarkService for BookmarkServiceImpl<R> {
    #[instrument(skip(self, ctx, bookmark), level = "debug", fields(url = %bookmark.url))]
    fn add(&self, ctx: &RequestContext, mut bookmark: Bookmark) -> ApplicationResult<Bookmark> {
        let now = Utc::now();
        bookmark.uid = Uid::new()?.to_string();
        bookmark.created_at = now;
        bookmark.updated_at = now;

        bookmark.normalize();
        bookmark.validate_fields()?;
        bookmark.validate_uid()?;

        if self
            .repository
            .is_url_registered(ctx, &bookmark.user_uuid, &bookmark.url)?
        {
            return Err(DomainError::UrlAlreadyRegistered.into());
        }

        self.repository.add(ctx, &bookmark).map_err(url_conflict)?;
        debug!("Added bookmark {}", bookmark.uid);
        Ok(bookmark)
    }

    #[instrument(skip(self, ctx, bookmark), level = "debug", fields(uid = %bookmark.uid))]
    fn update(&self, ctx: &RequestContext, mut bookmark: Bookmark) -> ApplicationResult<Bookmark> {
        bookmark.updated_at = Utc::now();

        bookmark.normalize();
        bookmark.validate_uid()?;
        bookmark.validate_fields()?;

        if self.repository.is_url_registered_to_another_uid(
            ctx,
            &bookmark.user_uuid,
            &bookmark.url,
            &bookmark.uid,
        )? {
            return Err(DomainError::UrlAlreadyRegistered.into());
        }

        self.repository
            .update(ctx, &bookmark)
            .map_err(url_conflict)?;

        self.repository
            .get_by_uid(ctx, &bookmark.user_uuid, &bookmark.uid)?
            .ok_or_else(|| DomainError::BookmarkNotFound.into())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn delete(&self, ctx: &RequestContext, user_uuid: &str, uid: &str) -> ApplicationResult<()> {
        validate_uid(uid)?;
        if !self.repository.delete(ctx, user_uuid, uid)? {
            return Err(DomainError::BookmarkNotFound.into());
        }
        Ok(())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn by_uid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uid: &str,
    ) -> ApplicationResult<Bookmark> {
        validate_uid(uid)?;
        self.repository
            .get_by_uid(ctx, user_uuid, uid)?
            .ok_or_else(|| DomainError::BookmarkNotFound.into())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn by_url(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        url: &str,
    ) -> ApplicationResult<Bookmark> {
        let url = url.trim();
        crate::domain::bookmark::validate_url(url)?;
        self.repository
            .get_by_url(ctx, user_uuid, url)?
            .ok_or_else(|| DomainError::BookmarkNotFound.into())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn delete_tag(&self, ctx: &RequestContext, mut query: TagDeleteQuery) -> ApplicationResult<u64> {
        query.normalize();
        query.validate()?;

        let now = Utc::now();
        let bookmarks: Vec<Bookmark> = self
            .repository
            .get_by_tag(ctx, &query.user_uuid, &query.name)?
            .into_iter()
            .map(|mut b| {
                b.tags.retain(|t| *t != query.name);
                b.updated_at = now;
                b
            })
            .collect();

        let count = self.repository.tag_update_many(ctx, &bookmarks)?;
        debug!("Deleted tag {:?} from {} bookmarks", query.name, count);
        Ok(count)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn update_tag(&self, ctx: &RequestContext, mut query: TagUpdateQuery) -> ApplicationResult<u64> {
        query.normalize();
        query.validate()?;

        let now = Utc::now();
        let bookmarks: Vec<Bookmark> = self
            .repository
            .get_by_tag(ctx, &query.user_uuid, &query.current_name)?
            .into_iter()
            .map(|mut b| {
                b.tags = query.rewrite(&b.tags);
                b.updated_at = now;
                b
            })
            .collect();

        let count = self.repository.tag_update_many(ctx, &bookmarks)?;
        debug!(
            "Renamed tag {:?} to {:?} on {} bookmarks",
            query.current_name, query.new_name, count
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::ApplicationError;
    use crate::infrastructure::repositories::memory::{MemoryBookmarkRepository, MemoryDatabase};
    use crate::util::testing::init_test_env;

    const USER: &str = "0b9a1c5e-3a8c-4a57-9d1e-6c2b1f0f4e11";

    fn create_test_service() -> BookmarkServiceImpl<MemoryBookmarkRepository> {
        let _ = init_test_env();
        let repository = MemoryBookmarkRepository::new(Arc::new(MemoryDatabase::new()));
        BookmarkServiceImpl::new(Arc::new(repository))
    }

    fn domain_error(err: ApplicationError) -> DomainError {
        match err {
            ApplicationError::Domain(e) => e,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn given_new_bookmark_when_added_then_uid_and_timestamps_assigned() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();

        let added = service
            .add(
                &ctx,
                Bookmark::new(USER, " https://a.test ", " A ").with_tags(["b", " a", "b", ""]),
            )
            .unwrap();

        assert!(Uid::validate(&added.uid).is_ok());
        assert_eq!(added.url, "https://a.test");
        assert_eq!(added.title, "A");
        assert_eq!(added.tags, vec!["a", "b"]);
        assert_eq!(added.created_at, added.updated_at);
    }

    #[test]
    fn given_registered_url_when_added_again_then_url_already_registered() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();
        service
            .add(&ctx, Bookmark::new(USER, "https://a.test", "A"))
            .unwrap();

        let err = service
            .add(&ctx, Bookmark::new(USER, "https://a.test", "Again"))
            .unwrap_err();

        assert!(matches!(domain_error(err), DomainError::UrlAlreadyRegistered));
    }

    #[test]
    fn given_same_url_for_other_user_when_added_then_accepted() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();
        service
            .add(&ctx, Bookmark::new(USER, "https://a.test", "A"))
            .unwrap();

        assert!(service
            .add(&ctx, Bookmark::new("another-user", "https://a.test", "A"))
            .is_ok());
    }

    #[test]
    fn given_invalid_fields_when_added_then_validation_errors() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();

        let cases = [
            (Bookmark::new(USER, "", "A"), "url required"),
            (Bookmark::new(USER, "https://a.test", "   "), "title required"),
            (Bookmark::new("", "https://a.test", "A"), "user required"),
            (Bookmark::new(USER, "a.test", "A"), "no scheme"),
        ];
        for (bookmark, label) in cases {
            let err = domain_error(service.add(&ctx, bookmark).unwrap_err());
            assert!(err.is_validation(), "{label}: {err:?}");
        }
    }

    #[test]
    fn given_url_of_another_bookmark_when_updated_then_url_already_registered() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();
        service
            .add(&ctx, Bookmark::new(USER, "https://a.test", "A"))
            .unwrap();
        let mut b = service
            .add(&ctx, Bookmark::new(USER, "https://b.test", "B"))
            .unwrap();

        b.url = "https://a.test".to_string();
        let err = service.update(&ctx, b).unwrap_err();

        assert!(matches!(domain_error(err), DomainError::UrlAlreadyRegistered));
    }

    #[test]
    fn given_existing_bookmark_when_updated_then_fields_change_and_created_at_kept() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();
        let added = service
            .add(&ctx, Bookmark::new(USER, "https://a.test", "A"))
            .unwrap();

        let mut edit = added.clone();
        edit.title = "Renamed".to_string();
        edit.private = true;
        let updated = service.update(&ctx, edit).unwrap();

        assert_eq!(updated.title, "Renamed");
        assert!(updated.private);
        assert_eq!(updated.created_at, added.created_at);
        assert!(updated.updated_at >= added.updated_at);
    }

    #[test]
    fn given_unknown_uid_when_updated_or_deleted_then_not_found() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();
        let mut ghost = Bookmark::new(USER, "https://ghost.test", "Ghost");
        ghost.uid = Uid::new().unwrap().to_string();

        let err = service.update(&ctx, ghost.clone()).unwrap_err();
        assert!(matches!(domain_error(err), DomainError::BookmarkNotFound));

        let err = service.delete(&ctx, USER, &ghost.uid).unwrap_err();
        assert!(matches!(domain_error(err), DomainError::BookmarkNotFound));
    }

    #[test]
    fn given_malformed_uid_when_looked_up_then_uid_invalid() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();

        let err = service.by_uid(&ctx, USER, "not-a-uid").unwrap_err();

        assert!(matches!(domain_error(err), DomainError::UidInvalid(_)));
    }

    #[test]
    fn given_tagged_bookmarks_when_tag_renamed_then_every_bookmark_rewritten() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();
        for i in 0..10 {
            service
                .add(
                    &ctx,
                    Bookmark::new(USER, format!("https://{i}.test"), format!("B{i}"))
                        .with_tags(["common/tag1", "common/tag2", format!("extra{i}").as_str()]),
                )
                .unwrap();
        }
        service
            .add(
                &ctx,
                Bookmark::new(USER, "https://untagged.test", "U").with_tags(["other"]),
            )
            .unwrap();

        let count = service
            .update_tag(
                &ctx,
                TagUpdateQuery::new(USER, "common/tag2", "common/renamed"),
            )
            .unwrap();

        assert_eq!(count, 10);
        for i in 0..10 {
            let b = service.by_url(&ctx, USER, &format!("https://{i}.test")).unwrap();
            assert!(!b.has_tag("common/tag2"));
            assert!(b.has_tag("common/renamed"));
            assert!(b.has_tag("common/tag1"));
        }
    }

    #[test]
    fn given_same_names_when_tag_renamed_then_rejected_before_store_access() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();

        let err = service
            .update_tag(&ctx, TagUpdateQuery::new(USER, " x ", "x"))
            .unwrap_err();

        assert!(matches!(domain_error(err), DomainError::TagNewNameEqualsCurrentName));
    }

    #[test]
    fn given_tagged_bookmarks_when_tag_deleted_then_other_tags_preserved() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();
        service
            .add(
                &ctx,
                Bookmark::new(USER, "https://a.test", "A").with_tags(["keep", "drop"]),
            )
            .unwrap();

        let count = service
            .delete_tag(&ctx, TagDeleteQuery::new(USER, "drop"))
            .unwrap();

        assert_eq!(count, 1);
        let b = service.by_url(&ctx, USER, "https://a.test").unwrap();
        assert_eq!(b.tags, vec!["keep"]);
    }

    #[test]
    fn given_tag_with_whitespace_when_deleted_then_rejected() {
        let service = create_test_service();
        let ctx = RequestContext::anonymous();

        let err = service
            .delete_tag(&ctx, TagDeleteQuery::new(USER, "two words"))
            .unwrap_err();

        assert!(matches!(domain_error(err), DomainError::TagNameContainsWhitespace));
    }
}
