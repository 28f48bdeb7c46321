// src/infrastructure/di/service_container.rs
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::{
    BookmarkExportService, BookmarkExportServiceImpl, BookmarkImportService,
    BookmarkImportServiceImpl, BookmarkQueryService, BookmarkQueryServiceImpl, BookmarkService,
    CsrfService, FeedExportService, FeedExportServiceImpl, FeedImportService,
    FeedImportServiceImpl, FeedQueryService, FeedQueryServiceImpl, FeedService, FeedServiceImpl,
    SessionService, SessionServiceImpl, UserService, UserServiceImpl,
};
use crate::application::BookmarkServiceImpl;
use crate::config::Settings;
use crate::domain::exchange::{DocumentCodec, OutlineCodec};
use crate::domain::repositories::feed_repository::FeedRepository;
use crate::domain::repositories::repository::BookmarkRepository;
use crate::domain::repositories::session_repository::SessionRepository;
use crate::domain::repositories::user_repository::UserRepository;
use crate::infrastructure::json::JsonCodec;
use crate::infrastructure::netscape::NetscapeCodec;
use crate::infrastructure::opml::OpmlCodec;
use crate::infrastructure::repositories::memory::{
    MemoryBookmarkRepository, MemoryDatabase, MemoryFeedRepository, MemorySessionRepository,
    MemoryUserRepository,
};
use crate::infrastructure::repositories::sqlite::{
    init_pool, ConnectionPool, SqliteBookmarkRepository, SqliteFeedRepository,
    SqliteSessionRepository, SqliteUserRepository,
};
use crate::util::hash::HmacHasher;

/// Single composition root: every service the HTTP layer and the CLI reach for.
#[derive(Clone)]
pub struct ServiceContainer {
    pub bookmark_service: Arc<dyn BookmarkService>,
    pub bookmark_query_service: Arc<dyn BookmarkQueryService>,
    pub bookmark_import_service: Arc<dyn BookmarkImportService>,
    pub bookmark_export_service: Arc<dyn BookmarkExportService>,
    pub user_service: Arc<dyn UserService>,
    pub session_service: Arc<dyn SessionService>,
    pub feed_service: Arc<dyn FeedService>,
    pub feed_query_service: Arc<dyn FeedQueryService>,
    pub feed_import_service: Arc<dyn FeedImportService>,
    pub feed_export_service: Arc<dyn FeedExportService>,
    pub csrf_service: Arc<CsrfService>,
    pub public_url: String,
    pub session_ttl_days: i64,
}

impl ServiceContainer {
    /// Opens the configured database, applies pending migrations and wires the SQLite stores.
    #[instrument(skip(settings), level = "debug")]
    pub fn new(settings: &Settings) -> ApplicationResult<Self> {
        let pool = init_pool(&settings.db_url).map_err(|e| {
            ApplicationError::Domain(e.into()).context(format!("opening database {}", settings.db_url))
        })?;
        Self::from_pool(pool, settings)
    }

    /// Wires the SQLite stores over an already migrated pool.
    pub fn from_pool(pool: ConnectionPool, settings: &Settings) -> ApplicationResult<Self> {
        debug!("Wiring SQLite stores");
        Self::wire(
            Arc::new(SqliteBookmarkRepository::new(pool.clone())),
            Arc::new(SqliteUserRepository::new(pool.clone())),
            Arc::new(SqliteSessionRepository::new(pool.clone())),
            Arc::new(SqliteFeedRepository::new(pool)),
            settings,
        )
    }

    /// The same services over one shared in-memory database.
    pub fn in_memory(settings: &Settings) -> ApplicationResult<Self> {
        debug!("Wiring in-memory stores");
        let db = Arc::new(MemoryDatabase::new());
        Self::wire(
            Arc::new(MemoryBookmarkRepository::new(db.clone())),
            Arc::new(MemoryUserRepository::new(db.clone())),
            Arc::new(MemorySessionRepository::new(db.clone())),
            Arc::new(MemoryFeedRepository::new(db)),
            settings,
        )
    }

    fn wire<B, U, S, F>(
        bookmarks: Arc<B>,
        users: Arc<U>,
        sessions: Arc<S>,
        feeds: Arc<F>,
        settings: &Settings,
    ) -> ApplicationResult<Self>
    where
        B: BookmarkRepository + 'static,
        U: UserRepository + 'static,
        S: SessionRepository + 'static,
        F: FeedRepository + 'static,
    {
        let csrf_service = Arc::new(
            CsrfService::new(settings.csrf_key.clone())
                .map_err(|e| ApplicationError::Domain(e).context("creating CSRF service"))?,
        );
        let document_codecs: Vec<Arc<dyn DocumentCodec>> =
            vec![Arc::new(NetscapeCodec), Arc::new(JsonCodec)];
        let outline_codec: Arc<dyn OutlineCodec> = Arc::new(OpmlCodec);

        Ok(Self {
            bookmark_service: Arc::new(BookmarkServiceImpl::new(bookmarks.clone())),
            bookmark_query_service: Arc::new(BookmarkQueryServiceImpl::new(
                bookmarks.clone(),
                users.clone(),
            )),
            bookmark_import_service: Arc::new(BookmarkImportServiceImpl::new(
                bookmarks.clone(),
                document_codecs.clone(),
            )),
            bookmark_export_service: Arc::new(BookmarkExportServiceImpl::new(
                bookmarks,
                document_codecs,
            )),
            user_service: Arc::new(UserServiceImpl::new(users)),
            session_service: Arc::new(SessionServiceImpl::new(
                sessions,
                HmacHasher::new(settings.hmac_key.clone()),
            )),
            feed_service: Arc::new(FeedServiceImpl::new(feeds.clone())),
            feed_query_service: Arc::new(FeedQueryServiceImpl::new(feeds.clone())),
            feed_import_service: Arc::new(FeedImportServiceImpl::new(
                feeds.clone(),
                outline_codec.clone(),
            )),
            feed_export_service: Arc::new(FeedExportServiceImpl::new(feeds, outline_codec)),
            csrf_service,
            public_url: settings.public_url.clone(),
            session_ttl_days: settings.session_ttl_days,
        })
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("bookmark_service", &self.bookmark_service)
            .field("bookmark_query_service", &self.bookmark_query_service)
            .field("user_service", &self.user_service)
            .field("session_service", &self.session_service)
            .field("feed_service", &self.feed_service)
            .field("feed_query_service", &self.feed_query_service)
            .field("public_url", &self.public_url)
            .finish_non_exhaustive()
    }
}
