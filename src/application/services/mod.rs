// src/application/services/mod.rs
pub mod bookmark_export_service;
pub mod bookmark_import_service;
pub mod bookmark_query_service;
pub mod bookmark_service;
pub mod bookmark_service_impl;
pub mod csrf_service;
pub mod feed_export_service;
pub mod feed_import_service;
pub mod feed_query_service;
pub mod feed_service;
pub mod session_service;
pub mod user_service;

pub use bookmark_export_service::{BookmarkExportService, BookmarkExportServiceImpl, ExportFile};
pub use bookmark_import_service::{
    BookmarkImportOptions, BookmarkImportService, BookmarkImportServiceImpl,
};
pub use bookmark_query_service::{BookmarkQueryService, BookmarkQueryServiceImpl};
pub use bookmark_service::BookmarkService;
pub use csrf_service::CsrfService;
pub use feed_export_service::{FeedExportService, FeedExportServiceImpl};
pub use feed_import_service::{FeedImportReport, FeedImportService, FeedImportServiceImpl};
pub use feed_query_service::{FeedQueryService, FeedQueryServiceImpl};
pub use feed_service::{FeedService, FeedServiceImpl};
pub use session_service::{SessionService, SessionServiceImpl};
pub use user_service::{UserService, UserServiceImpl};
