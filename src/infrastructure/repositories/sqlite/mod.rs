// src/infrastructure/repositories/sqlite/mod.rs
//! Diesel-backed stores sharing one r2d2 pool.
pub mod bookmark_repository;
pub mod connection;
pub mod error;
pub mod feed_repository;
pub mod migration;
pub mod model;
pub mod schema;
pub mod session_repository;
pub mod user_repository;

pub use bookmark_repository::SqliteBookmarkRepository;
pub use connection::{init_pool, open_pool, ConnectionPool};
pub use feed_repository::SqliteFeedRepository;
pub use session_repository::SqliteSessionRepository;
pub use user_repository::SqliteUserRepository;
