pub mod feed_repository;
pub mod repository;
pub mod session_repository;
pub mod user_repository;
