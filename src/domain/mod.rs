pub mod bookmark;
pub mod context;
pub mod error;
pub mod exchange;
pub mod feed;
pub mod feed_query;
pub mod pagination;
pub mod repositories;
pub mod search;
pub mod session;
pub mod tag;
pub mod uid;
pub mod user;
