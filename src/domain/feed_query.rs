// src/domain/feed_query.rs
//! Read models joining feeds, subscriptions and per-user read state.
use serde::Serialize;

use crate::domain::feed::{Category, Entry, Feed};

/// Which entries a feed listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryScope {
    All,
    Category(String),
    Subscription(String),
}

/// A feed as seen through one user's subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscribedFeed {
    pub feed: Feed,
    pub subscription_uuid: String,
    pub alias: String,
    pub unread: u32,
}

impl SubscribedFeed {
    /// Alias when set, otherwise the feed title.
    pub fn display_title(&self) -> &str {
        if self.alias.is_empty() {
            &self.feed.title
        } else {
            &self.alias
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscribedFeedsByCategory {
    pub category: Category,
    pub unread: u32,
    pub subscribed_feeds: Vec<SubscribedFeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscribedFeedEntry {
    pub entry: Entry,
    pub subscription_alias: String,
    pub feed_title: String,
    pub read: bool,
}

/// Subscription details for management screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionView {
    pub uuid: String,
    pub category_uuid: String,
    pub feed_uuid: String,
    pub alias: String,
    pub feed_url: String,
    pub feed_title: String,
    pub feed_description: String,
}
