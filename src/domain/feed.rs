// src/domain/feed.rs
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::search::full_text_normalize;
use crate::domain::uid::Uid;

fn slug_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").expect("slug pattern is valid"))
}

/// Lower-kebab form of a name: "Rust & Go News" becomes "rust-go-news".
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    slug_separator()
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

pub fn validate_uuid(value: &str) -> bool {
    Uuid::parse_str(value).is_ok()
}

/// A user-defined group of subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub uuid: String,
    pub user_uuid: String,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(user_uuid: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uuid: String::new(),
            user_uuid: user_uuid.into(),
            name: name.into(),
            slug: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.slug = slugify(&self.name);
    }

    pub fn validate_fields(&self) -> DomainResult<()> {
        if self.user_uuid.is_empty() {
            return Err(DomainError::UserUuidRequired);
        }
        if self.name.is_empty() {
            return Err(DomainError::CategoryNameRequired);
        }
        if self.slug.is_empty() {
            return Err(DomainError::CategorySlugRequired);
        }
        Ok(())
    }

    pub fn validate_uuid(&self) -> DomainResult<()> {
        if self.uuid.is_empty() {
            return Err(DomainError::CategoryUuidRequired);
        }
        if !validate_uuid(&self.uuid) {
            return Err(DomainError::CategoryUuidInvalid);
        }
        Ok(())
    }
}

/// A syndication source, shared by every user subscribed to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feed {
    pub uuid: String,
    pub feed_url: String,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub etag: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Feed {
    /// A feed known only by its URL; the poller fills in title and description.
    pub fn from_url(feed_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uuid: String::new(),
            feed_url: feed_url.into(),
            title: String::new(),
            description: String::new(),
            slug: String::new(),
            etag: String::new(),
            last_modified: None,
            created_at: now,
            updated_at: now,
            fetched_at: None,
        }
    }

    pub fn normalize(&mut self) {
        self.feed_url = self.feed_url.trim().to_string();
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        if self.title.is_empty() {
            self.title = self.feed_url.clone();
        }
        self.slug = slugify(&self.title);
    }

    pub fn validate_url(&self) -> DomainResult<()> {
        validate_feed_url(&self.feed_url)
    }
}

pub fn validate_feed_url(feed_url: &str) -> DomainResult<()> {
    if feed_url.is_empty() {
        return Err(DomainError::FeedUrlRequired);
    }
    let parsed = Url::parse(feed_url).map_err(|e| DomainError::FeedUrlInvalid(e.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(DomainError::FeedUrlUnsupportedScheme);
    }
    if !parsed.has_host() {
        return Err(DomainError::FeedUrlInvalid("no host".to_string()));
    }
    Ok(())
}

/// A user's binding of a feed into one of their categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub uuid: String,
    pub category_uuid: String,
    pub feed_uuid: String,
    pub user_uuid: String,
    pub alias: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(
        user_uuid: impl Into<String>,
        category_uuid: impl Into<String>,
        feed_uuid: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            uuid: String::new(),
            category_uuid: category_uuid.into(),
            feed_uuid: feed_uuid.into(),
            user_uuid: user_uuid.into(),
            alias: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn normalize(&mut self) {
        self.alias = self.alias.trim().to_string();
    }

    pub fn validate_fields(&self) -> DomainResult<()> {
        if self.user_uuid.is_empty() {
            return Err(DomainError::UserUuidRequired);
        }
        if self.category_uuid.is_empty() {
            return Err(DomainError::CategoryUuidRequired);
        }
        if !validate_uuid(&self.category_uuid) {
            return Err(DomainError::CategoryUuidInvalid);
        }
        if self.feed_uuid.is_empty() {
            return Err(DomainError::FeedNotFound);
        }
        Ok(())
    }
}

/// An item published by a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub uid: String,
    pub feed_uuid: String,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(
        feed_uuid: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            uid: String::new(),
            feed_uuid: feed_uuid.into(),
            url: url.into(),
            title: title.into(),
            summary: String::new(),
            published_at,
            updated_at: published_at,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn normalize(&mut self) {
        self.url = self.url.trim().to_string();
        self.title = self.title.trim().to_string();
        self.summary = self.summary.trim().to_string();
    }

    pub fn full_text_string(&self) -> String {
        full_text_normalize(&format!("{} {}", self.title, self.summary))
    }

    pub fn validate_for_addition(&self) -> DomainResult<()> {
        crate::domain::bookmark::validate_url(&self.url)?;
        if self.title.is_empty() {
            return Err(DomainError::TitleRequired);
        }
        if self.uid.is_empty() {
            return Err(DomainError::UidRequired);
        }
        Uid::validate(&self.uid)
    }
}

/// Per-user read state of an entry. A missing row means unread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryMetadata {
    pub user_uuid: String,
    pub entry_uid: String,
    pub read: bool,
    pub updated_at: DateTime<Utc>,
}

/// Which entries a listing shows, by read state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryVisibility {
    #[default]
    All,
    Read,
    Unread,
}

impl EntryVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryVisibility::All => "ALL",
            EntryVisibility::Read => "READ",
            EntryVisibility::Unread => "UNREAD",
        }
    }

    pub fn matches(&self, read: bool) -> bool {
        match self {
            EntryVisibility::All => true,
            EntryVisibility::Read => read,
            EntryVisibility::Unread => !read,
        }
    }
}

impl fmt::Display for EntryVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryVisibility {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ALL" => Ok(EntryVisibility::All),
            "READ" => Ok(EntryVisibility::Read),
            "UNREAD" => Ok(EntryVisibility::Unread),
            _ => Err(DomainError::EntryVisibilityInvalid(s.to_string())),
        }
    }
}

/// Per-user display preferences for feed listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preferences {
    pub user_uuid: String,
    pub show_entries: EntryVisibility,
    pub show_entry_summaries: bool,
    pub updated_at: DateTime<Utc>,
}

impl Preferences {
    pub fn default_for(user_uuid: impl Into<String>) -> Self {
        Self {
            user_uuid: user_uuid.into(),
            show_entries: EntryVisibility::All,
            show_entry_summaries: true,
            updated_at: Utc::now(),
        }
    }
}
