// src/domain/exchange.rs
//! Format-neutral documents exchanged through bookmark and subscription import/export.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::bookmark::Bookmark;
use crate::domain::error::{DomainError, DomainResult};

/// Name of the category receiving subscriptions that are not filed under one.
pub const DEFAULT_CATEGORY_NAME: &str = "Default";

/// A bookmark as carried by an export file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookmarkRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub private: bool,
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Bookmark> for BookmarkRecord {
    fn from(b: &Bookmark) -> Self {
        Self {
            url: b.url.clone(),
            title: b.title.clone(),
            description: b.description.clone(),
            private: b.private,
            tags: b.tags.clone(),
            created_at: Some(b.created_at),
            updated_at: Some(b.updated_at),
        }
    }
}

/// A flat list of bookmarks; folder hierarchies are flattened on decode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookmarkDocument {
    pub title: String,
    pub exported_at: Option<DateTime<Utc>>,
    pub bookmarks: Vec<BookmarkRecord>,
}

/// Wire formats for bookmark documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DocumentFormat {
    Json,
    #[default]
    Netscape,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Json => "json",
            DocumentFormat::Netscape => "netscape",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            DocumentFormat::Json => "json",
            DocumentFormat::Netscape => "htm",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            DocumentFormat::Json => "application/json",
            DocumentFormat::Netscape => "text/html; charset=utf-8",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(DocumentFormat::Json),
            "netscape" => Ok(DocumentFormat::Netscape),
            other => Err(DomainError::DocumentFormatInvalid(other.to_string())),
        }
    }
}

/// What a bookmark import does when a URL is already stored for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OnConflict {
    Overwrite,
    #[default]
    Keep,
}

impl OnConflict {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnConflict::Overwrite => "overwrite",
            OnConflict::Keep => "keep",
        }
    }
}

impl fmt::Display for OnConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnConflict {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overwrite" => Ok(OnConflict::Overwrite),
            "keep" => Ok(OnConflict::Keep),
            other => Err(DomainError::OnConflictStrategyInvalid(other.to_string())),
        }
    }
}

/// Privacy applied to imported bookmarks; `Default` keeps the flag read from the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImportVisibility {
    #[default]
    Default,
    Private,
    Public,
}

impl ImportVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportVisibility::Default => "default",
            ImportVisibility::Private => "private",
            ImportVisibility::Public => "public",
        }
    }

    pub fn apply(&self, private: bool) -> bool {
        match self {
            ImportVisibility::Default => private,
            ImportVisibility::Private => true,
            ImportVisibility::Public => false,
        }
    }
}

impl fmt::Display for ImportVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportVisibility {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(ImportVisibility::Default),
            "private" => Ok(ImportVisibility::Private),
            "public" => Ok(ImportVisibility::Public),
            other => Err(DomainError::VisibilityInvalid(other.to_string())),
        }
    }
}

/// Outcome of a bookmark import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportStatus {
    pub new_or_updated: u64,
    pub skipped: u64,
    pub invalid: u64,
    pub overwrite: bool,
}

impl ImportStatus {
    pub fn summary(&self) -> String {
        let label = if self.overwrite { "new or updated" } else { "new" };
        format!(
            "{} {}, {} skipped, {} invalid",
            self.new_or_updated, label, self.skipped, self.invalid
        )
    }
}

/// A `(total, created)` pair counted while importing subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportCount {
    pub total: u64,
    pub created: u64,
}

impl ImportCount {
    pub fn record(&mut self, created: bool) {
        self.total += 1;
        if created {
            self.created += 1;
        }
    }
}

/// Outcome of a subscription import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutlineImportStatus {
    pub categories: ImportCount,
    pub feeds: ImportCount,
    pub subscriptions: ImportCount,
}

impl OutlineImportStatus {
    pub fn summary(&self) -> String {
        format!(
            "{} categories ({} new), {} subscriptions ({} new)",
            self.categories.total,
            self.categories.created,
            self.subscriptions.total,
            self.subscriptions.created
        )
    }
}

/// Reads and writes bookmark documents in one wire format.
pub trait DocumentCodec: fmt::Debug + Send + Sync {
    fn format(&self) -> DocumentFormat;

    fn decode(&self, input: &str) -> DomainResult<BookmarkDocument>;

    fn encode(&self, document: &BookmarkDocument) -> DomainResult<String>;
}

/// Picks the codec handling `format` among those the service was built with.
pub fn find_codec(
    codecs: &[Arc<dyn DocumentCodec>],
    format: DocumentFormat,
) -> DomainResult<&Arc<dyn DocumentCodec>> {
    codecs
        .iter()
        .find(|c| c.format() == format)
        .ok_or_else(|| DomainError::DocumentFormatInvalid(format.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscriptionOutline {
    pub title: String,
    pub feed_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryOutline {
    pub name: String,
    pub subscriptions: Vec<SubscriptionOutline>,
}

/// Subscriptions grouped by category, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutlineDocument {
    pub title: String,
    pub created_at: Option<DateTime<Utc>>,
    pub categories: Vec<CategoryOutline>,
}

impl OutlineDocument {
    /// Appends a subscription to the named category, creating the category on first use.
    pub fn push(&mut self, category: &str, subscription: SubscriptionOutline) {
        match self.categories.iter_mut().find(|c| c.name == category) {
            Some(existing) => existing.subscriptions.push(subscription),
            None => self.categories.push(CategoryOutline {
                name: category.to_string(),
                subscriptions: vec![subscription],
            }),
        }
    }
}

/// Reads and writes subscription outlines.
pub trait OutlineCodec: fmt::Debug + Send + Sync {
    fn decode(&self, input: &str) -> DomainResult<OutlineDocument>;

    fn encode(&self, document: &OutlineDocument) -> DomainResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_repeated_category_when_pushing_then_grouped_in_first_seen_order() {
        let mut doc = OutlineDocument::default();
        let sub = |url: &str| SubscriptionOutline {
            title: String::new(),
            feed_url: url.to_string(),
        };
        doc.push("Tech", sub("https://a.test/feed"));
        doc.push(DEFAULT_CATEGORY_NAME, sub("https://b.test/feed"));
        doc.push("Tech", sub("https://c.test/feed"));

        assert_eq!(doc.categories.len(), 2);
        assert_eq!(doc.categories[0].name, "Tech");
        assert_eq!(doc.categories[0].subscriptions.len(), 2);
        assert_eq!(doc.categories[1].name, "Default");
    }

    #[test]
    fn given_format_names_when_parsed_then_known_only() {
        assert_eq!("json".parse::<DocumentFormat>().unwrap(), DocumentFormat::Json);
        assert_eq!("netscape".parse::<DocumentFormat>().unwrap(), DocumentFormat::Netscape);
        assert!(matches!(
            "yaml".parse::<DocumentFormat>(),
            Err(DomainError::DocumentFormatInvalid(_))
        ));
    }

    #[test]
    fn given_import_options_when_parsed_then_unknown_values_rejected() {
        assert_eq!("overwrite".parse::<OnConflict>().unwrap(), OnConflict::Overwrite);
        assert!(matches!(
            "replace".parse::<OnConflict>(),
            Err(DomainError::OnConflictStrategyInvalid(_))
        ));
        assert!(ImportVisibility::Private.apply(false));
        assert!(!ImportVisibility::Public.apply(true));
        assert!(ImportVisibility::Default.apply(true));
        assert!(matches!(
            "all".parse::<ImportVisibility>(),
            Err(DomainError::VisibilityInvalid(_))
        ));
    }

    #[test]
    fn given_statuses_when_summarized_then_strategy_worded() {
        let keep = ImportStatus {
            new_or_updated: 1,
            skipped: 2,
            invalid: 0,
            overwrite: false,
        };
        assert_eq!(keep.summary(), "1 new, 2 skipped, 0 invalid");

        let overwrite = ImportStatus {
            overwrite: true,
            ..keep
        };
        assert_eq!(overwrite.summary(), "1 new or updated, 2 skipped, 0 invalid");

        let mut feeds = OutlineImportStatus::default();
        feeds.categories.record(true);
        feeds.subscriptions.record(true);
        feeds.subscriptions.record(false);
        assert_eq!(feeds.summary(), "1 categories (1 new), 2 subscriptions (1 new)");
    }
}
