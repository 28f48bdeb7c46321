// src/domain/bookmark.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::search::full_text_normalize;
use crate::domain::uid::Uid;

/// A bookmark owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Empty until the service assigns one on addition.
    pub uid: String,
    pub user_uuid: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub private: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bookmark {
    /// Starts a bookmark for `user_uuid`; identifiers and timestamps are
    /// assigned by the service.
    pub fn new(user_uuid: impl Into<String>, url: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            uid: String::new(),
            user_uuid: user_uuid.into(),
            url: url.into(),
            title: title.into(),
            description: String::new(),
            private: false,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    /// Trims text fields and canonicalises the tag set.
    pub fn normalize(&mut self) {
        self.url = self.url.trim().to_string();
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.tags = normalize_tags(&self.tags);
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t == name)
    }

    /// Checks the invariants that do not need the store: URL, title, owner.
    pub fn validate_fields(&self) -> DomainResult<()> {
        if self.user_uuid.is_empty() {
            return Err(DomainError::UserUuidRequired);
        }
        validate_url(&self.url)?;
        if self.title.is_empty() {
            return Err(DomainError::TitleRequired);
        }
        Ok(())
    }

    pub fn validate_uid(&self) -> DomainResult<()> {
        validate_uid(&self.uid)
    }

    /// Text indexed for full-text search: title, description and tags.
    pub fn full_text_string(&self) -> String {
        full_text_normalize(&format!(
            "{} {} {}",
            self.title,
            self.description,
            self.tags.join(" ")
        ))
    }
}

/// Trims each tag, drops empties and duplicates, sorts ascending.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.as_ref().trim())
        .filter(|tag| !tag.is_empty())
        .unique()
        .sorted()
        .map(str::to_string)
        .collect()
}

pub fn validate_url(url: &str) -> DomainResult<()> {
    if url.is_empty() {
        return Err(DomainError::UrlRequired);
    }
    match Url::parse(url) {
        Ok(parsed) => {
            if !parsed.has_host() {
                return Err(DomainError::UrlNoHost);
            }
            Ok(())
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => Err(DomainError::UrlNoScheme),
        Err(url::ParseError::EmptyHost) => Err(DomainError::UrlNoHost),
        Err(e) => Err(DomainError::UrlInvalid(e.to_string())),
    }
}

pub fn validate_uid(uid: &str) -> DomainResult<()> {
    if uid.is_empty() {
        return Err(DomainError::UidRequired);
    }
    Uid::validate(uid)
}

/// Visibility filter applied to bookmark listings and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    All,
    Private,
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::All => "all",
            Visibility::Private => "private",
            Visibility::Public => "public",
        }
    }

    pub fn matches(&self, private: bool) -> bool {
        match self {
            Visibility::All => true,
            Visibility::Private => private,
            Visibility::Public => !private,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Visibility::All),
            "private" => Ok(Visibility::Private),
            "public" => Ok(Visibility::Public),
            other => Err(DomainError::VisibilityInvalid(other.to_string())),
        }
    }
}

fn ensure_tag_name(name: &str) -> DomainResult<()> {
    if name.is_empty() {
        return Err(DomainError::TagNameRequired);
    }
    if name.chars().any(char::is_whitespace) {
        return Err(DomainError::TagNameContainsWhitespace);
    }
    Ok(())
}

/// Removes a tag from every bookmark of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDeleteQuery {
    pub user_uuid: String,
    pub name: String,
}

impl TagDeleteQuery {
    pub fn new(user_uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_uuid: user_uuid.into(),
            name: name.into(),
        }
    }

    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.user_uuid.is_empty() {
            return Err(DomainError::UserUuidRequired);
        }
        ensure_tag_name(&self.name)
    }
}

/// Renames a tag on every bookmark of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagUpdateQuery {
    pub user_uuid: String,
    pub current_name: String,
    pub new_name: String,
}

impl TagUpdateQuery {
    pub fn new(
        user_uuid: impl Into<String>,
        current_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        Self {
            user_uuid: user_uuid.into(),
            current_name: current_name.into(),
            new_name: new_name.into(),
        }
    }

    pub fn normalize(&mut self) {
        self.current_name = self.current_name.trim().to_string();
        self.new_name = self.new_name.trim().to_string();
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.user_uuid.is_empty() {
            return Err(DomainError::UserUuidRequired);
        }
        ensure_tag_name(&self.current_name)?;
        ensure_tag_name(&self.new_name)?;
        if self.current_name == self.new_name {
            return Err(DomainError::TagNewNameEqualsCurrentName);
        }
        Ok(())
    }

    /// Replaces the current name in `tags`, then re-canonicalises the set.
    pub fn rewrite(&self, tags: &[String]) -> Vec<String> {
        let replaced: Vec<&str> = tags
            .iter()
            .map(|t| {
                if *t == self.current_name {
                    self.new_name.as_str()
                } else {
                    t.as_str()
                }
            })
            .collect();
        normalize_tags(&replaced)
    }
}
