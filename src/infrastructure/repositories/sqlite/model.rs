// src/infrastructure/repositories/sqlite/model.rs
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::sql_types::{BigInt, Bool, Integer, Text, Timestamp};
use diesel::{AsChangeset, Insertable, Queryable, QueryableByName, Selectable};

use super::error::{SqliteRepositoryError, SqliteResult};
use super::schema::{
    bookmarks, feed_categories, feed_entries, feed_entries_metadata, feed_preferences,
    feed_subscriptions, feeds, sessions, users,
};
use crate::domain::bookmark::Bookmark;
use crate::domain::feed::{Category, Entry, EntryMetadata, Feed, Preferences, Subscription};
use crate::domain::session::Session;
use crate::domain::user::User;

pub(crate) fn to_utc(ts: NaiveDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc)
}

#[derive(QueryableByName, Debug)]
pub struct CountResult {
    #[diesel(sql_type = BigInt)]
    pub n: i64,
}

#[derive(Queryable, Selectable, QueryableByName, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbUser {
    pub uuid: String,
    pub email: String,
    pub nick_name: String,
    pub display_name: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&User> for DbUser {
    fn from(u: &User) -> Self {
        Self {
            uuid: u.uuid.clone(),
            email: u.email.clone(),
            nick_name: u.nick_name.clone(),
            display_name: u.display_name.clone(),
            password_hash: u.password_hash.clone(),
            is_admin: u.is_admin,
            created_at: u.created_at.naive_utc(),
            updated_at: u.updated_at.naive_utc(),
        }
    }
}

impl From<DbUser> for User {
    fn from(u: DbUser) -> Self {
        User {
            uuid: u.uuid,
            email: u.email,
            nick_name: u.nick_name,
            display_name: u.display_name,
            password: String::new(),
            password_hash: u.password_hash,
            is_admin: u.is_admin,
            created_at: to_utc(u.created_at),
            updated_at: to_utc(u.updated_at),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbSession {
    pub remember_token_hash: String,
    pub user_uuid: String,
    pub remember_token_expires_at: Option<NaiveDateTime>,
}

impl From<&Session> for DbSession {
    fn from(s: &Session) -> Self {
        Self {
            remember_token_hash: s.remember_token_hash.clone(),
            user_uuid: s.user_uuid.clone(),
            remember_token_expires_at: s.remember_token_expires_at.map(|t| t.naive_utc()),
        }
    }
}

impl From<DbSession> for Session {
    fn from(s: DbSession) -> Self {
        Session {
            user_uuid: s.user_uuid,
            remember_token: String::new(),
            remember_token_hash: s.remember_token_hash,
            remember_token_expires_at: s.remember_token_expires_at.map(to_utc),
        }
    }
}

/// Bookmark row; `tags` holds a JSON array of strings.
#[derive(Queryable, Selectable, QueryableByName, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = bookmarks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbBookmark {
    pub uid: String,
    pub user_uuid: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub private: bool,
    pub tags: String,
    pub fulltextsearch_string: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl DbBookmark {
    pub fn from_domain(b: &Bookmark) -> SqliteResult<Self> {
        Ok(Self {
            uid: b.uid.clone(),
            user_uuid: b.user_uuid.clone(),
            url: b.url.clone(),
            title: b.title.clone(),
            description: b.description.clone(),
            private: b.private,
            tags: serde_json::to_string(&b.tags)?,
            fulltextsearch_string: b.full_text_string(),
            created_at: b.created_at.naive_utc(),
            updated_at: b.updated_at.naive_utc(),
        })
    }

    pub fn into_domain(self) -> SqliteResult<Bookmark> {
        let tags: Vec<String> = serde_json::from_str(&self.tags).map_err(|e| {
            SqliteRepositoryError::ConversionError(format!("tags of bookmark {}: {}", self.uid, e))
        })?;
        Ok(Bookmark {
            uid: self.uid,
            user_uuid: self.user_uuid,
            url: self.url,
            title: self.title,
            description: self.description,
            private: self.private,
            tags,
            created_at: to_utc(self.created_at),
            updated_at: to_utc(self.updated_at),
        })
    }
}

/// Tags frequency for aggregation queries
#[derive(QueryableByName, Debug)]
pub struct TagsFrequency {
    #[diesel(sql_type = Text)]
    pub tag: String,

    #[diesel(sql_type = Integer)]
    pub n: i32,
}

#[derive(Queryable, Selectable, QueryableByName, Insertable, Debug, Clone)]
#[diesel(table_name = feeds)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbFeed {
    pub uuid: String,
    pub feed_url: String,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub etag: String,
    pub last_modified: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub fetched_at: Option<NaiveDateTime>,
}

impl From<&Feed> for DbFeed {
    fn from(f: &Feed) -> Self {
        Self {
            uuid: f.uuid.clone(),
            feed_url: f.feed_url.clone(),
            title: f.title.clone(),
            description: f.description.clone(),
            slug: f.slug.clone(),
            etag: f.etag.clone(),
            last_modified: f.last_modified.map(|t| t.naive_utc()),
            created_at: f.created_at.naive_utc(),
            updated_at: f.updated_at.naive_utc(),
            fetched_at: f.fetched_at.map(|t| t.naive_utc()),
        }
    }
}

impl From<DbFeed> for Feed {
    fn from(f: DbFeed) -> Self {
        Feed {
            uuid: f.uuid,
            feed_url: f.feed_url,
            title: f.title,
            description: f.description,
            slug: f.slug,
            etag: f.etag,
            last_modified: f.last_modified.map(to_utc),
            created_at: to_utc(f.created_at),
            updated_at: to_utc(f.updated_at),
            fetched_at: f.fetched_at.map(to_utc),
        }
    }
}

#[derive(Queryable, Selectable, QueryableByName, Insertable, Debug, Clone)]
#[diesel(table_name = feed_categories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbCategory {
    pub uuid: String,
    pub user_uuid: String,
    pub name: String,
    pub slug: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&Category> for DbCategory {
    fn from(c: &Category) -> Self {
        Self {
            uuid: c.uuid.clone(),
            user_uuid: c.user_uuid.clone(),
            name: c.name.clone(),
            slug: c.slug.clone(),
            created_at: c.created_at.naive_utc(),
            updated_at: c.updated_at.naive_utc(),
        }
    }
}

impl From<DbCategory> for Category {
    fn from(c: DbCategory) -> Self {
        Category {
            uuid: c.uuid,
            user_uuid: c.user_uuid,
            name: c.name,
            slug: c.slug,
            created_at: to_utc(c.created_at),
            updated_at: to_utc(c.updated_at),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = feed_subscriptions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbSubscription {
    pub uuid: String,
    pub category_uuid: String,
    pub feed_uuid: String,
    pub user_uuid: String,
    pub alias: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&Subscription> for DbSubscription {
    fn from(s: &Subscription) -> Self {
        Self {
            uuid: s.uuid.clone(),
            category_uuid: s.category_uuid.clone(),
            feed_uuid: s.feed_uuid.clone(),
            user_uuid: s.user_uuid.clone(),
            alias: s.alias.clone(),
            created_at: s.created_at.naive_utc(),
            updated_at: s.updated_at.naive_utc(),
        }
    }
}

impl From<DbSubscription> for Subscription {
    fn from(s: DbSubscription) -> Self {
        Subscription {
            uuid: s.uuid,
            category_uuid: s.category_uuid,
            feed_uuid: s.feed_uuid,
            user_uuid: s.user_uuid,
            alias: s.alias,
            created_at: to_utc(s.created_at),
            updated_at: to_utc(s.updated_at),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = feed_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbEntry {
    pub uid: String,
    pub feed_uuid: String,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub fulltextsearch_string: String,
    pub published_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&Entry> for DbEntry {
    fn from(e: &Entry) -> Self {
        Self {
            uid: e.uid.clone(),
            feed_uuid: e.feed_uuid.clone(),
            url: e.url.clone(),
            title: e.title.clone(),
            summary: e.summary.clone(),
            fulltextsearch_string: e.full_text_string(),
            published_at: e.published_at.naive_utc(),
            updated_at: e.updated_at.naive_utc(),
        }
    }
}

impl From<DbEntry> for Entry {
    fn from(e: DbEntry) -> Self {
        Entry {
            uid: e.uid,
            feed_uuid: e.feed_uuid,
            url: e.url,
            title: e.title,
            summary: e.summary,
            published_at: to_utc(e.published_at),
            updated_at: to_utc(e.updated_at),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = feed_entries_metadata)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbEntryMetadata {
    pub user_uuid: String,
    pub entry_uid: String,
    pub read: bool,
    pub updated_at: NaiveDateTime,
}

impl From<&EntryMetadata> for DbEntryMetadata {
    fn from(m: &EntryMetadata) -> Self {
        Self {
            user_uuid: m.user_uuid.clone(),
            entry_uid: m.entry_uid.clone(),
            read: m.read,
            updated_at: m.updated_at.naive_utc(),
        }
    }
}

impl From<DbEntryMetadata> for EntryMetadata {
    fn from(m: DbEntryMetadata) -> Self {
        EntryMetadata {
            user_uuid: m.user_uuid,
            entry_uid: m.entry_uid,
            read: m.read,
            updated_at: to_utc(m.updated_at),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = feed_preferences)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbPreferences {
    pub user_uuid: String,
    pub show_entries: String,
    pub show_entry_summaries: bool,
    pub updated_at: NaiveDateTime,
}

impl From<&Preferences> for DbPreferences {
    fn from(p: &Preferences) -> Self {
        Self {
            user_uuid: p.user_uuid.clone(),
            show_entries: p.show_entries.as_str().to_string(),
            show_entry_summaries: p.show_entry_summaries,
            updated_at: p.updated_at.naive_utc(),
        }
    }
}

impl DbPreferences {
    pub fn into_domain(self) -> SqliteResult<Preferences> {
        Ok(Preferences {
            show_entries: self
                .show_entries
                .parse()
                .map_err(|e| SqliteRepositoryError::ConversionError(format!("{}", e)))?,
            user_uuid: self.user_uuid,
            show_entry_summaries: self.show_entry_summaries,
            updated_at: to_utc(self.updated_at),
        })
    }
}

/// Sidebar row: one subscription with its feed and unread count.
#[derive(QueryableByName, Debug)]
pub struct SubscribedFeedRow {
    #[diesel(sql_type = Text)]
    pub category_uuid: String,
    #[diesel(sql_type = Text)]
    pub subscription_uuid: String,
    #[diesel(sql_type = Text)]
    pub alias: String,
    #[diesel(embed)]
    pub feed: DbFeed,
    #[diesel(sql_type = BigInt)]
    pub unread: i64,
}

/// Listing row: an entry joined with its feed title, alias and read flag.
#[derive(QueryableByName, Debug)]
pub struct EntryRow {
    #[diesel(sql_type = Text)]
    pub uid: String,
    #[diesel(sql_type = Text)]
    pub feed_uuid: String,
    #[diesel(sql_type = Text)]
    pub url: String,
    #[diesel(sql_type = Text)]
    pub title: String,
    #[diesel(sql_type = Text)]
    pub summary: String,
    #[diesel(sql_type = Timestamp)]
    pub published_at: NaiveDateTime,
    #[diesel(sql_type = Timestamp)]
    pub updated_at: NaiveDateTime,
    #[diesel(sql_type = Text)]
    pub feed_title: String,
    #[diesel(sql_type = Text)]
    pub subscription_alias: String,
    #[diesel(sql_type = Bool)]
    pub read: bool,
}
