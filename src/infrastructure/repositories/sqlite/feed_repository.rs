// src/infrastructure/repositories/sqlite/feed_repository.rs
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use diesel::sqlite::Sqlite;
use diesel::upsert::excluded;
use tracing::{debug, instrument};

use super::bookmark_repository::to_u32;
use super::connection::{ConnectionPool, PooledConnection};
use super::error::{SqliteRepositoryError, SqliteResult};
use super::model::{
    to_utc, CountResult, DbCategory, DbEntry, DbEntryMetadata, DbFeed, DbPreferences,
    DbSubscription, EntryRow, SubscribedFeedRow,
};
use super::schema::{
    feed_categories, feed_entries, feed_entries_metadata, feed_preferences, feed_subscriptions,
    feeds,
};
use crate::domain::context::RequestContext;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::feed::{
    Category, Entry, EntryMetadata, EntryVisibility, Feed, Preferences, Subscription,
};
use crate::domain::feed_query::{
    EntryScope, SubscribedFeed, SubscribedFeedEntry, SubscribedFeedsByCategory, SubscriptionView,
};
use crate::domain::repositories::feed_repository::FeedRepository;
use crate::domain::search::WebSearchQuery;

/// Entries reachable through a user's subscriptions, with their read state.
const ENTRY_SCOPE_FROM: &str = " FROM feed_entries e \
     JOIN feed_subscriptions s ON s.feed_uuid = e.feed_uuid \
     JOIN feeds f ON f.uuid = e.feed_uuid \
     LEFT JOIN feed_entries_metadata m ON m.entry_uid = e.uid AND m.user_uuid = s.user_uuid \
     WHERE s.user_uuid = ?";

const ENTRY_ROW_COLUMNS: &str = "SELECT e.uid, e.feed_uuid, e.url, e.title, e.summary, \
     e.published_at, e.updated_at, f.title AS feed_title, s.alias AS subscription_alias, \
     COALESCE(m.read, 0) AS read";

enum CategoryKey<'a> {
    Uuid(&'a str),
    Name(&'a str),
    Slug(&'a str),
}

#[derive(Clone, Debug)]
pub struct SqliteFeedRepository {
    pool: ConnectionPool,
}

/// Builds `select` + the scoped FROM clause with every filter bound.
fn entry_statement<'a>(
    select: &str,
    user_uuid: &str,
    scope: &EntryScope,
    show: EntryVisibility,
    query: Option<&WebSearchQuery>,
) -> BoxedSqlQuery<'a, Sqlite, SqlQuery> {
    let mut statement = sql_query(format!("{}{}", select, ENTRY_SCOPE_FROM))
        .into_boxed::<Sqlite>()
        .bind::<Text, _>(user_uuid.to_string());

    statement = match scope {
        EntryScope::All => statement,
        EntryScope::Category(uuid) => statement
            .sql(" AND s.category_uuid = ?")
            .bind::<Text, _>(uuid.clone()),
        EntryScope::Subscription(uuid) => statement
            .sql(" AND s.uuid = ?")
            .bind::<Text, _>(uuid.clone()),
    };

    statement = match show {
        EntryVisibility::All => statement,
        EntryVisibility::Read => statement.sql(" AND COALESCE(m.read, 0) = 1"),
        EntryVisibility::Unread => statement.sql(" AND COALESCE(m.read, 0) = 0"),
    };

    if let Some(query) = query {
        if let Some(include) = query.fts5_include() {
            statement = statement
                .sql(" AND e.id IN (SELECT rowid FROM feed_entries_fts WHERE feed_entries_fts MATCH ?)")
                .bind::<Text, _>(include);
        }
        if let Some(exclude) = query.fts5_exclude() {
            statement = statement
                .sql(" AND e.id NOT IN (SELECT rowid FROM feed_entries_fts WHERE feed_entries_fts MATCH ?)")
                .bind::<Text, _>(exclude);
        }
    }
    statement
}

impl From<EntryRow> for SubscribedFeedEntry {
    fn from(row: EntryRow) -> Self {
        SubscribedFeedEntry {
            entry: Entry {
                uid: row.uid,
                feed_uuid: row.feed_uuid,
                url: row.url,
                title: row.title,
                summary: row.summary,
                published_at: to_utc(row.published_at),
                updated_at: to_utc(row.updated_at),
            },
            subscription_alias: row.subscription_alias,
            feed_title: row.feed_title,
            read: row.read,
        }
    }
}

impl SqliteFeedRepository {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    fn connection(&self, ctx: &RequestContext) -> DomainResult<PooledConnection> {
        ctx.ensure_active()?;
        Ok(self.pool.get().map_err(SqliteRepositoryError::from)?)
    }

    fn category_where(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        key: CategoryKey<'_>,
    ) -> DomainResult<Option<Category>> {
        let mut conn = self.connection(ctx)?;
        let mut query = feed_categories::table
            .filter(feed_categories::user_uuid.eq(user_uuid.to_string()))
            .into_boxed();
        query = match key {
            CategoryKey::Uuid(uuid) => query.filter(feed_categories::uuid.eq(uuid.to_string())),
            CategoryKey::Name(name) => query.filter(feed_categories::name.eq(name.to_string())),
            CategoryKey::Slug(slug) => query.filter(feed_categories::slug.eq(slug.to_string())),
        };
        let row = query
            .select(DbCategory::as_select())
            .first(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(row.map(Category::from))
    }

    fn feed_where_url_or_uuid(
        &self,
        ctx: &RequestContext,
        url: Option<&str>,
        uuid: Option<&str>,
    ) -> DomainResult<Option<Feed>> {
        let mut conn = self.connection(ctx)?;
        let mut query = feeds::table.into_boxed();
        if let Some(url) = url {
            query = query.filter(feeds::feed_url.eq(url.to_string()));
        }
        if let Some(uuid) = uuid {
            query = query.filter(feeds::uuid.eq(uuid.to_string()));
        }
        let row = query
            .select(DbFeed::as_select())
            .first(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(row.map(Feed::from))
    }
}

fn scoped_entry_uids(
    conn: &mut PooledConnection,
    user_uuid: &str,
    scope: &EntryScope,
) -> SqliteResult<Vec<String>> {
    #[derive(QueryableByName)]
    struct UidRow {
        #[diesel(sql_type = Text)]
        uid: String,
    }

    let rows: Vec<UidRow> = entry_statement("SELECT e.uid", user_uuid, scope, EntryVisibility::All, None)
        .load(conn)?;
    Ok(rows.into_iter().map(|r| r.uid).collect())
}

impl FeedRepository for SqliteFeedRepository {
    #[instrument(skip(self, ctx, feed), level = "debug", fields(url = %feed.feed_url))]
    fn feed_create(&self, ctx: &RequestContext, feed: &Feed) -> DomainResult<()> {
        let mut conn = self.connection(ctx)?;
        diesel::insert_into(feeds::table)
            .values(DbFeed::from(feed))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(())
    }

    fn feed_get_by_url(&self, ctx: &RequestContext, feed_url: &str) -> DomainResult<Option<Feed>> {
        self.feed_where_url_or_uuid(ctx, Some(feed_url), None)
    }

    fn feed_get_by_uuid(&self, ctx: &RequestContext, uuid: &str) -> DomainResult<Option<Feed>> {
        self.feed_where_url_or_uuid(ctx, None, Some(uuid))
    }

    #[instrument(skip(self, ctx, category), level = "debug", fields(name = %category.name))]
    fn category_create(&self, ctx: &RequestContext, category: &Category) -> DomainResult<()> {
        let mut conn = self.connection(ctx)?;
        diesel::insert_into(feed_categories::table)
            .values(DbCategory::from(category))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(())
    }

    fn category_update(&self, ctx: &RequestContext, category: &Category) -> DomainResult<()> {
        let mut conn = self.connection(ctx)?;
        let updated = diesel::update(
            feed_categories::table
                .filter(feed_categories::user_uuid.eq(&category.user_uuid))
                .filter(feed_categories::uuid.eq(&category.uuid)),
        )
        .set((
            feed_categories::name.eq(&category.name),
            feed_categories::slug.eq(&category.slug),
            feed_categories::updated_at.eq(category.updated_at.naive_utc()),
        ))
        .execute(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;
        if updated == 0 {
            return Err(DomainError::CategoryNotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn category_delete(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
    ) -> DomainResult<bool> {
        let mut conn = self.connection(ctx)?;
        let deleted = diesel::delete(
            feed_categories::table
                .filter(feed_categories::user_uuid.eq(user_uuid))
                .filter(feed_categories::uuid.eq(uuid)),
        )
        .execute(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(deleted > 0)
    }

    fn category_get_by_uuid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
    ) -> DomainResult<Option<Category>> {
        self.category_where(ctx, user_uuid, CategoryKey::Uuid(uuid))
    }

    fn category_get_by_name(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        name: &str,
    ) -> DomainResult<Option<Category>> {
        self.category_where(ctx, user_uuid, CategoryKey::Name(name))
    }

    fn category_get_by_slug(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        slug: &str,
    ) -> DomainResult<Option<Category>> {
        self.category_where(ctx, user_uuid, CategoryKey::Slug(slug))
    }

    fn category_get_many(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
    ) -> DomainResult<Vec<Category>> {
        let mut conn = self.connection(ctx)?;
        let rows = feed_categories::table
            .filter(feed_categories::user_uuid.eq(user_uuid))
            .order(feed_categories::name.asc())
            .select(DbCategory::as_select())
            .load(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    fn category_name_and_slug_are_registered(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        name: &str,
        slug: &str,
    ) -> DomainResult<bool> {
        let mut conn = self.connection(ctx)?;
        let exists = diesel::select(diesel::dsl::exists(
            feed_categories::table
                .filter(feed_categories::user_uuid.eq(user_uuid))
                .filter(
                    feed_categories::name
                        .eq(name)
                        .or(feed_categories::slug.eq(slug)),
                ),
        ))
        .get_result::<bool>(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(exists)
    }

    fn category_name_and_slug_are_registered_to_another_category(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
        name: &str,
        slug: &str,
    ) -> DomainResult<bool> {
        let mut conn = self.connection(ctx)?;
        let exists = diesel::select(diesel::dsl::exists(
            feed_categories::table
                .filter(feed_categories::user_uuid.eq(user_uuid))
                .filter(feed_categories::uuid.ne(uuid))
                .filter(
                    feed_categories::name
                        .eq(name)
                        .or(feed_categories::slug.eq(slug)),
                ),
        ))
        .get_result::<bool>(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(exists)
    }

    #[instrument(skip(self, ctx, subscription), level = "debug", fields(feed_uuid = %subscription.feed_uuid))]
    fn subscription_create(
        &self,
        ctx: &RequestContext,
        subscription: &Subscription,
    ) -> DomainResult<()> {
        let mut conn = self.connection(ctx)?;
        diesel::insert_into(feed_subscriptions::table)
            .values(DbSubscription::from(subscription))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(())
    }

    fn subscription_update(
        &self,
        ctx: &RequestContext,
        subscription: &Subscription,
    ) -> DomainResult<()> {
        let mut conn = self.connection(ctx)?;
        let updated = diesel::update(
            feed_subscriptions::table
                .filter(feed_subscriptions::user_uuid.eq(&subscription.user_uuid))
                .filter(feed_subscriptions::uuid.eq(&subscription.uuid)),
        )
        .set((
            feed_subscriptions::category_uuid.eq(&subscription.category_uuid),
            feed_subscriptions::alias.eq(&subscription.alias),
            feed_subscriptions::updated_at.eq(subscription.updated_at.naive_utc()),
        ))
        .execute(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;
        if updated == 0 {
            return Err(DomainError::SubscriptionNotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn subscription_delete(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
    ) -> DomainResult<bool> {
        let mut conn = self.connection(ctx)?;
        let deleted = diesel::delete(
            feed_subscriptions::table
                .filter(feed_subscriptions::user_uuid.eq(user_uuid))
                .filter(feed_subscriptions::uuid.eq(uuid)),
        )
        .execute(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(deleted > 0)
    }

    fn subscription_get_by_uuid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
    ) -> DomainResult<Option<Subscription>> {
        let mut conn = self.connection(ctx)?;
        let row = feed_subscriptions::table
            .filter(feed_subscriptions::user_uuid.eq(user_uuid))
            .filter(feed_subscriptions::uuid.eq(uuid))
            .select(DbSubscription::as_select())
            .first(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(row.map(Subscription::from))
    }

    fn subscription_get_by_feed(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        feed_uuid: &str,
    ) -> DomainResult<Option<Subscription>> {
        let mut conn = self.connection(ctx)?;
        let row = feed_subscriptions::table
            .filter(feed_subscriptions::user_uuid.eq(user_uuid))
            .filter(feed_subscriptions::feed_uuid.eq(feed_uuid))
            .select(DbSubscription::as_select())
            .first(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(row.map(Subscription::from))
    }

    fn subscription_is_registered(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        feed_uuid: &str,
    ) -> DomainResult<bool> {
        Ok(self
            .subscription_get_by_feed(ctx, user_uuid, feed_uuid)?
            .is_some())
    }

    #[instrument(skip_all, level = "debug", fields(n = entries.len()))]
    fn entry_create_many(&self, ctx: &RequestContext, entries: &[Entry]) -> DomainResult<u64> {
        let mut conn = self.connection(ctx)?;
        let inserted = conn.transaction::<u64, SqliteRepositoryError, _>(|conn| {
            let mut inserted = 0;
            for entry in entries {
                ctx.ensure_active()?;
                inserted += diesel::insert_or_ignore_into(feed_entries::table)
                    .values(DbEntry::from(entry))
                    .execute(conn)? as u64;
            }
            Ok(inserted)
        })?;
        debug!("Stored {} new entries", inserted);
        Ok(inserted)
    }

    fn entry_get_by_uid(&self, ctx: &RequestContext, uid: &str) -> DomainResult<Option<Entry>> {
        let mut conn = self.connection(ctx)?;
        let row = feed_entries::table
            .filter(feed_entries::uid.eq(uid))
            .select(DbEntry::as_select())
            .first(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(row.map(Entry::from))
    }

    fn entry_metadata_get(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        entry_uid: &str,
    ) -> DomainResult<Option<EntryMetadata>> {
        let mut conn = self.connection(ctx)?;
        let row = feed_entries_metadata::table
            .filter(feed_entries_metadata::user_uuid.eq(user_uuid))
            .filter(feed_entries_metadata::entry_uid.eq(entry_uid))
            .select(DbEntryMetadata::as_select())
            .first(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(row.map(EntryMetadata::from))
    }

    fn entry_metadata_upsert(
        &self,
        ctx: &RequestContext,
        metadata: &EntryMetadata,
    ) -> DomainResult<()> {
        let mut conn = self.connection(ctx)?;
        diesel::insert_into(feed_entries_metadata::table)
            .values(DbEntryMetadata::from(metadata))
            .on_conflict((
                feed_entries_metadata::user_uuid,
                feed_entries_metadata::entry_uid,
            ))
            .do_update()
            .set((
                feed_entries_metadata::read.eq(excluded(feed_entries_metadata::read)),
                feed_entries_metadata::updated_at.eq(excluded(feed_entries_metadata::updated_at)),
            ))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn entry_mark_all_as_read(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        scope: &EntryScope,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<u64> {
        let mut conn = self.connection(ctx)?;
        let touched = conn.transaction::<u64, SqliteRepositoryError, _>(|conn| {
            let uids = scoped_entry_uids(conn, user_uuid, scope)?;
            for uid in &uids {
                ctx.ensure_active()?;
                diesel::insert_into(feed_entries_metadata::table)
                    .values(DbEntryMetadata {
                        user_uuid: user_uuid.to_string(),
                        entry_uid: uid.clone(),
                        read: true,
                        updated_at: updated_at.naive_utc(),
                    })
                    .on_conflict((
                        feed_entries_metadata::user_uuid,
                        feed_entries_metadata::entry_uid,
                    ))
                    .do_update()
                    .set((
                        feed_entries_metadata::read.eq(true),
                        feed_entries_metadata::updated_at.eq(updated_at.naive_utc()),
                    ))
                    .execute(conn)?;
            }
            Ok(uids.len() as u64)
        })?;
        Ok(touched)
    }

    fn preferences_get(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
    ) -> DomainResult<Option<Preferences>> {
        let mut conn = self.connection(ctx)?;
        let row = feed_preferences::table
            .filter(feed_preferences::user_uuid.eq(user_uuid))
            .select(DbPreferences::as_select())
            .first(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(row.map(DbPreferences::into_domain).transpose()?)
    }

    fn preferences_upsert(
        &self,
        ctx: &RequestContext,
        preferences: &Preferences,
    ) -> DomainResult<()> {
        let mut conn = self.connection(ctx)?;
        diesel::insert_into(feed_preferences::table)
            .values(DbPreferences::from(preferences))
            .on_conflict(feed_preferences::user_uuid)
            .do_update()
            .set((
                feed_preferences::show_entries.eq(excluded(feed_preferences::show_entries)),
                feed_preferences::show_entry_summaries
                    .eq(excluded(feed_preferences::show_entry_summaries)),
                feed_preferences::updated_at.eq(excluded(feed_preferences::updated_at)),
            ))
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn subscribed_feeds_by_category(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
    ) -> DomainResult<Vec<SubscribedFeedsByCategory>> {
        let categories = self.category_get_many(ctx, user_uuid)?;

        let mut conn = self.connection(ctx)?;
        let rows: Vec<SubscribedFeedRow> = sql_query(
            "SELECT s.category_uuid, s.uuid AS subscription_uuid, s.alias, \
             f.uuid, f.feed_url, f.title, f.description, f.slug, f.etag, f.last_modified, \
             f.created_at, f.updated_at, f.fetched_at, \
             (SELECT COUNT(*) FROM feed_entries e \
              LEFT JOIN feed_entries_metadata m ON m.entry_uid = e.uid AND m.user_uuid = s.user_uuid \
              WHERE e.feed_uuid = f.uuid AND COALESCE(m.read, 0) = 0) AS unread \
             FROM feed_subscriptions s JOIN feeds f ON f.uuid = s.feed_uuid \
             WHERE s.user_uuid = ?",
        )
        .bind::<Text, _>(user_uuid)
        .load(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;

        let mut by_category: HashMap<String, Vec<SubscribedFeed>> = HashMap::new();
        for row in rows {
            by_category
                .entry(row.category_uuid)
                .or_default()
                .push(SubscribedFeed {
                    feed: Feed::from(row.feed),
                    subscription_uuid: row.subscription_uuid,
                    alias: row.alias,
                    unread: to_u32(row.unread),
                });
        }

        Ok(categories
            .into_iter()
            .map(|category| {
                let mut subscribed_feeds = by_category.remove(&category.uuid).unwrap_or_default();
                subscribed_feeds.sort_by(|a, b| a.display_title().cmp(b.display_title()));
                SubscribedFeedsByCategory {
                    unread: subscribed_feeds.iter().map(|f| f.unread).sum(),
                    category,
                    subscribed_feeds,
                }
            })
            .collect())
    }

    fn subscription_view_by_uuid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uuid: &str,
    ) -> DomainResult<Option<SubscriptionView>> {
        let mut conn = self.connection(ctx)?;
        let row = feed_subscriptions::table
            .inner_join(feeds::table)
            .filter(feed_subscriptions::user_uuid.eq(user_uuid))
            .filter(feed_subscriptions::uuid.eq(uuid))
            .select((DbSubscription::as_select(), DbFeed::as_select()))
            .first::<(DbSubscription, DbFeed)>(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(row.map(|(subscription, feed)| SubscriptionView {
            uuid: subscription.uuid,
            category_uuid: subscription.category_uuid,
            feed_uuid: feed.uuid,
            alias: subscription.alias,
            feed_url: feed.feed_url,
            feed_title: feed.title,
            feed_description: feed.description,
        }))
    }

    fn entry_count(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        scope: &EntryScope,
        show: EntryVisibility,
        query: Option<&WebSearchQuery>,
    ) -> DomainResult<u32> {
        if query.is_some_and(WebSearchQuery::is_empty) {
            return Ok(0);
        }
        let mut conn = self.connection(ctx)?;
        let result: CountResult =
            entry_statement("SELECT COUNT(*) AS n", user_uuid, scope, show, query)
                .get_result(&mut conn)
                .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(to_u32(result.n))
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn entries_n(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        scope: &EntryScope,
        show: EntryVisibility,
        query: Option<&WebSearchQuery>,
        n: u32,
        offset: u32,
    ) -> DomainResult<Vec<SubscribedFeedEntry>> {
        if query.is_some_and(WebSearchQuery::is_empty) {
            return Ok(Vec::new());
        }
        let mut conn = self.connection(ctx)?;
        let rows: Vec<EntryRow> = entry_statement(ENTRY_ROW_COLUMNS, user_uuid, scope, show, query)
            .sql(" ORDER BY e.published_at DESC, e.uid DESC LIMIT ? OFFSET ?")
            .bind::<BigInt, _>(i64::from(n))
            .bind::<BigInt, _>(i64::from(offset))
            .load(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(rows.into_iter().map(SubscribedFeedEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::{sqlite_user, TestDatabase};
    use chrono::{Duration, TimeZone};
    use serial_test::serial;
    use uuid::Uuid;

    struct Fixture {
        _db: TestDatabase,
        repo: SqliteFeedRepository,
        user: String,
        category: Category,
        subscription: Subscription,
        entries: Vec<Entry>,
    }

    fn fixture() -> Fixture {
        let db = TestDatabase::new();
        let user = sqlite_user(&db.pool, "ann").uuid;
        let repo = SqliteFeedRepository::new(db.pool.clone());
        let ctx = RequestContext::anonymous();

        let mut category = Category::new(&user, "Tech");
        category.uuid = Uuid::new_v4().to_string();
        category.normalize();
        repo.category_create(&ctx, &category).unwrap();

        let mut feed = Feed::from_url("https://blog.test/atom.xml");
        feed.uuid = Uuid::new_v4().to_string();
        feed.title = "Blog".to_string();
        feed.normalize();
        repo.feed_create(&ctx, &feed).unwrap();

        let mut subscription = Subscription::new(&user, &category.uuid, &feed.uuid);
        subscription.uuid = Uuid::new_v4().to_string();
        repo.subscription_create(&ctx, &subscription).unwrap();

        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let entries: Vec<Entry> = ["Async traits", "Borrow checker tips", "Cargo workspaces"]
            .iter()
            .enumerate()
            .map(|(i, title)| {
                let mut entry = Entry::new(
                    &feed.uuid,
                    format!("https://blog.test/{}", i),
                    *title,
                    start + Duration::days(i as i64),
                );
                entry.uid = crate::domain::uid::Uid::new().unwrap().to_string();
                entry.normalize();
                entry
            })
            .collect();
        assert_eq!(repo.entry_create_many(&ctx, &entries).unwrap(), 3);

        Fixture {
            _db: db,
            repo,
            user,
            category,
            subscription,
            entries,
        }
    }

    #[test]
    #[serial]
    fn given_entries_when_listed_then_newest_first_with_feed_title() {
        let f = fixture();
        let ctx = RequestContext::anonymous();

        let listed = f
            .repo
            .entries_n(&ctx, &f.user, &EntryScope::All, EntryVisibility::All, None, 2, 0)
            .unwrap();

        let titles: Vec<&str> = listed.iter().map(|e| e.entry.title.as_str()).collect();
        assert_eq!(titles, ["Cargo workspaces", "Borrow checker tips"]);
        assert_eq!(listed[0].feed_title, "Blog");
        assert!(!listed[0].read);
        assert_eq!(
            f.repo
                .entry_count(&ctx, &f.user, &EntryScope::Category(f.category.uuid.clone()), EntryVisibility::All, None)
                .unwrap(),
            3
        );
    }

    #[test]
    #[serial]
    fn given_read_entry_when_filtered_then_read_state_respected() {
        let f = fixture();
        let ctx = RequestContext::anonymous();
        f.repo
            .entry_metadata_upsert(
                &ctx,
                &EntryMetadata {
                    user_uuid: f.user.clone(),
                    entry_uid: f.entries[0].uid.clone(),
                    read: true,
                    updated_at: Utc::now(),
                },
            )
            .unwrap();
        let scope = EntryScope::Subscription(f.subscription.uuid.clone());

        let unread = f
            .repo
            .entry_count(&ctx, &f.user, &scope, EntryVisibility::Unread, None)
            .unwrap();
        let read = f
            .repo
            .entries_n(&ctx, &f.user, &scope, EntryVisibility::Read, None, 10, 0)
            .unwrap();

        assert_eq!(unread, 2);
        assert_eq!(read.len(), 1);
        assert!(read[0].read);
        let sidebar = f.repo.subscribed_feeds_by_category(&ctx, &f.user).unwrap();
        assert_eq!(sidebar[0].unread, 2);
        assert_eq!(sidebar[0].subscribed_feeds[0].feed.title, "Blog");
    }

    #[test]
    #[serial]
    fn given_scope_when_marked_all_read_then_nothing_unread() {
        let f = fixture();
        let ctx = RequestContext::anonymous();

        let touched = f
            .repo
            .entry_mark_all_as_read(&ctx, &f.user, &EntryScope::All, Utc::now())
            .unwrap();

        assert_eq!(touched, 3);
        assert_eq!(
            f.repo
                .entry_count(&ctx, &f.user, &EntryScope::All, EntryVisibility::Unread, None)
                .unwrap(),
            0
        );
    }

    #[test]
    #[serial]
    fn given_search_query_when_listing_entries_then_full_text_filtered() {
        let f = fixture();
        let ctx = RequestContext::anonymous();
        let query = WebSearchQuery::parse("borrow or cargo -workspaces");

        let found = f
            .repo
            .entries_n(&ctx, &f.user, &EntryScope::All, EntryVisibility::All, Some(&query), 10, 0)
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entry.title, "Borrow checker tips");
    }

    #[test]
    #[serial]
    fn given_duplicate_entries_when_created_then_ignored() {
        let f = fixture();
        let ctx = RequestContext::anonymous();

        let mut again = f.entries[0].clone();
        again.uid = crate::domain::uid::Uid::new().unwrap().to_string();

        assert_eq!(f.repo.entry_create_many(&ctx, &[again]).unwrap(), 0);
    }

    #[test]
    #[serial]
    fn given_category_when_deleted_then_subscriptions_cascade() {
        let f = fixture();
        let ctx = RequestContext::anonymous();

        assert!(f.repo.category_delete(&ctx, &f.user, &f.category.uuid).unwrap());

        assert!(f
            .repo
            .subscription_get_by_uuid(&ctx, &f.user, &f.subscription.uuid)
            .unwrap()
            .is_none());
    }

    #[test]
    #[serial]
    fn given_preferences_when_upserted_twice_then_last_wins() {
        let f = fixture();
        let ctx = RequestContext::anonymous();
        let mut preferences = Preferences::default_for(&f.user);
        f.repo.preferences_upsert(&ctx, &preferences).unwrap();

        preferences.show_entries = EntryVisibility::Unread;
        preferences.show_entry_summaries = false;
        f.repo.preferences_upsert(&ctx, &preferences).unwrap();

        let stored = f.repo.preferences_get(&ctx, &f.user).unwrap().unwrap();
        assert_eq!(stored.show_entries, EntryVisibility::Unread);
        assert!(!stored.show_entry_summaries);
    }

    #[test]
    #[serial]
    fn given_subscription_when_viewed_then_joined_with_feed() {
        let f = fixture();
        let ctx = RequestContext::anonymous();

        let view = f
            .repo
            .subscription_view_by_uuid(&ctx, &f.user, &f.subscription.uuid)
            .unwrap()
            .unwrap();

        assert_eq!(view.feed_url, "https://blog.test/atom.xml");
        assert_eq!(view.category_uuid, f.category.uuid);
    }
}
