// src/infrastructure/repositories/sqlite/bookmark_repository.rs

use diesel::prelude::*;
use diesel::query_builder::BoxedSqlQuery;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use diesel::sqlite::Sqlite;
use diesel::upsert::excluded;
use tracing::{debug, instrument};

use super::connection::{ConnectionPool, PooledConnection};
use super::error::{SqliteRepositoryError, SqliteResult};
use super::model::{CountResult, DbBookmark, TagsFrequency};
use super::schema::bookmarks::dsl;
use crate::domain::bookmark::{Bookmark, Visibility};
use crate::domain::context::RequestContext;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::repositories::repository::BookmarkRepository;
use crate::domain::search::WebSearchQuery;
use crate::domain::tag::Tag;

const BOOKMARK_COLUMNS: &str = "b.uid, b.user_uuid, b.url, b.title, b.description, b.private, \
     b.tags, b.fulltextsearch_string, b.created_at, b.updated_at";

#[derive(Clone, Debug)]
pub struct SqliteBookmarkRepository {
    pool: ConnectionPool,
}

pub(crate) fn visibility_sql(visibility: Visibility, alias: &str) -> String {
    match visibility {
        Visibility::All => String::new(),
        Visibility::Private => format!(" AND {}.private = 1", alias),
        Visibility::Public => format!(" AND {}.private = 0", alias),
    }
}

pub(crate) fn to_u32(n: i64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn collect_bookmarks(rows: Vec<DbBookmark>) -> SqliteResult<Vec<Bookmark>> {
    rows.into_iter().map(DbBookmark::into_domain).collect()
}

/// Appends the full-text constraints of `query` to a statement selecting from `bookmarks b`.
fn with_search<'a>(
    statement: BoxedSqlQuery<'a, Sqlite, diesel::query_builder::SqlQuery>,
    query: &WebSearchQuery,
) -> BoxedSqlQuery<'a, Sqlite, diesel::query_builder::SqlQuery> {
    let mut statement = statement;
    if let Some(include) = query.fts5_include() {
        statement = statement
            .sql(" AND b.id IN (SELECT rowid FROM bookmarks_fts WHERE bookmarks_fts MATCH ?)")
            .bind::<Text, _>(include);
    }
    if let Some(exclude) = query.fts5_exclude() {
        statement = statement
            .sql(" AND b.id NOT IN (SELECT rowid FROM bookmarks_fts WHERE bookmarks_fts MATCH ?)")
            .bind::<Text, _>(exclude);
    }
    statement
}

/// Tag frequencies joined through `json_each`, optionally filtered by substring.
fn tag_statement<'a>(
    select: &str,
    user_uuid: &str,
    visibility: Visibility,
    filter: Option<&str>,
) -> BoxedSqlQuery<'a, Sqlite, diesel::query_builder::SqlQuery> {
    let mut statement = sql_query(format!(
        "SELECT {} FROM bookmarks b, json_each(b.tags) t WHERE b.user_uuid = ?",
        select
    ))
    .into_boxed::<Sqlite>()
    .bind::<Text, _>(user_uuid.to_string())
    .sql(visibility_sql(visibility, "b"));

    // SQLite lower() folds ASCII only
    if let Some(filter) = filter.map(str::to_ascii_lowercase).filter(|f| !f.is_empty()) {
        statement = statement
            .sql(" AND instr(lower(t.value), ?) > 0")
            .bind::<Text, _>(filter);
    }
    statement
}

impl SqliteBookmarkRepository {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Create a repository on a fresh pool, running pending migrations
    #[instrument(skip_all, level = "debug")]
    pub fn from_url(database_url: &str) -> SqliteResult<Self> {
        let pool = super::connection::init_pool(database_url)?;
        Ok(Self { pool })
    }

    /// Checks the request is still live, then takes a connection from the pool
    fn connection(&self, ctx: &RequestContext) -> DomainResult<PooledConnection> {
        ctx.ensure_active()?;
        Ok(self.pool.get().map_err(SqliteRepositoryError::from)?)
    }

    fn listing(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        query: Option<&WebSearchQuery>,
        n: u32,
        offset: u32,
    ) -> DomainResult<Vec<Bookmark>> {
        let mut conn = self.connection(ctx)?;
        let mut statement = sql_query(format!(
            "SELECT {} FROM bookmarks b WHERE b.user_uuid = ?",
            BOOKMARK_COLUMNS
        ))
        .into_boxed::<Sqlite>()
        .bind::<Text, _>(user_uuid.to_string())
        .sql(visibility_sql(visibility, "b"));
        if let Some(query) = query {
            statement = with_search(statement, query);
        }
        let rows: Vec<DbBookmark> = statement
            .sql(" ORDER BY b.created_at DESC, b.uid DESC LIMIT ? OFFSET ?")
            .bind::<BigInt, _>(i64::from(n))
            .bind::<BigInt, _>(i64::from(offset))
            .load(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(collect_bookmarks(rows)?)
    }

    fn counting(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        query: Option<&WebSearchQuery>,
    ) -> DomainResult<u32> {
        let mut conn = self.connection(ctx)?;
        let mut statement = sql_query("SELECT COUNT(*) AS n FROM bookmarks b WHERE b.user_uuid = ?")
            .into_boxed::<Sqlite>()
            .bind::<Text, _>(user_uuid.to_string())
            .sql(visibility_sql(visibility, "b"));
        if let Some(query) = query {
            statement = with_search(statement, query);
        }
        let result: CountResult = statement
            .get_result(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(to_u32(result.n))
    }
}

impl BookmarkRepository for SqliteBookmarkRepository {
    #[instrument(skip(self, ctx, bookmark), level = "debug", fields(url = %bookmark.url))]
    fn add(&self, ctx: &RequestContext, bookmark: &Bookmark) -> DomainResult<()> {
        let mut conn = self.connection(ctx)?;
        let row = DbBookmark::from_domain(bookmark)?;
        diesel::insert_into(dsl::bookmarks)
            .values(&row)
            .execute(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(())
    }

    #[instrument(skip_all, level = "debug", fields(n = bookmarks.len()))]
    fn add_many(&self, ctx: &RequestContext, bookmarks: &[Bookmark]) -> DomainResult<u64> {
        let mut conn = self.connection(ctx)?;
        let inserted = conn.transaction::<u64, SqliteRepositoryError, _>(|conn| {
            let mut inserted = 0;
            for bookmark in bookmarks {
                ctx.ensure_active()?;
                let row = DbBookmark::from_domain(bookmark)?;
                inserted += diesel::insert_or_ignore_into(dsl::bookmarks)
                    .values(&row)
                    .execute(conn)? as u64;
            }
            Ok(inserted)
        })?;
        debug!("Inserted {} of {} bookmarks", inserted, bookmarks.len());
        Ok(inserted)
    }

    #[instrument(skip_all, level = "debug", fields(n = bookmarks.len()))]
    fn upsert_many(&self, ctx: &RequestContext, bookmarks: &[Bookmark]) -> DomainResult<u64> {
        let mut conn = self.connection(ctx)?;
        let written = conn.transaction::<u64, SqliteRepositoryError, _>(|conn| {
            let mut written = 0;
            for bookmark in bookmarks {
                ctx.ensure_active()?;
                let row = DbBookmark::from_domain(bookmark)?;
                written += diesel::insert_into(dsl::bookmarks)
                    .values(&row)
                    .on_conflict((dsl::user_uuid, dsl::url))
                    .do_update()
                    .set((
                        dsl::title.eq(excluded(dsl::title)),
                        dsl::description.eq(excluded(dsl::description)),
                        dsl::private.eq(excluded(dsl::private)),
                        dsl::tags.eq(excluded(dsl::tags)),
                        dsl::fulltextsearch_string.eq(excluded(dsl::fulltextsearch_string)),
                        dsl::created_at.eq(excluded(dsl::created_at)),
                        dsl::updated_at.eq(excluded(dsl::updated_at)),
                    ))
                    .execute(conn)? as u64;
            }
            Ok(written)
        })?;
        Ok(written)
    }

    #[instrument(skip(self, ctx, bookmark), level = "debug", fields(uid = %bookmark.uid))]
    fn update(&self, ctx: &RequestContext, bookmark: &Bookmark) -> DomainResult<()> {
        let mut conn = self.connection(ctx)?;
        let row = DbBookmark::from_domain(bookmark)?;
        let updated = diesel::update(
            dsl::bookmarks
                .filter(dsl::user_uuid.eq(&row.user_uuid))
                .filter(dsl::uid.eq(&row.uid)),
        )
        .set((
            dsl::url.eq(&row.url),
            dsl::title.eq(&row.title),
            dsl::description.eq(&row.description),
            dsl::private.eq(row.private),
            dsl::tags.eq(&row.tags),
            dsl::fulltextsearch_string.eq(&row.fulltextsearch_string),
            dsl::updated_at.eq(row.updated_at),
        ))
        .execute(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;

        if updated == 0 {
            return Err(DomainError::BookmarkNotFound);
        }
        Ok(())
    }

    #[instrument(skip_all, level = "debug", fields(n = bookmarks.len()))]
    fn tag_update_many(&self, ctx: &RequestContext, bookmarks: &[Bookmark]) -> DomainResult<u64> {
        let mut conn = self.connection(ctx)?;
        let updated = conn.transaction::<u64, SqliteRepositoryError, _>(|conn| {
            let mut updated = 0;
            for bookmark in bookmarks {
                ctx.ensure_active()?;
                let row = DbBookmark::from_domain(bookmark)?;
                updated += diesel::update(
                    dsl::bookmarks
                        .filter(dsl::user_uuid.eq(&row.user_uuid))
                        .filter(dsl::uid.eq(&row.uid)),
                )
                .set((
                    dsl::tags.eq(&row.tags),
                    dsl::fulltextsearch_string.eq(&row.fulltextsearch_string),
                    dsl::updated_at.eq(row.updated_at),
                ))
                .execute(conn)? as u64;
            }
            Ok(updated)
        })?;
        Ok(updated)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn delete(&self, ctx: &RequestContext, user_uuid: &str, uid: &str) -> DomainResult<bool> {
        let mut conn = self.connection(ctx)?;
        let deleted = diesel::delete(
            dsl::bookmarks
                .filter(dsl::user_uuid.eq(user_uuid))
                .filter(dsl::uid.eq(uid)),
        )
        .execute(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(deleted > 0)
    }

    #[instrument(skip(self, ctx), level = "trace")]
    fn get_by_uid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uid: &str,
    ) -> DomainResult<Option<Bookmark>> {
        let mut conn = self.connection(ctx)?;
        let row = dsl::bookmarks
            .filter(dsl::user_uuid.eq(user_uuid))
            .filter(dsl::uid.eq(uid))
            .select(DbBookmark::as_select())
            .first(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(row.map(DbBookmark::into_domain).transpose()?)
    }

    #[instrument(skip(self, ctx), level = "trace")]
    fn get_by_url(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        url: &str,
    ) -> DomainResult<Option<Bookmark>> {
        let mut conn = self.connection(ctx)?;
        let row = dsl::bookmarks
            .filter(dsl::user_uuid.eq(user_uuid))
            .filter(dsl::url.eq(url))
            .select(DbBookmark::as_select())
            .first(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(row.map(DbBookmark::into_domain).transpose()?)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn get_by_tag(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        tag: &str,
    ) -> DomainResult<Vec<Bookmark>> {
        let mut conn = self.connection(ctx)?;
        let rows: Vec<DbBookmark> = sql_query(format!(
            "SELECT {} FROM bookmarks b WHERE b.user_uuid = ? \
             AND EXISTS (SELECT 1 FROM json_each(b.tags) t WHERE t.value = ?) \
             ORDER BY b.created_at DESC, b.uid DESC",
            BOOKMARK_COLUMNS
        ))
        .bind::<Text, _>(user_uuid)
        .bind::<Text, _>(tag)
        .load(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(collect_bookmarks(rows)?)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn get_all(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
    ) -> DomainResult<Vec<Bookmark>> {
        let mut conn = self.connection(ctx)?;
        let mut query = dsl::bookmarks
            .filter(dsl::user_uuid.eq(user_uuid))
            .into_boxed();
        match visibility {
            Visibility::All => {}
            Visibility::Private => query = query.filter(dsl::private.eq(true)),
            Visibility::Public => query = query.filter(dsl::private.eq(false)),
        }
        let rows = query
            .order((dsl::created_at.asc(), dsl::uid.asc()))
            .select(DbBookmark::as_select())
            .load(&mut conn)
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(collect_bookmarks(rows)?)
    }

    fn is_url_registered(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        url: &str,
    ) -> DomainResult<bool> {
        let mut conn = self.connection(ctx)?;
        let exists = diesel::select(diesel::dsl::exists(
            dsl::bookmarks
                .filter(dsl::user_uuid.eq(user_uuid))
                .filter(dsl::url.eq(url)),
        ))
        .get_result::<bool>(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(exists)
    }

    fn is_url_registered_to_another_uid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        url: &str,
        uid: &str,
    ) -> DomainResult<bool> {
        let mut conn = self.connection(ctx)?;
        let exists = diesel::select(diesel::dsl::exists(
            dsl::bookmarks
                .filter(dsl::user_uuid.eq(user_uuid))
                .filter(dsl::url.eq(url))
                .filter(dsl::uid.ne(uid)),
        ))
        .get_result::<bool>(&mut conn)
        .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(exists)
    }

    fn count(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
    ) -> DomainResult<u32> {
        self.counting(ctx, user_uuid, visibility, None)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn get_n(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        n: u32,
        offset: u32,
    ) -> DomainResult<Vec<Bookmark>> {
        self.listing(ctx, user_uuid, visibility, None, n, offset)
    }

    fn search_count(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        query: &WebSearchQuery,
    ) -> DomainResult<u32> {
        if query.is_empty() {
            return Ok(0);
        }
        self.counting(ctx, user_uuid, visibility, Some(query))
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn search_n(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        query: &WebSearchQuery,
        n: u32,
        offset: u32,
    ) -> DomainResult<Vec<Bookmark>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.listing(ctx, user_uuid, visibility, Some(query), n, offset)
    }

    fn get_public_by_uid(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        uid: &str,
    ) -> DomainResult<Option<Bookmark>> {
        let mut conn = self.connection(ctx)?;
        let row = dsl::bookmarks
            .filter(dsl::user_uuid.eq(user_uuid))
            .filter(dsl::uid.eq(uid))
            .filter(dsl::private.eq(false))
            .select(DbBookmark::as_select())
            .first(&mut conn)
            .optional()
            .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(row.map(DbBookmark::into_domain).transpose()?)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn tags_by_count(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
    ) -> DomainResult<Vec<Tag>> {
        let mut conn = self.connection(ctx)?;
        let frequencies: Vec<TagsFrequency> =
            tag_statement("t.value AS tag, COUNT(*) AS n", user_uuid, visibility, None)
                .sql(" GROUP BY t.value ORDER BY n DESC, tag ASC")
                .load(&mut conn)
                .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(frequencies
            .into_iter()
            .map(|f| Tag::new(f.tag, f.n.max(0) as u32))
            .collect())
    }

    fn tag_count(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        filter: Option<&str>,
    ) -> DomainResult<u32> {
        let mut conn = self.connection(ctx)?;
        let result: CountResult =
            tag_statement("COUNT(DISTINCT t.value) AS n", user_uuid, visibility, filter)
                .get_result(&mut conn)
                .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(to_u32(result.n))
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn tags_n(
        &self,
        ctx: &RequestContext,
        user_uuid: &str,
        visibility: Visibility,
        filter: Option<&str>,
        n: u32,
        offset: u32,
    ) -> DomainResult<Vec<Tag>> {
        let mut conn = self.connection(ctx)?;
        let frequencies: Vec<TagsFrequency> =
            tag_statement("t.value AS tag, COUNT(*) AS n", user_uuid, visibility, filter)
                .sql(" GROUP BY t.value ORDER BY n DESC, tag ASC LIMIT ? OFFSET ?")
                .bind::<BigInt, _>(i64::from(n))
                .bind::<BigInt, _>(i64::from(offset))
                .load(&mut conn)
                .map_err(SqliteRepositoryError::DatabaseError)?;
        Ok(frequencies
            .into_iter()
            .map(|f| Tag::new(f.tag, f.n.max(0) as u32))
            .collect())
    }
}
