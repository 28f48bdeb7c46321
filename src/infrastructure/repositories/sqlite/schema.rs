// src/infrastructure/repositories/sqlite/schema.rs
// Mirrors the tables created by ./migrations; the FTS5 shadow tables are
// queried through `sql_query` only.

diesel::table! {
    users (uuid) {
        uuid -> Text,
        email -> Text,
        nick_name -> Text,
        display_name -> Text,
        password_hash -> Text,
        is_admin -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    sessions (remember_token_hash) {
        remember_token_hash -> Text,
        user_uuid -> Text,
        remember_token_expires_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    bookmarks (uid) {
        uid -> Text,
        user_uuid -> Text,
        url -> Text,
        title -> Text,
        description -> Text,
        private -> Bool,
        tags -> Text,
        fulltextsearch_string -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    feeds (uuid) {
        uuid -> Text,
        feed_url -> Text,
        title -> Text,
        description -> Text,
        slug -> Text,
        etag -> Text,
        last_modified -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        fetched_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    feed_categories (uuid) {
        uuid -> Text,
        user_uuid -> Text,
        name -> Text,
        slug -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    feed_subscriptions (uuid) {
        uuid -> Text,
        category_uuid -> Text,
        feed_uuid -> Text,
        user_uuid -> Text,
        alias -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    feed_entries (uid) {
        uid -> Text,
        feed_uuid -> Text,
        url -> Text,
        title -> Text,
        summary -> Text,
        fulltextsearch_string -> Text,
        published_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    feed_entries_metadata (user_uuid, entry_uid) {
        user_uuid -> Text,
        entry_uid -> Text,
        read -> Bool,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    feed_preferences (user_uuid) {
        user_uuid -> Text,
        show_entries -> Text,
        show_entry_summaries -> Bool,
        updated_at -> Timestamp,
    }
}

diesel::joinable!(bookmarks -> users (user_uuid));
diesel::joinable!(sessions -> users (user_uuid));
diesel::joinable!(feed_categories -> users (user_uuid));
diesel::joinable!(feed_subscriptions -> feed_categories (category_uuid));
diesel::joinable!(feed_subscriptions -> feeds (feed_uuid));
diesel::joinable!(feed_entries -> feeds (feed_uuid));
diesel::joinable!(feed_entries_metadata -> feed_entries (entry_uid));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    sessions,
    bookmarks,
    feeds,
    feed_categories,
    feed_subscriptions,
    feed_entries,
    feed_entries_metadata,
    feed_preferences,
);
