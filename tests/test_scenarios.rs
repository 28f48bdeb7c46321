// tests/test_scenarios.rs
//! End-to-end service scenarios against a temporary SQLite database.
use chrono::{Duration, Utc};
use serial_test::serial;

use sparkmark::application::error::ApplicationError;
use sparkmark::application::services::csrf_service::CsrfAction;
use sparkmark::application::services::BookmarkImportOptions;
use sparkmark::domain::bookmark::{Bookmark, TagDeleteQuery, TagUpdateQuery, Visibility};
use sparkmark::domain::context::RequestContext;
use sparkmark::domain::error::DomainError;
use sparkmark::domain::exchange::{DocumentFormat, OnConflict};
use sparkmark::domain::feed::{Category, Entry, EntryVisibility};
use sparkmark::domain::user::User;
use sparkmark::infrastructure::di::ServiceContainer;
use sparkmark::util::testing::{test_settings, TestDatabase};

struct Scenario {
    services: ServiceContainer,
    ctx: RequestContext,
    _db: TestDatabase,
}

impl Scenario {
    fn new() -> Self {
        let db = TestDatabase::new();
        let mut settings = test_settings();
        settings.db_url = db.url.clone();
        Self {
            services: ServiceContainer::from_pool(db.pool.clone(), &settings).unwrap(),
            ctx: RequestContext::anonymous(),
            _db: db,
        }
    }

    fn user(&self, nick_name: &str) -> User {
        self.services
            .user_service
            .add(
                &self.ctx,
                User::new(
                    format!("{}@example.org", nick_name),
                    nick_name,
                    nick_name,
                    "s3cret-pass",
                ),
            )
            .unwrap()
    }

    fn bookmark(&self, user: &User, url: &str, title: &str) -> Bookmark {
        self.services
            .bookmark_service
            .add(&self.ctx, Bookmark::new(&user.uuid, url, title))
            .unwrap()
    }
}

fn domain(err: ApplicationError) -> DomainError {
    match err {
        ApplicationError::Domain(d) => d,
        other => panic!("expected domain error, got {other:?}"),
    }
}

#[test]
#[serial]
fn given_one_bookmark_when_first_page_listed_then_single_untagged_item() {
    let s = Scenario::new();
    let u1 = s.user("u1");
    s.bookmark(&u1, "https://a.test", "A");

    let page = s
        .services
        .bookmark_query_service
        .bookmarks_by_page(&s.ctx, &u1.uuid, Visibility::All, 1)
        .unwrap();

    assert_eq!(page.bookmarks.len(), 1);
    assert_eq!(page.bookmarks[0].title, "A");
    assert!(page.bookmarks[0].tags.is_empty());
    assert_eq!(page.page.item_count, 1);
    assert_eq!(page.page.total_pages, 1);
}

#[test]
#[serial]
fn given_same_url_twice_when_added_then_second_rejected() {
    let s = Scenario::new();
    let u1 = s.user("u1");
    let u2 = s.user("u2");
    s.bookmark(&u1, "https://a.test", "A");

    let err = s
        .services
        .bookmark_service
        .add(&s.ctx, Bookmark::new(&u1.uuid, "https://a.test", "Again"))
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::UrlAlreadyRegistered));

    // other users may store the same URL
    s.bookmark(&u2, "https://a.test", "A");
}

#[test]
#[serial]
fn given_ten_tagged_bookmarks_when_tag_renamed_then_every_bookmark_rewritten() {
    let s = Scenario::new();
    let u = s.user("tagger");
    for i in 0..10 {
        let mut b = Bookmark::new(&u.uuid, format!("https://{i}.test"), format!("B{i}"));
        b.tags = vec!["common/tag1".to_string(), "common/tag2".to_string()];
        b.tags.extend((0..10).map(|j| format!("random-{i}-{j}")));
        s.services.bookmark_service.add(&s.ctx, b).unwrap();
    }

    let n = s
        .services
        .bookmark_service
        .update_tag(
            &s.ctx,
            TagUpdateQuery::new(&u.uuid, "common/tag2", "common/renamed"),
        )
        .unwrap();
    assert_eq!(n, 10);

    let page = s
        .services
        .bookmark_query_service
        .bookmarks_by_page(&s.ctx, &u.uuid, Visibility::All, 1)
        .unwrap();
    for b in &page.bookmarks {
        assert!(!b.tags.contains(&"common/tag2".to_string()));
        assert!(b.tags.contains(&"common/renamed".to_string()));
        assert!(b.tags.windows(2).all(|w| w[0] < w[1]));
    }

    let n = s
        .services
        .bookmark_service
        .delete_tag(&s.ctx, TagDeleteQuery::new(&u.uuid, "common/tag1"))
        .unwrap();
    assert_eq!(n, 10);
    let tags = s
        .services
        .bookmark_query_service
        .tags(&s.ctx, &u.uuid, Visibility::All)
        .unwrap();
    assert!(tags.iter().all(|t| t.name != "common/tag1"));
    assert_eq!(tags.len(), 101);
}

#[test]
#[serial]
fn given_colliding_import_when_keep_then_overwrite_then_counts_follow_policy() {
    let s = Scenario::new();
    let u = s.user("importer");
    s.bookmark(&u, "https://a.test", "A stored");
    s.bookmark(&u, "https://b.test", "B stored");
    let file = r#"<!DOCTYPE NETSCAPE-Bookmark-file-1>
<TITLE>Bookmarks</TITLE>
<DL><p>
    <DT><A HREF="https://a.test" ADD_DATE="1577836800">A from file</A>
    <DT><A HREF="https://b.test" ADD_DATE="1577836800">B from file</A>
    <DT><A HREF="https://c.test" ADD_DATE="1577836800">C from file</A>
</DL><p>
"#;

    let keep = s
        .services
        .bookmark_import_service
        .import(
            &s.ctx,
            &u.uuid,
            file,
            BookmarkImportOptions {
                on_conflict: OnConflict::Keep,
                ..BookmarkImportOptions::default()
            },
        )
        .unwrap();
    assert_eq!((keep.new_or_updated, keep.skipped, keep.invalid), (1, 2, 0));

    let overwrite = s
        .services
        .bookmark_import_service
        .import(
            &s.ctx,
            &u.uuid,
            file,
            BookmarkImportOptions {
                on_conflict: OnConflict::Overwrite,
                ..BookmarkImportOptions::default()
            },
        )
        .unwrap();
    assert_eq!(
        (overwrite.new_or_updated, overwrite.skipped, overwrite.invalid),
        (3, 0, 0)
    );
    let a = s
        .services
        .bookmark_service
        .by_url(&s.ctx, &u.uuid, "https://a.test")
        .unwrap();
    assert_eq!(a.title, "A from file");
}

#[test]
#[serial]
fn given_json_export_when_imported_by_other_user_then_same_bookmarks() {
    let s = Scenario::new();
    let ann = s.user("ann");
    let bob = s.user("bob");
    let mut b = Bookmark::new(&ann.uuid, "https://a.test", "A").with_description("first");
    b.tags = vec!["rust".to_string(), "web".to_string()];
    b.private = true;
    s.services.bookmark_service.add(&s.ctx, b).unwrap();
    s.bookmark(&ann, "https://b.test", "B");

    let export = s
        .services
        .bookmark_export_service
        .export(&s.ctx, &ann.uuid, DocumentFormat::Json, Visibility::All)
        .unwrap();
    assert_eq!(export.content_type, "application/json");

    let status = s
        .services
        .bookmark_import_service
        .import(
            &s.ctx,
            &bob.uuid,
            &export.content,
            BookmarkImportOptions {
                format: DocumentFormat::Json,
                ..BookmarkImportOptions::default()
            },
        )
        .unwrap();
    assert_eq!(status.new_or_updated, 2);

    let key = |b: &Bookmark| {
        (
            b.url.clone(),
            b.title.clone(),
            b.description.clone(),
            b.private,
            b.tags.clone(),
        )
    };
    let mine = s
        .services
        .bookmark_query_service
        .bookmarks_by_page(&s.ctx, &ann.uuid, Visibility::All, 1)
        .unwrap();
    let theirs = s
        .services
        .bookmark_query_service
        .bookmarks_by_page(&s.ctx, &bob.uuid, Visibility::All, 1)
        .unwrap();
    let mut mine: Vec<_> = mine.bookmarks.iter().map(key).collect();
    let mut theirs: Vec<_> = theirs.bookmarks.iter().map(key).collect();
    mine.sort();
    theirs.sort();
    assert_eq!(mine, theirs);
}

#[test]
#[serial]
fn given_hundred_bookmarks_when_paging_by_twenty_then_six_is_out_of_bounds() {
    let s = Scenario::new();
    let u = s.user("pager");
    for i in 0..100 {
        s.bookmark(&u, &format!("https://{i}.test"), &format!("B{i}"));
    }
    let queries = &s.services.bookmark_query_service;

    let first = queries
        .bookmarks_by_page(&s.ctx, &u.uuid, Visibility::All, 1)
        .unwrap();
    let second = queries
        .bookmarks_by_page(&s.ctx, &u.uuid, Visibility::All, 2)
        .unwrap();

    assert_eq!(first.bookmarks.len(), 20);
    assert_eq!(second.bookmarks.len(), 20);
    assert!(first
        .bookmarks
        .iter()
        .chain(second.bookmarks.iter())
        .collect::<Vec<_>>()
        .windows(2)
        .all(|w| w[0].created_at >= w[1].created_at));
    assert_eq!(first.page.total_pages, 5);
    assert!(matches!(
        domain(
            queries
                .bookmarks_by_page(&s.ctx, &u.uuid, Visibility::All, 6)
                .unwrap_err()
        ),
        DomainError::PageNumberOutOfBounds
    ));
}

#[test]
fn given_token_when_validated_then_bound_to_user_and_action() {
    let services = ServiceContainer::in_memory(&test_settings()).unwrap();
    let csrf = &services.csrf_service;

    let token = csrf.generate("u1", CsrfAction::BookmarkAdd).unwrap();

    assert!(csrf.validate(&token, "u1", CsrfAction::BookmarkAdd));
    assert!(!csrf.validate(&token, "u1", CsrfAction::BookmarkEdit));
    assert!(!csrf.validate(&token, "u2", CsrfAction::BookmarkAdd));
}

#[test]
#[serial]
fn given_subscription_with_entries_when_read_state_changes_then_listing_follows() {
    let s = Scenario::new();
    let u = s.user("reader");
    let feeds = &s.services.feed_service;
    let tech = feeds
        .add_category(&s.ctx, Category::new(&u.uuid, "Tech News"))
        .unwrap();
    assert_eq!(tech.slug, "tech-news");

    let sub = feeds
        .subscribe(&s.ctx, &u.uuid, &tech.uuid, "https://blog.test/atom.xml", "Blog")
        .unwrap();
    let now = Utc::now();
    let added = feeds
        .add_entries(
            &s.ctx,
            &sub.feed_uuid,
            vec![
                Entry::new("", "https://blog.test/1", "Rust release", now - Duration::hours(2)),
                Entry::new("", "https://blog.test/2", "Go release", now - Duration::hours(1)),
            ],
        )
        .unwrap();
    assert_eq!(added, 2);

    let queries = &s.services.feed_query_service;
    let page = queries
        .feeds_by_category_and_page(&s.ctx, &u.uuid, "tech-news", 1)
        .unwrap();
    assert_eq!(page.header, "Tech News");
    assert_eq!(page.unread, 2);
    assert_eq!(page.entries[0].entry.title, "Go release");

    let found = queries
        .feeds_by_query_and_page(&s.ctx, &u.uuid, "rust", 1)
        .unwrap();
    assert_eq!(found.entries.len(), 1);

    let uid = page.entries[0].entry.uid.clone();
    assert!(feeds.toggle_entry_read(&s.ctx, &u.uuid, &uid).unwrap());

    let mut prefs = feeds.preferences(&s.ctx, &u.uuid).unwrap();
    prefs.show_entries = EntryVisibility::Unread;
    feeds.update_preferences(&s.ctx, prefs).unwrap();

    let page = queries
        .feeds_by_subscription_and_page(&s.ctx, &u.uuid, &sub.uuid, 1)
        .unwrap();
    assert_eq!(page.header, "Blog");
    assert_eq!(page.unread, 1);
    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].entry.title, "Rust release");

    assert_eq!(feeds.mark_all_entries_as_read(&s.ctx, &u.uuid).unwrap(), 2);
    let page = queries.feeds_by_page(&s.ctx, &u.uuid, 1).unwrap();
    assert_eq!(page.unread, 0);
    assert!(page.entries.is_empty());
}

#[test]
#[serial]
fn given_opml_when_imported_then_exported_back_by_category() {
    let s = Scenario::new();
    let u = s.user("opml");
    let input = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="1.0">
  <head><title>Reader export</title></head>
  <body>
    <outline text="Loose" type="rss" xmlUrl="https://loose.test/feed"/>
    <outline text="Tech">
      <outline text="Blog A" type="rss" xmlUrl="https://a.test/atom.xml"/>
    </outline>
  </body>
</opml>
"#;

    let report = s
        .services
        .feed_import_service
        .import(&s.ctx, &u.uuid, input)
        .unwrap();
    assert!(report.errors.is_empty());
    assert_eq!(report.status.subscriptions.created, 2);
    assert_eq!(report.status.categories.created, 2);

    let file = s
        .services
        .feed_export_service
        .export(&s.ctx, &u.owner())
        .unwrap();
    assert!(file.content.contains("https://loose.test/feed"));
    assert!(file.content.contains("https://a.test/atom.xml"));
    assert!(file.content.contains("opml's feed subscriptions on Sparkmark"));
}

#[test]
#[serial]
fn given_user_with_data_when_deleted_then_login_fails() {
    let s = Scenario::new();
    let u = s.user("leaver");
    s.bookmark(&u, "https://a.test", "A");

    s.services
        .user_service
        .delete_by_uuid(&s.ctx, &u.uuid)
        .unwrap();

    let err = s
        .services
        .user_service
        .authenticate(&s.ctx, &u.email, "s3cret-pass")
        .unwrap_err();
    assert!(matches!(domain(err), DomainError::InvalidCredentials));
    assert!(s
        .services
        .bookmark_query_service
        .owner_by_nick_name(&s.ctx, "leaver")
        .is_err());
}
