// tests/test_http.rs
use std::sync::Arc;

use atom_syndication::Feed;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use sparkmark::domain::bookmark::Bookmark;
use sparkmark::domain::context::RequestContext;
use sparkmark::domain::user::User;
use sparkmark::infrastructure::di::ServiceContainer;
use sparkmark::infrastructure::web::{make_router, AppState, ServerOptions};
use sparkmark::util::testing::{init_test_env, test_settings};

const PASSWORD: &str = "correct horse battery";

struct TestApp {
    router: Router,
    services: ServiceContainer,
}

impl TestApp {
    fn new() -> Self {
        init_test_env();
        let services = ServiceContainer::in_memory(&test_settings()).unwrap();
        let options = ServerOptions::builder()
            .csrf(services.csrf_service.clone())
            .public_url("https://marks.example.org")
            .container(services.clone())
            .build()
            .unwrap();
        let router = make_router(Arc::new(AppState::from(options)));
        Self { router, services }
    }

    fn add_user(&self, nick_name: &str, is_admin: bool) -> User {
        let user = User::new(
            format!("{}@example.org", nick_name),
            nick_name,
            nick_name.to_uppercase(),
            PASSWORD,
        )
        .with_admin(is_admin);
        self.services
            .user_service
            .add(&RequestContext::anonymous(), user)
            .unwrap()
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, cookie: Option<&str>, fields: &[(&str, &str)]) -> Response {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// Logs in and returns the `remember_me=...` pair to send back.
    async fn login(&self, user: &User) -> String {
        let response = self
            .post_form("/login", None, &[("email", &user.email), ("password", PASSWORD)])
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/bookmarks");
        set_cookie(&response, "remember_me").expect("remember_me cookie")
    }
}

/// `name=value` of the first Set-Cookie header for `name`.
fn set_cookie(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{}=", name)))
        .map(str::to_string)
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

#[tokio::test]
async fn given_anonymous_request_when_protected_route_then_not_found() {
    let app = TestApp::new();

    for uri in ["/bookmarks", "/feeds", "/account", "/admin/users", "/tools/bookmarks"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn given_unknown_remember_token_when_requested_then_anonymous() {
    let app = TestApp::new();

    let response = app.get("/bookmarks", Some("remember_me=forged")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let home = body_json(app.get("/", Some("remember_me=forged")).await).await;
    assert_eq!(home["authenticated"], false);
}

#[tokio::test]
async fn given_regular_user_when_admin_route_then_unauthorized_and_admin_gets_ok() {
    let app = TestApp::new();
    let ann = app.add_user("ann", false);
    let root = app.add_user("root", true);

    let ann_cookie = app.login(&ann).await;
    let response = app.get("/admin/users", Some(&ann_cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let root_cookie = app.login(&root).await;
    let response = app.get("/admin/users", Some(&root_cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let users = body_json(response).await;
    assert_eq!(users["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn given_wrong_password_when_login_then_flash_and_back_to_login() {
    let app = TestApp::new();
    let ann = app.add_user("ann", false);

    let response = app
        .post_form("/login", None, &[("email", &ann.email), ("password", "nope")])
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/login");
    assert!(set_cookie(&response, "remember_me").is_none());
    let flash = set_cookie(&response, "flash").unwrap();

    let view = body_json(app.get("/login", Some(&flash)).await).await;
    assert_eq!(view["flash"]["level"], "error");
    assert_eq!(view["flash"]["message"], "invalid email or password");
}

#[tokio::test]
async fn given_csrf_token_when_adding_bookmark_then_listed() {
    let app = TestApp::new();
    let ann = app.add_user("ann", false);
    let cookie = app.login(&ann).await;

    let token = body_json(app.get("/bookmarks/add", Some(&cookie)).await).await["csrf_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .post_form(
            "/bookmarks/add",
            Some(&cookie),
            &[
                ("csrf_token", &token),
                ("url", "https://a.test"),
                ("title", "A"),
                ("tags", "rust web"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/bookmarks");

    let page = body_json(app.get("/bookmarks", Some(&cookie)).await).await;
    assert_eq!(page["page"]["item_count"], 1);
    assert_eq!(page["bookmarks"][0]["title"], "A");
    assert_eq!(page["bookmarks"][0]["tags"], serde_json::json!(["rust", "web"]));
}

#[tokio::test]
async fn given_token_for_other_action_when_adding_bookmark_then_rejected() {
    let app = TestApp::new();
    let ann = app.add_user("ann", false);
    let cookie = app.login(&ann).await;

    let token = body_json(app.get("/feeds/categories/add", Some(&cookie)).await).await["csrf_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .post_form(
            "/bookmarks/add",
            Some(&cookie),
            &[("csrf_token", &token), ("url", "https://a.test"), ("title", "A")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/bookmarks/add");

    let page = body_json(app.get("/bookmarks", Some(&cookie)).await).await;
    assert_eq!(page["page"]["item_count"], 0);
}

#[tokio::test]
async fn given_logged_in_user_when_logout_then_cookie_no_longer_authenticates() {
    let app = TestApp::new();
    let ann = app.add_user("ann", false);
    let cookie = app.login(&ann).await;

    let response = app.post_form("/logout", Some(&cookie), &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/");
    assert_eq!(set_cookie(&response, "remember_me").as_deref(), Some("remember_me="));

    let response = app.get("/bookmarks", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn given_public_markdown_bookmark_when_atom_requested_then_html_content() {
    let app = TestApp::new();
    let ann = app.add_user("ann", false);
    let ctx = RequestContext::anonymous();
    app.services
        .bookmark_service
        .add(
            &ctx,
            Bookmark::new(&ann.uuid, "https://b.test", "B")
                .with_description("Tags:\n- feed/atom\n- test\n"),
        )
        .unwrap();
    let mut private = Bookmark::new(&ann.uuid, "https://secret.test", "Secret");
    private.private = true;
    app.services.bookmark_service.add(&ctx, private).unwrap();

    let response = app.get("/u/ann/feed/atom", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/atom+xml");

    let xml = body_string(response).await;
    let feed = Feed::read_from(xml.as_bytes()).unwrap();
    assert_eq!(feed.entries().len(), 1);
    assert_eq!(
        feed.entries()[0].content().and_then(|c| c.value()),
        Some("<p>Tags:</p>\n<ul>\n<li>feed/atom</li>\n<li>test</li>\n</ul>\n")
    );
}

#[tokio::test]
async fn given_unknown_nickname_when_public_routes_then_not_found() {
    let app = TestApp::new();

    assert_eq!(app.get("/u/nobody/bookmarks", None).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/u/nobody/feed/atom", None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn given_private_bookmark_when_permalink_requested_then_not_found() {
    let app = TestApp::new();
    let ann = app.add_user("ann", false);
    let mut private = Bookmark::new(&ann.uuid, "https://secret.test", "Secret");
    private.private = true;
    let stored = app
        .services
        .bookmark_service
        .add(&RequestContext::anonymous(), private)
        .unwrap();

    let response = app
        .get(&format!("/u/ann/bookmarks/{}", stored.uid), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn given_malformed_uid_when_permalink_requested_then_not_found() {
    let app = TestApp::new();
    app.add_user("ann", false);

    let response = app.get("/u/ann/bookmarks/not-a-uid", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn given_tag_when_edit_confirmed_then_renamed_everywhere() {
    let app = TestApp::new();
    let ann = app.add_user("ann", false);
    let mut b = Bookmark::new(&ann.uuid, "https://a.test", "A");
    b.tags = vec!["rust".to_string()];
    app.services
        .bookmark_service
        .add(&RequestContext::anonymous(), b)
        .unwrap();
    let cookie = app.login(&ann).await;

    // "rust" in URL-safe base64
    let response = app.get("/bookmarks/tags/cnVzdA==/edit", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let view = body_json(response).await;
    assert_eq!(view["name"], "rust");

    let response = app.get("/bookmarks/tags/cnVzdA==/delete", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_form(
            "/bookmarks/tags/cnVzdA==/edit",
            Some(&cookie),
            &[("new_name", "rustlang")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/bookmarks/tags");

    let page = body_json(app.get("/bookmarks", Some(&cookie)).await).await;
    assert_eq!(page["bookmarks"][0]["tags"], serde_json::json!(["rustlang"]));
}

#[tokio::test]
async fn given_robots_txt_when_requested_then_disallow_all() {
    let app = TestApp::new();

    let response = app.get("/robots.txt", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "User-agent: *\nDisallow: /\n");
}

#[tokio::test]
async fn given_export_form_when_posted_then_netscape_attachment() {
    let app = TestApp::new();
    let ann = app.add_user("ann", false);
    app.services
        .bookmark_service
        .add(
            &RequestContext::anonymous(),
            Bookmark::new(&ann.uuid, "https://a.test", "A"),
        )
        .unwrap();
    let cookie = app.login(&ann).await;

    let tools = body_json(app.get("/tools/bookmarks", Some(&cookie)).await).await;
    let token = tools["export_csrf_token"].as_str().unwrap().to_string();

    let response = app
        .post_form(
            "/tools/bookmarks/export",
            Some(&cookie),
            &[("csrf_token", &token), ("format", "netscape"), ("visibility", "all")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename="));
    let html = body_string(response).await;
    assert!(html.starts_with("<!DOCTYPE NETSCAPE-Bookmark-file-1>"));
    assert!(html.contains("https://a.test"));
}
