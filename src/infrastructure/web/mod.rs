// src/infrastructure/web/mod.rs
//! The HTTP surface: session hydration, the access gate and JSON handlers.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use derive_builder::Builder;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::application::services::csrf_service::CsrfAction;
use crate::application::services::CsrfService;
use crate::domain::context::RequestContext;
use crate::domain::error::{DomainError, DomainResult};
use crate::infrastructure::di::ServiceContainer;

pub mod account;
pub mod admin;
pub mod bookmarks;
pub mod cookies;
pub mod error;
pub mod feeds;
pub mod forms;
pub mod response;
pub mod session;
pub mod tools;

use forms::token_view;
use session::{hydrate, require_admin, require_user};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const ROBOTS_TXT: &str = "User-agent: *\nDisallow: /\n";

/// Everything the HTTP layer needs to run.
#[derive(Builder, Clone)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct ServerOptions {
    container: ServiceContainer,
    csrf: Arc<CsrfService>,
    /// Absolute base URL used in generated links, without trailing slash.
    #[builder(setter(into))]
    public_url: String,
    #[builder(default = "DEFAULT_REQUEST_TIMEOUT")]
    request_timeout: Duration,
}

impl ServerOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        match &self.public_url {
            Some(url) if url.trim().is_empty() => Err("public URL must not be empty".to_string()),
            _ => Ok(()),
        }
    }
}

impl ServerOptions {
    pub fn builder() -> ServerOptionsBuilder {
        ServerOptionsBuilder::default()
    }
}

impl std::fmt::Debug for ServerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerOptions")
            .field("public_url", &self.public_url)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl From<ServerOptionsBuilderError> for DomainError {
    fn from(e: ServerOptionsBuilderError) -> Self {
        DomainError::Configuration(e.to_string())
    }
}

/// Shared by every handler.
pub struct AppState {
    pub services: ServiceContainer,
    pub csrf: Arc<CsrfService>,
    pub public_url: String,
    pub request_timeout: Duration,
}

pub type SharedState = Arc<AppState>;

impl From<ServerOptions> for AppState {
    fn from(options: ServerOptions) -> Self {
        AppState {
            services: options.container,
            csrf: options.csrf,
            public_url: options.public_url.trim_end_matches('/').to_string(),
            request_timeout: options.request_timeout,
        }
    }
}

#[derive(Serialize)]
struct HomeView {
    message: &'static str,
    authenticated: bool,
}

async fn home(Extension(ctx): Extension<RequestContext>, headers: HeaderMap) -> Response {
    response::view(
        &headers,
        HomeView {
            message: "Welcome to Sparkmark",
            authenticated: ctx.is_authenticated(),
        },
    )
}

async fn robots() -> Response {
    (
        [(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
        ROBOTS_TXT,
    )
        .into_response()
}

async fn not_found() -> Response {
    error::WebError::NotFound.into_response()
}

fn public_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(home))
        .route("/login", get(session::login_view).post(session::login))
        .route("/logout", post(session::logout))
        .route("/u/{nick_name}/bookmarks", get(bookmarks::public_list))
        .route(
            "/u/{nick_name}/bookmarks/{uid}",
            get(bookmarks::public_permalink),
        )
        .route("/u/{nick_name}/feed/atom", get(bookmarks::atom_feed))
}

fn user_routes() -> Router<SharedState> {
    Router::new()
        .route("/bookmarks", get(bookmarks::list))
        .route(
            "/bookmarks/add",
            token_view(CsrfAction::BookmarkAdd).post(bookmarks::add),
        )
        .route(
            "/bookmarks/{uid}/edit",
            get(bookmarks::edit_view).post(bookmarks::edit),
        )
        .route(
            "/bookmarks/{uid}/delete",
            get(bookmarks::delete_view).post(bookmarks::delete),
        )
        .route("/bookmarks/tags", get(bookmarks::tags))
        .route("/bookmarks/tags/{name}", get(bookmarks::tag_view))
        .route(
            "/bookmarks/tags/{name}/edit",
            get(bookmarks::tag_view).post(bookmarks::tag_edit),
        )
        .route(
            "/bookmarks/tags/{name}/delete",
            get(bookmarks::tag_view).post(bookmarks::tag_delete),
        )
        .route("/feeds", get(feeds::list))
        .route(
            "/feeds/add",
            get(feeds::subscription_add_view).post(feeds::subscription_add),
        )
        .route("/feeds/entries/mark-all-read", post(feeds::mark_all_read))
        .route(
            "/feeds/entries/{uid}/toggle-read",
            post(feeds::entry_toggle_read),
        )
        .route(
            "/feeds/categories/add",
            token_view(CsrfAction::FeedCategoryAdd).post(feeds::category_add),
        )
        // Slug for listings, UUID for management; matched by position.
        .route("/feeds/categories/{id}", get(feeds::list_by_category))
        .route(
            "/feeds/categories/{id}/edit",
            get(feeds::category_edit_view).post(feeds::category_edit),
        )
        .route(
            "/feeds/categories/{id}/delete",
            get(feeds::category_delete_view).post(feeds::category_delete),
        )
        .route(
            "/feeds/categories/{id}/entries/mark-all-read",
            post(feeds::mark_all_read_by_category),
        )
        .route("/feeds/subscriptions", get(feeds::subscriptions))
        .route(
            "/feeds/subscriptions/{uuid}",
            get(feeds::list_by_subscription),
        )
        .route(
            "/feeds/subscriptions/{uuid}/edit",
            get(feeds::subscription_edit_view).post(feeds::subscription_edit),
        )
        .route(
            "/feeds/subscriptions/{uuid}/delete",
            get(feeds::subscription_delete_view).post(feeds::subscription_delete),
        )
        .route(
            "/feeds/subscriptions/{uuid}/entries/mark-all-read",
            post(feeds::mark_all_read_by_subscription),
        )
        .route("/account", get(account::account_view))
        .route("/account/info", post(account::info_update))
        .route("/account/password", post(account::password_update))
        .route(
            "/account/preferences",
            get(account::preferences_view).post(account::preferences_update),
        )
        .route("/tools/bookmarks", get(tools::bookmark_tools))
        .route("/tools/bookmarks/export", post(tools::bookmark_export))
        .route("/tools/bookmarks/import", post(tools::bookmark_import))
        .route("/tools/feeds", get(tools::feed_tools))
        .route("/tools/feeds/export", post(tools::feed_export))
        .route("/tools/feeds/import", post(tools::feed_import))
        .route_layer(from_fn(require_user))
}

fn admin_routes() -> Router<SharedState> {
    Router::new()
        .route("/admin/users", get(admin::users).post(admin::user_add))
        .route("/admin/users/{uuid}/delete", post(admin::user_delete))
        .route_layer(from_fn(require_admin))
}

/// Every route; all but `/robots.txt` run behind session hydration.
pub fn make_router(state: SharedState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(user_routes())
        .merge(admin_routes())
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), hydrate))
        .route("/robots.txt", get(robots))
        .with_state(state)
}

/// Serves until Ctrl-C.
pub async fn serve(options: ServerOptions, listen_addr: &str) -> DomainResult<()> {
    let addr: SocketAddr = listen_addr
        .parse()
        .map_err(|e| DomainError::Configuration(format!("listen address {}: {}", listen_addr, e)))?;
    let state: SharedState = Arc::new(options.into());
    let public_url = state.public_url.clone();
    let router = make_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| DomainError::Configuration(format!("binding {}: {}", addr, e)))?;
    info!(%addr, %public_url, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| DomainError::Other(format!("server error: {}", e)))?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", e);
    }
}
