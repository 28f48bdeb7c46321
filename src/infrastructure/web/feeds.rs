// src/infrastructure/web/feeds.rs
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::{Extension, Form};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::cookies::Flash;
use super::error::{blocking, Result};
use super::forms::{check_csrf, form_token, render, ListQuery};
use super::response::{form_failure, see_other_with_flash};
use super::session::current_user;
use super::SharedState;
use crate::application::services::csrf_service::CsrfAction;
use crate::application::services::feed_query_service::FeedPage;
use crate::domain::context::RequestContext;
use crate::domain::feed::Category;
use crate::domain::feed_query::{SubscribedFeedsByCategory, SubscriptionView};

fn user_uuid(ctx: &RequestContext) -> Result<String> {
    Ok(current_user(ctx)?.uuid.clone())
}

/// The entry listing a route asks for.
enum Listing {
    All,
    Category(String),
    Subscription(String),
}

async fn entries(
    state: SharedState,
    ctx: &RequestContext,
    scope: Listing,
    query: ListQuery,
) -> Result<FeedPage> {
    let user_uuid = user_uuid(ctx)?;
    let number = query.page_number()?;
    let terms = query.search_terms();
    let service = state.services.feed_query_service.clone();
    blocking(ctx, move |ctx| match (scope, terms) {
        (Listing::All, None) => service.feeds_by_page(ctx, &user_uuid, number),
        (Listing::All, Some(t)) => service.feeds_by_query_and_page(ctx, &user_uuid, &t, number),
        (Listing::Category(slug), None) => {
            service.feeds_by_category_and_page(ctx, &user_uuid, &slug, number)
        }
        (Listing::Category(slug), Some(t)) => {
            service.feeds_by_category_and_query_and_page(ctx, &user_uuid, &slug, &t, number)
        }
        (Listing::Subscription(uuid), None) => {
            service.feeds_by_subscription_and_page(ctx, &user_uuid, &uuid, number)
        }
        (Listing::Subscription(uuid), Some(t)) => {
            service.feeds_by_subscription_and_query_and_page(ctx, &user_uuid, &uuid, &t, number)
        }
    })
    .await
}

/// `GET /feeds`: entries of every subscription.
pub async fn list(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Response {
    render(&headers, entries(state, &ctx, Listing::All, query).await)
}

pub async fn list_by_category(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(slug): Path<String>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Response {
    render(
        &headers,
        entries(state, &ctx, Listing::Category(slug), query).await,
    )
}

pub async fn list_by_subscription(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uuid): Path<String>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Response {
    render(
        &headers,
        entries(state, &ctx, Listing::Subscription(uuid), query).await,
    )
}

#[derive(Serialize)]
struct SubscriptionListView {
    categories: Vec<SubscribedFeedsByCategory>,
}

/// `GET /feeds/subscriptions`: subscriptions grouped by category.
pub async fn subscriptions(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
) -> Response {
    async fn subscriptions1(state: SharedState, ctx: &RequestContext) -> Result<SubscriptionListView> {
        let user_uuid = user_uuid(ctx)?;
        let service = state.services.feed_query_service.clone();
        let categories =
            blocking(ctx, move |ctx| service.subscriptions_by_category(ctx, &user_uuid)).await?;
        Ok(SubscriptionListView { categories })
    }

    render(&headers, subscriptions1(state, &ctx).await)
}

#[derive(Serialize)]
struct SubscriptionFormView {
    csrf_token: String,
    categories: Vec<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subscription: Option<SubscriptionView>,
}

async fn subscription_form_view(
    state: SharedState,
    ctx: &RequestContext,
    uuid: Option<String>,
    action: CsrfAction,
) -> Result<SubscriptionFormView> {
    let user_uuid = user_uuid(ctx)?;
    let csrf_token = form_token(&state, ctx, action)?.csrf_token;
    let feeds = state.services.feed_service.clone();
    let queries = state.services.feed_query_service.clone();
    let (categories, subscription) = blocking(ctx, move |ctx| {
        let categories = feeds.categories(ctx, &user_uuid)?;
        let subscription = match uuid {
            Some(uuid) => Some(queries.subscription_by_uuid(ctx, &user_uuid, &uuid)?),
            None => None,
        };
        Ok((categories, subscription))
    })
    .await?;
    Ok(SubscriptionFormView {
        csrf_token,
        categories,
        subscription,
    })
}

pub async fn subscription_add_view(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
) -> Response {
    render(
        &headers,
        subscription_form_view(state, &ctx, None, CsrfAction::FeedSubscriptionAdd).await,
    )
}

#[derive(Deserialize)]
pub struct SubscriptionAddForm {
    csrf_token: String,
    url: String,
    category_uuid: String,
    alias: Option<String>,
}

pub async fn subscription_add(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<SubscriptionAddForm>,
) -> Response {
    async fn add1(state: SharedState, ctx: &RequestContext, form: SubscriptionAddForm) -> Result<()> {
        let user_uuid = user_uuid(ctx)?;
        check_csrf(&state, &user_uuid, &form.csrf_token, CsrfAction::FeedSubscriptionAdd)?;
        let service = state.services.feed_service.clone();
        let subscription = blocking(ctx, move |ctx| {
            service.subscribe(
                ctx,
                &user_uuid,
                &form.category_uuid,
                &form.url,
                form.alias.as_deref().unwrap_or(""),
            )
        })
        .await?;
        info!(uuid = %subscription.uuid, "feed subscription added");
        Ok(())
    }

    match add1(state, &ctx, form).await {
        Ok(()) => see_other_with_flash("/feeds", Flash::success("Feed subscription added")),
        Err(e) => form_failure(e, "/feeds/add"),
    }
}

pub async fn subscription_edit_view(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uuid): Path<String>,
    headers: HeaderMap,
) -> Response {
    render(
        &headers,
        subscription_form_view(state, &ctx, Some(uuid), CsrfAction::FeedSubscriptionEdit).await,
    )
}

#[derive(Deserialize)]
pub struct SubscriptionEditForm {
    csrf_token: String,
    category_uuid: String,
    alias: Option<String>,
}

pub async fn subscription_edit(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uuid): Path<String>,
    Form(form): Form<SubscriptionEditForm>,
) -> Response {
    async fn edit1(
        state: SharedState,
        ctx: &RequestContext,
        uuid: String,
        form: SubscriptionEditForm,
    ) -> Result<()> {
        let user_uuid = user_uuid(ctx)?;
        check_csrf(&state, &user_uuid, &form.csrf_token, CsrfAction::FeedSubscriptionEdit)?;
        let queries = state.services.feed_query_service.clone();
        let service = state.services.feed_service.clone();
        blocking(ctx, move |ctx| {
            let view = queries.subscription_by_uuid(ctx, &user_uuid, &uuid)?;
            let mut subscription = queries.subscription_by_feed(ctx, &user_uuid, &view.feed_uuid)?;
            subscription.category_uuid = form.category_uuid;
            subscription.alias = form.alias.unwrap_or_default();
            service.update_subscription(ctx, subscription).map(|_| ())
        })
        .await
    }

    let location = format!("/feeds/subscriptions/{}/edit", uuid);
    match edit1(state, &ctx, uuid, form).await {
        Ok(()) => see_other_with_flash(
            "/feeds/subscriptions",
            Flash::success("Feed subscription updated"),
        ),
        Err(e) => form_failure(e, &location),
    }
}

pub async fn subscription_delete_view(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uuid): Path<String>,
    headers: HeaderMap,
) -> Response {
    render(
        &headers,
        subscription_form_view(state, &ctx, Some(uuid), CsrfAction::FeedSubscriptionDelete).await,
    )
}

#[derive(Deserialize)]
pub struct TokenForm {
    csrf_token: String,
}

pub async fn subscription_delete(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uuid): Path<String>,
    Form(form): Form<TokenForm>,
) -> Response {
    async fn delete1(state: SharedState, ctx: &RequestContext, uuid: String, token: String) -> Result<()> {
        let user_uuid = user_uuid(ctx)?;
        check_csrf(&state, &user_uuid, &token, CsrfAction::FeedSubscriptionDelete)?;
        let service = state.services.feed_service.clone();
        blocking(ctx, move |ctx| service.unsubscribe(ctx, &user_uuid, &uuid)).await
    }

    let location = format!("/feeds/subscriptions/{}/delete", uuid);
    match delete1(state, &ctx, uuid, form.csrf_token).await {
        Ok(()) => see_other_with_flash(
            "/feeds/subscriptions",
            Flash::success("Feed subscription deleted"),
        ),
        Err(e) => form_failure(e, &location),
    }
}

#[derive(Deserialize)]
pub struct CategoryForm {
    csrf_token: String,
    name: String,
}

pub async fn category_add(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<CategoryForm>,
) -> Response {
    async fn add1(state: SharedState, ctx: &RequestContext, form: CategoryForm) -> Result<Category> {
        let user_uuid = user_uuid(ctx)?;
        check_csrf(&state, &user_uuid, &form.csrf_token, CsrfAction::FeedCategoryAdd)?;
        let service = state.services.feed_service.clone();
        let category = Category::new(user_uuid, form.name);
        blocking(ctx, move |ctx| service.add_category(ctx, category)).await
    }

    match add1(state, &ctx, form).await {
        Ok(category) => see_other_with_flash(
            "/feeds/subscriptions",
            Flash::success(format!("Category {:?} added", category.name)),
        ),
        Err(e) => form_failure(e, "/feeds/categories/add"),
    }
}

#[derive(Serialize)]
struct CategoryFormView {
    csrf_token: String,
    category: Category,
}

async fn category_form_view(
    state: SharedState,
    ctx: &RequestContext,
    uuid: String,
    action: CsrfAction,
) -> Result<CategoryFormView> {
    let user_uuid = user_uuid(ctx)?;
    let csrf_token = form_token(&state, ctx, action)?.csrf_token;
    let service = state.services.feed_service.clone();
    let category = blocking(ctx, move |ctx| service.category_by_uuid(ctx, &user_uuid, &uuid)).await?;
    Ok(CategoryFormView {
        csrf_token,
        category,
    })
}

pub async fn category_edit_view(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uuid): Path<String>,
    headers: HeaderMap,
) -> Response {
    render(
        &headers,
        category_form_view(state, &ctx, uuid, CsrfAction::FeedCategoryEdit).await,
    )
}

pub async fn category_edit(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uuid): Path<String>,
    Form(form): Form<CategoryForm>,
) -> Response {
    async fn edit1(
        state: SharedState,
        ctx: &RequestContext,
        uuid: String,
        form: CategoryForm,
    ) -> Result<Category> {
        let user_uuid = user_uuid(ctx)?;
        check_csrf(&state, &user_uuid, &form.csrf_token, CsrfAction::FeedCategoryEdit)?;
        let service = state.services.feed_service.clone();
        blocking(ctx, move |ctx| {
            let mut category = service.category_by_uuid(ctx, &user_uuid, &uuid)?;
            category.name = form.name;
            service.update_category(ctx, category)
        })
        .await
    }

    let location = format!("/feeds/categories/{}/edit", uuid);
    match edit1(state, &ctx, uuid, form).await {
        Ok(_) => see_other_with_flash("/feeds/subscriptions", Flash::success("Category updated")),
        Err(e) => form_failure(e, &location),
    }
}

pub async fn category_delete_view(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uuid): Path<String>,
    headers: HeaderMap,
) -> Response {
    render(
        &headers,
        category_form_view(state, &ctx, uuid, CsrfAction::FeedCategoryDelete).await,
    )
}

pub async fn category_delete(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uuid): Path<String>,
    Form(form): Form<TokenForm>,
) -> Response {
    async fn delete1(state: SharedState, ctx: &RequestContext, uuid: String, token: String) -> Result<()> {
        let user_uuid = user_uuid(ctx)?;
        check_csrf(&state, &user_uuid, &token, CsrfAction::FeedCategoryDelete)?;
        let service = state.services.feed_service.clone();
        blocking(ctx, move |ctx| service.delete_category(ctx, &user_uuid, &uuid)).await
    }

    let location = format!("/feeds/categories/{}/delete", uuid);
    match delete1(state, &ctx, uuid, form.csrf_token).await {
        Ok(()) => see_other_with_flash("/feeds/subscriptions", Flash::success("Category deleted")),
        Err(e) => form_failure(e, &location),
    }
}

/// Where to go back to after an entry-metadata update.
#[derive(Deserialize)]
pub struct EntryMetadataForm {
    csrf_token: String,
    redirect_to: Option<String>,
}

impl EntryMetadataForm {
    /// Only local paths are followed.
    fn location(&self) -> String {
        match self.redirect_to.as_deref() {
            Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
            _ => "/feeds".to_string(),
        }
    }
}

async fn update_entry_metadata<F>(
    state: SharedState,
    ctx: &RequestContext,
    token: &str,
    f: F,
) -> Result<u64>
where
    F: FnOnce(&RequestContext, &str) -> crate::application::error::ApplicationResult<u64>
        + Send
        + 'static,
{
    let user_uuid = user_uuid(ctx)?;
    check_csrf(&state, &user_uuid, token, CsrfAction::FeedEntryMetadataEdit)?;
    blocking(ctx, move |ctx| f(ctx, &user_uuid)).await
}

pub async fn entry_toggle_read(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uid): Path<String>,
    Form(form): Form<EntryMetadataForm>,
) -> Response {
    let location = form.location();
    let service = state.services.feed_service.clone();
    let result = update_entry_metadata(state, &ctx, &form.csrf_token, move |ctx, user_uuid| {
        service
            .toggle_entry_read(ctx, user_uuid, &uid)
            .map(u64::from)
    })
    .await;
    match result {
        Ok(_) => super::response::see_other(&location),
        Err(e) => form_failure(e, &location),
    }
}

pub async fn mark_all_read(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<EntryMetadataForm>,
) -> Response {
    let location = form.location();
    let service = state.services.feed_service.clone();
    let result = update_entry_metadata(state, &ctx, &form.csrf_token, move |ctx, user_uuid| {
        service.mark_all_entries_as_read(ctx, user_uuid)
    })
    .await;
    mark_all_read_response(result, &location)
}

pub async fn mark_all_read_by_category(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(slug): Path<String>,
    Form(form): Form<EntryMetadataForm>,
) -> Response {
    let location = form.location();
    let service = state.services.feed_service.clone();
    let result = update_entry_metadata(state, &ctx, &form.csrf_token, move |ctx, user_uuid| {
        let category = service.category_by_slug(ctx, user_uuid, &slug)?;
        service.mark_all_entries_as_read_by_category(ctx, user_uuid, &category.uuid)
    })
    .await;
    mark_all_read_response(result, &location)
}

pub async fn mark_all_read_by_subscription(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uuid): Path<String>,
    Form(form): Form<EntryMetadataForm>,
) -> Response {
    let location = form.location();
    let service = state.services.feed_service.clone();
    let result = update_entry_metadata(state, &ctx, &form.csrf_token, move |ctx, user_uuid| {
        service.mark_all_entries_as_read_by_subscription(ctx, user_uuid, &uuid)
    })
    .await;
    mark_all_read_response(result, &location)
}

fn mark_all_read_response(result: Result<u64>, location: &str) -> Response {
    match result {
        Ok(n) => see_other_with_flash(location, Flash::success(format!("{} entries marked as read", n))),
        Err(e) => form_failure(e, location),
    }
}
