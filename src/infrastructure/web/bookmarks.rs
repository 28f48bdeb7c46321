// src/infrastructure/web/bookmarks.rs
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::cookies::Flash;
use super::error::{blocking, Result, WebError};
use super::forms::{check_csrf, checkbox, form_token, render, split_tags, ListQuery};
use super::response::{form_failure, see_other_with_flash};
use super::session::current_user;
use super::SharedState;
use crate::application::services::bookmark_query_service::{BookmarkPage, TagPage};
use crate::application::services::csrf_service::CsrfAction;
use crate::domain::bookmark::{Bookmark, TagDeleteQuery, TagUpdateQuery, Visibility};
use crate::domain::context::RequestContext;
use crate::domain::tag::{decode_tag_name, encode_tag_name};
use crate::infrastructure::atom::{bookmark_feed, ATOM_CONTENT_TYPE};

#[derive(Deserialize)]
pub struct BookmarkForm {
    csrf_token: String,
    url: String,
    title: String,
    description: Option<String>,
    tags: Option<String>,
    private: Option<String>,
}

impl BookmarkForm {
    fn apply(self, mut bookmark: Bookmark) -> Bookmark {
        bookmark.url = self.url;
        bookmark.title = self.title;
        bookmark.description = self.description.unwrap_or_default();
        bookmark.tags = split_tags(&self.tags);
        bookmark.private = checkbox(&self.private);
        bookmark
    }
}

#[derive(Deserialize)]
pub struct TokenForm {
    csrf_token: String,
}

#[derive(Serialize)]
struct BookmarkFormView {
    csrf_token: String,
    bookmark: Bookmark,
}

/// `GET /bookmarks`: the user's own bookmarks, private ones included.
pub async fn list(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Response {
    async fn list1(state: SharedState, ctx: &RequestContext, query: ListQuery) -> Result<BookmarkPage> {
        let user_uuid = current_user(ctx)?.uuid.clone();
        let number = query.page_number()?;
        let service = state.services.bookmark_query_service.clone();
        match query.search_terms() {
            Some(terms) => {
                blocking(ctx, move |ctx| {
                    service.bookmarks_by_search_query_and_page(
                        ctx,
                        &user_uuid,
                        Visibility::All,
                        &terms,
                        number,
                    )
                })
                .await
            }
            None => {
                blocking(ctx, move |ctx| {
                    service.bookmarks_by_page(ctx, &user_uuid, Visibility::All, number)
                })
                .await
            }
        }
    }

    render(&headers, list1(state, &ctx, query).await)
}

pub async fn add(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<BookmarkForm>,
) -> Response {
    async fn add1(state: SharedState, ctx: &RequestContext, form: BookmarkForm) -> Result<Bookmark> {
        let user_uuid = current_user(ctx)?.uuid.clone();
        check_csrf(&state, &user_uuid, &form.csrf_token, CsrfAction::BookmarkAdd)?;
        let bookmark = form.apply(Bookmark::new(&user_uuid, "", ""));
        let service = state.services.bookmark_service.clone();
        blocking(ctx, move |ctx| service.add(ctx, bookmark)).await
    }

    match add1(state, &ctx, form).await {
        Ok(bookmark) => {
            info!(uid = %bookmark.uid, "bookmark added");
            see_other_with_flash("/bookmarks", Flash::success("Bookmark added"))
        }
        Err(e) => form_failure(e, "/bookmarks/add"),
    }
}

async fn owned_bookmark(state: &SharedState, ctx: &RequestContext, uid: String) -> Result<Bookmark> {
    let user_uuid = current_user(ctx)?.uuid.clone();
    let service = state.services.bookmark_service.clone();
    blocking(ctx, move |ctx| service.by_uid(ctx, &user_uuid, &uid)).await
}

async fn bookmark_form_view(
    state: SharedState,
    ctx: &RequestContext,
    uid: String,
    action: CsrfAction,
) -> Result<BookmarkFormView> {
    let bookmark = owned_bookmark(&state, ctx, uid).await?;
    Ok(BookmarkFormView {
        csrf_token: form_token(&state, ctx, action)?.csrf_token,
        bookmark,
    })
}

pub async fn edit_view(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Response {
    render(
        &headers,
        bookmark_form_view(state, &ctx, uid, CsrfAction::BookmarkEdit).await,
    )
}

pub async fn edit(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uid): Path<String>,
    Form(form): Form<BookmarkForm>,
) -> Response {
    async fn edit1(
        state: SharedState,
        ctx: &RequestContext,
        uid: String,
        form: BookmarkForm,
    ) -> Result<Bookmark> {
        let user_uuid = current_user(ctx)?.uuid.clone();
        check_csrf(&state, &user_uuid, &form.csrf_token, CsrfAction::BookmarkEdit)?;
        let bookmark = form.apply(owned_bookmark(&state, ctx, uid).await?);
        let service = state.services.bookmark_service.clone();
        blocking(ctx, move |ctx| service.update(ctx, bookmark)).await
    }

    let location = format!("/bookmarks/{}/edit", uid);
    match edit1(state, &ctx, uid, form).await {
        Ok(_) => see_other_with_flash("/bookmarks", Flash::success("Bookmark updated")),
        Err(e) => form_failure(e, &location),
    }
}

pub async fn delete_view(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Response {
    render(
        &headers,
        bookmark_form_view(state, &ctx, uid, CsrfAction::BookmarkDelete).await,
    )
}

pub async fn delete(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uid): Path<String>,
    Form(form): Form<TokenForm>,
) -> Response {
    async fn delete1(state: SharedState, ctx: &RequestContext, uid: String, token: String) -> Result<()> {
        let user_uuid = current_user(ctx)?.uuid.clone();
        check_csrf(&state, &user_uuid, &token, CsrfAction::BookmarkDelete)?;
        let service = state.services.bookmark_service.clone();
        blocking(ctx, move |ctx| service.delete(ctx, &user_uuid, &uid)).await
    }

    let location = format!("/bookmarks/{}/delete", uid);
    match delete1(state, &ctx, uid, form.csrf_token).await {
        Ok(()) => see_other_with_flash("/bookmarks", Flash::success("Bookmark deleted")),
        Err(e) => form_failure(e, &location),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TagQuery {
    page: Option<String>,
    filter: Option<String>,
}

/// `GET /bookmarks/tags`: tag index, optionally filtered by substring.
pub async fn tags(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<TagQuery>,
    headers: HeaderMap,
) -> Response {
    async fn tags1(state: SharedState, ctx: &RequestContext, query: TagQuery) -> Result<TagPage> {
        let user_uuid = current_user(ctx)?.uuid.clone();
        let list = ListQuery {
            page: query.page,
            search: query.filter,
        };
        let number = list.page_number()?;
        let service = state.services.bookmark_query_service.clone();
        match list.search_terms() {
            Some(filter) => {
                blocking(ctx, move |ctx| {
                    service.tags_by_filter_query_and_page(
                        ctx,
                        &user_uuid,
                        Visibility::All,
                        &filter,
                        number,
                    )
                })
                .await
            }
            None => {
                blocking(ctx, move |ctx| {
                    service.tags_by_page(ctx, &user_uuid, Visibility::All, number)
                })
                .await
            }
        }
    }

    render(&headers, tags1(state, &ctx, query).await)
}

#[derive(Serialize)]
struct TagView {
    name: String,
    encoded_name: String,
}

fn tag_name(encoded: &str) -> Result<String> {
    decode_tag_name(encoded).map_err(|_| WebError::NotFound)
}

pub async fn tag_view(Path(encoded): Path<String>, headers: HeaderMap) -> Response {
    render(
        &headers,
        tag_name(&encoded).map(|name| TagView {
            encoded_name: encode_tag_name(&name),
            name,
        }),
    )
}

#[derive(Deserialize)]
pub struct TagEditForm {
    new_name: String,
}

pub async fn tag_edit(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(encoded): Path<String>,
    Form(form): Form<TagEditForm>,
) -> Response {
    async fn tag_edit1(
        state: SharedState,
        ctx: &RequestContext,
        encoded: &str,
        new_name: String,
    ) -> Result<u64> {
        let user_uuid = current_user(ctx)?.uuid.clone();
        let query = TagUpdateQuery::new(user_uuid, tag_name(encoded)?, new_name);
        let service = state.services.bookmark_service.clone();
        blocking(ctx, move |ctx| service.update_tag(ctx, query)).await
    }

    match tag_edit1(state, &ctx, &encoded, form.new_name).await {
        Ok(n) => see_other_with_flash(
            "/bookmarks/tags",
            Flash::success(format!("Tag updated for {} bookmarks", n)),
        ),
        Err(e) => form_failure(e, &format!("/bookmarks/tags/{}/edit", encoded)),
    }
}

pub async fn tag_delete(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(encoded): Path<String>,
) -> Response {
    async fn tag_delete1(state: SharedState, ctx: &RequestContext, encoded: &str) -> Result<u64> {
        let user_uuid = current_user(ctx)?.uuid.clone();
        let query = TagDeleteQuery::new(user_uuid, tag_name(encoded)?);
        let service = state.services.bookmark_service.clone();
        blocking(ctx, move |ctx| service.delete_tag(ctx, query)).await
    }

    match tag_delete1(state, &ctx, &encoded).await {
        Ok(n) => see_other_with_flash(
            "/bookmarks/tags",
            Flash::success(format!("Tag deleted from {} bookmarks", n)),
        ),
        Err(e) => form_failure(e, &format!("/bookmarks/tags/{}/delete", encoded)),
    }
}

/// `GET /u/{nick_name}/bookmarks`: public bookmarks, searchable.
pub async fn public_list(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(nick_name): Path<String>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Response {
    async fn public_list1(
        state: SharedState,
        ctx: &RequestContext,
        nick_name: String,
        query: ListQuery,
    ) -> Result<BookmarkPage> {
        let number = query.page_number()?;
        let terms = query.search_terms();
        let service = state.services.bookmark_query_service.clone();
        blocking(ctx, move |ctx| {
            let owner = service.owner_by_nick_name(ctx, &nick_name)?;
            match terms {
                Some(terms) => service.bookmarks_by_search_query_and_page(
                    ctx,
                    &owner.uuid,
                    Visibility::Public,
                    &terms,
                    number,
                ),
                None => service.public_bookmarks_by_page(ctx, &owner.uuid, number),
            }
        })
        .await
    }

    render(&headers, public_list1(state, &ctx, nick_name, query).await)
}

/// `GET /u/{nick_name}/bookmarks/{uid}`: permalink of one public bookmark.
pub async fn public_permalink(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path((nick_name, uid)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    async fn permalink1(
        state: SharedState,
        ctx: &RequestContext,
        nick_name: String,
        uid: String,
    ) -> Result<BookmarkPage> {
        let service = state.services.bookmark_query_service.clone();
        let page = blocking(ctx, move |ctx| {
            let owner = service.owner_by_nick_name(ctx, &nick_name)?;
            service.public_bookmark_by_uid(ctx, &owner.uuid, &uid)
        })
        .await?;
        if page.bookmarks.is_empty() {
            return Err(WebError::NotFound);
        }
        Ok(page)
    }

    render(&headers, permalink1(state, &ctx, nick_name, uid).await)
}

/// `GET /u/{nick_name}/feed/atom`: first page of public bookmarks as Atom.
pub async fn atom_feed(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(nick_name): Path<String>,
) -> Result<Response> {
    let service = state.services.bookmark_query_service.clone();
    let page = blocking(&ctx, move |ctx| {
        let owner = service.owner_by_nick_name(ctx, &nick_name)?;
        service.public_bookmarks_by_page(ctx, &owner.uuid, 1)
    })
    .await?;

    let xml = bookmark_feed(&state.public_url, &page.owner, &page.bookmarks)
        .map_err(|e| WebError::from(e.context("rendering Atom feed")))?;
    let mut response = xml.into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(ATOM_CONTENT_TYPE));
    Ok(response)
}
