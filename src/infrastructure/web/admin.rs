// src/infrastructure/web/admin.rs
//! User administration, reachable by admins only.
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::{Extension, Form};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::cookies::Flash;
use super::error::{blocking, Result, WebError};
use super::forms::{check_csrf, checkbox, form_token, render};
use super::response::{form_failure, see_other_with_flash};
use super::session::current_user;
use super::SharedState;
use crate::application::services::csrf_service::CsrfAction;
use crate::domain::context::RequestContext;
use crate::domain::user::User;

const USERS_LOCATION: &str = "/admin/users";

#[derive(Serialize)]
struct UsersView {
    add_csrf_token: String,
    delete_csrf_token: String,
    users: Vec<User>,
}

pub async fn users(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
) -> Response {
    async fn users1(state: SharedState, ctx: &RequestContext) -> Result<UsersView> {
        let add_csrf_token = form_token(&state, ctx, CsrfAction::AdminUserAdd)?.csrf_token;
        let delete_csrf_token = form_token(&state, ctx, CsrfAction::AdminUserDelete)?.csrf_token;
        let service = state.services.user_service.clone();
        let users = blocking(ctx, move |ctx| service.all(ctx)).await?;
        Ok(UsersView {
            add_csrf_token,
            delete_csrf_token,
            users,
        })
    }

    render(&headers, users1(state, &ctx).await)
}

#[derive(Deserialize)]
pub struct UserAddForm {
    csrf_token: String,
    email: String,
    nick_name: String,
    display_name: String,
    password: String,
    is_admin: Option<String>,
}

pub async fn user_add(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<UserAddForm>,
) -> Response {
    async fn add1(state: SharedState, ctx: &RequestContext, form: UserAddForm) -> Result<User> {
        let admin_uuid = current_user(ctx)?.uuid.clone();
        check_csrf(&state, &admin_uuid, &form.csrf_token, CsrfAction::AdminUserAdd)?;
        let user = User::new(form.email, form.nick_name, form.display_name, form.password)
            .with_admin(checkbox(&form.is_admin));
        let service = state.services.user_service.clone();
        blocking(ctx, move |ctx| service.add(ctx, user)).await
    }

    match add1(state, &ctx, form).await {
        Ok(user) => {
            info!(uuid = %user.uuid, nick_name = %user.nick_name, "user added");
            see_other_with_flash(
                USERS_LOCATION,
                Flash::success(format!("User {} added", user.nick_name)),
            )
        }
        Err(e) => form_failure(e, USERS_LOCATION),
    }
}

#[derive(Deserialize)]
pub struct UserDeleteForm {
    csrf_token: String,
}

pub async fn user_delete(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(uuid): Path<String>,
    Form(form): Form<UserDeleteForm>,
) -> Response {
    async fn delete1(state: SharedState, ctx: &RequestContext, uuid: String, token: String) -> Result<()> {
        let admin_uuid = current_user(ctx)?.uuid.clone();
        check_csrf(&state, &admin_uuid, &token, CsrfAction::AdminUserDelete)?;
        if admin_uuid == uuid {
            return Err(WebError::BadRequest("cannot delete your own account".to_string()));
        }
        let service = state.services.user_service.clone();
        blocking(ctx, move |ctx| service.delete_by_uuid(ctx, &uuid)).await
    }

    match delete1(state, &ctx, uuid, form.csrf_token).await {
        Ok(()) => see_other_with_flash(USERS_LOCATION, Flash::success("User deleted")),
        Err(e) => form_failure(e, USERS_LOCATION),
    }
}
