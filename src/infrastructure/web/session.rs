// src/infrastructure/web/session.rs
//! Remember-me sessions and the access gate.
//!
//! Every hydrated request carries a [`RequestContext`] extension; a missing,
//! unknown or expired `remember_me` cookie yields an anonymous context, never
//! an error.
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::cookies::{self, Flash, REMEMBER_ME_COOKIE};
use super::error::{blocking, Result, WebError};
use super::response::{see_other, see_other_with_flash, view};
use super::SharedState;
use crate::application::error::ApplicationError;
use crate::domain::context::{Cancellation, RequestContext};
use crate::domain::error::DomainError;
use crate::domain::session::default_expiry;
use crate::domain::user::User;

/// Who may reach a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    AuthenticatedUser,
    AdminUser,
}

/// Anonymous requests get 404 so that protected resources stay hidden.
pub fn check_access(ctx: Option<&RequestContext>, access: Access) -> Result<()> {
    let Some(user) = ctx.and_then(|c| c.user()) else {
        return Err(WebError::NotFound);
    };
    match access {
        Access::AuthenticatedUser => Ok(()),
        Access::AdminUser if user.is_admin => Ok(()),
        Access::AdminUser => Err(WebError::Unauthorized),
    }
}

/// The authenticated user of a request behind the access gate.
pub fn current_user(ctx: &RequestContext) -> Result<&User> {
    ctx.user().ok_or(WebError::NotFound)
}

pub async fn require_user(request: Request, next: Next) -> Response {
    match check_access(request.extensions().get(), Access::AuthenticatedUser) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

pub async fn require_admin(request: Request, next: Next) -> Response {
    match check_access(request.extensions().get(), Access::AdminUser) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Attaches the request context, resolving the user from the `remember_me` cookie.
pub async fn hydrate(State(state): State<SharedState>, mut request: Request, next: Next) -> Response {
    let ctx = RequestContext::anonymous()
        .with_cancellation(Cancellation::new())
        .with_timeout(state.request_timeout);

    let user = match cookies::get(request.headers(), REMEMBER_ME_COOKIE) {
        Some(token) if !token.is_empty() => remembered_user(&state, &ctx, token).await,
        _ => None,
    };

    request.extensions_mut().insert(ctx.with_user(user));
    next.run(request).await
}

async fn remembered_user(state: &SharedState, ctx: &RequestContext, token: String) -> Option<User> {
    let sessions = state.services.session_service.clone();
    let users = state.services.user_service.clone();
    let result = blocking(ctx, move |ctx| {
        let session = sessions.by_remember_token(ctx, &token)?;
        if session.is_expired_at(Utc::now()) {
            return Ok(None);
        }
        Ok(Some(users.by_uuid(ctx, &session.user_uuid)?))
    })
    .await;

    match result {
        Ok(user) => user,
        Err(e) => {
            debug!("treating request as anonymous: {}", e);
            None
        }
    }
}

#[derive(Debug, Serialize)]
struct LoginView {
    authenticated: bool,
}

pub async fn login_view(Extension(ctx): Extension<RequestContext>, headers: HeaderMap) -> Response {
    view(
        &headers,
        LoginView {
            authenticated: ctx.is_authenticated(),
        },
    )
}

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
}

pub async fn login(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<LoginForm>,
) -> Response {
    let users = state.services.user_service.clone();
    let sessions = state.services.session_service.clone();
    let expires_at = default_expiry(Utc::now(), state.services.session_ttl_days);

    let result = blocking(&ctx, move |ctx| {
        let user = users.authenticate(ctx, &form.email, &form.password)?;
        sessions.purge_expired(ctx, &user.uuid)?;
        sessions.start(ctx, &user.uuid, Some(expires_at))
    })
    .await;

    match result {
        Ok(session) => {
            info!(user_uuid = %session.user_uuid, "user logged in");
            let mut response = see_other("/bookmarks");
            cookies::append(
                response.headers_mut(),
                cookies::set_cookie(REMEMBER_ME_COOKIE, &session.remember_token, expires_at),
            );
            response
        }
        Err(WebError::Application(ApplicationError::Domain(DomainError::InvalidCredentials))) => {
            warn!("failed to authenticate user");
            see_other_with_flash("/login", Flash::error("invalid email or password"))
        }
        Err(e) => {
            error!("failed to log user in: {}", e);
            see_other_with_flash("/login", Flash::error("failed to save session cookie"))
        }
    }
}

/// Clears the cookie and rotates the session, dropping the user's stale ones first.
/// Anonymous logout only redirects.
pub async fn logout(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
) -> Response {
    let mut response = see_other("/");
    cookies::append(response.headers_mut(), cookies::clear_cookie(REMEMBER_ME_COOKIE));

    let (Some(user), Some(token)) = (ctx.user().cloned(), cookies::get(&headers, REMEMBER_ME_COOKIE))
    else {
        return response;
    };

    let sessions = state.services.session_service.clone();
    let result = blocking(&ctx, move |ctx| {
        match sessions.delete_by_remember_token(ctx, &token) {
            Ok(()) | Err(ApplicationError::Domain(DomainError::SessionNotFound)) => {}
            Err(e) => return Err(e),
        }
        sessions.purge_expired(ctx, &user.uuid)?;
        sessions.start(ctx, &user.uuid, None).map(|_| ())
    })
    .await;

    if let Err(e) = result {
        error!("failed to rotate user session: {}", e);
    }
    response
}
