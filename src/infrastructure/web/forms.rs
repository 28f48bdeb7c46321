// src/infrastructure/web/forms.rs
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use axum::Extension;
use serde::Deserialize;
use tracing::warn;

use super::error::{Result, WebError};
use super::response::{view, FormToken, FORM_ERROR_MESSAGE};
use super::session::current_user;
use super::SharedState;
use crate::application::services::csrf_service::CsrfAction;
use crate::domain::context::RequestContext;
use crate::domain::pagination::parse_page_number;

/// `page` and `search` query parameters shared by the paginated listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn page_number(&self) -> Result<u32> {
        Ok(parse_page_number(self.page.as_deref().unwrap_or(""))?)
    }

    /// Trimmed search terms; `None` when blank.
    pub fn search_terms(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// HTML checkboxes send a value only when ticked.
pub fn checkbox(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some("on" | "true" | "1"))
}

/// Whitespace-separated tag field.
pub fn split_tags(value: &Option<String>) -> Vec<String> {
    value
        .as_deref()
        .unwrap_or("")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Fails with the generic form error when the token does not match `(user, action)`.
pub fn check_csrf(
    state: &SharedState,
    user_uuid: &str,
    token: &str,
    action: CsrfAction,
) -> Result<()> {
    if state.csrf.validate(token, user_uuid, action) {
        Ok(())
    } else {
        warn!(%action, "failed to validate CSRF token");
        Err(WebError::BadRequest(FORM_ERROR_MESSAGE.to_string()))
    }
}

pub fn form_token(state: &SharedState, ctx: &RequestContext, action: CsrfAction) -> Result<FormToken> {
    let user = current_user(ctx)?;
    Ok(FormToken {
        csrf_token: state.csrf.generate(&user.uuid, action)?,
    })
}

/// `GET` route returning a fresh CSRF token bound to `action`.
pub fn token_view(action: CsrfAction) -> MethodRouter<SharedState> {
    get(
        move |State(state): State<SharedState>,
              Extension(ctx): Extension<RequestContext>,
              headers: HeaderMap| async move {
            match form_token(&state, &ctx, action) {
                Ok(token) => view(&headers, token),
                Err(e) => e.into_response(),
            }
        },
    )
}

/// Response of a `GET` handler that can only fail before rendering.
pub fn render<T: serde::Serialize>(headers: &HeaderMap, result: Result<T>) -> Response {
    match result {
        Ok(content) => view(headers, content),
        Err(e) => e.into_response(),
    }
}
