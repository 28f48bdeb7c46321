// src/infrastructure/web/response.rs
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use super::cookies::{self, Flash, FLASH_COOKIE};
use super::error::WebError;
use crate::application::error::ApplicationError;
use crate::application::services::ExportFile;

/// Flash shown when a form carries a missing, stale or forged CSRF token.
pub const FORM_ERROR_MESSAGE: &str = "There was an error processing the form";

/// A JSON view plus the flash message pending for it, if any.
#[derive(Debug, Serialize)]
pub struct View<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
    #[serde(flatten)]
    pub content: T,
}

/// Renders `content`, consuming the flash cookie of the request.
pub fn view<T: Serialize>(headers: &HeaderMap, content: T) -> Response {
    let flash = cookies::take_flash(headers);
    let had_cookie = cookies::get(headers, FLASH_COOKIE).is_some();
    let mut response = Json(View { flash, content }).into_response();
    if had_cookie {
        cookies::append(response.headers_mut(), cookies::clear_cookie(FLASH_COOKIE));
    }
    response
}

pub fn see_other(location: &str) -> Response {
    let mut response = StatusCode::SEE_OTHER.into_response();
    match HeaderValue::from_str(location) {
        Ok(value) => {
            response.headers_mut().insert(LOCATION, value);
        }
        Err(e) => warn!("invalid redirect location {:?}: {}", location, e),
    }
    response
}

pub fn see_other_with_flash(location: &str, flash: Flash) -> Response {
    let mut response = see_other(location);
    if let Some(cookie) = flash.cookie() {
        cookies::append(response.headers_mut(), cookie);
    }
    response
}

/// Maps a failed form submission: user-facing errors flash and redirect back
/// to `location`, everything else renders its status.
pub fn form_failure(err: WebError, location: &str) -> Response {
    let message = match &err {
        WebError::Application(ApplicationError::Validation(msg)) => Some(msg.clone()),
        WebError::Application(ApplicationError::Domain(d)) if d.is_validation() || d.is_conflict() => {
            Some(d.to_string())
        }
        WebError::BadRequest(msg) => Some(msg.clone()),
        _ => None,
    };
    match message {
        Some(message) => see_other_with_flash(location, Flash::error(message)),
        None => err.into_response(),
    }
}

/// Sends an export as a file download.
pub fn attachment(file: ExportFile) -> Response {
    let mut response = file.content.into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(file.content_type));
    match HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file.filename)) {
        Ok(value) => {
            headers.insert(CONTENT_DISPOSITION, value);
        }
        Err(e) => warn!("invalid export filename {:?}: {}", file.filename, e),
    }
    response
}

#[derive(Debug, Serialize)]
pub struct FormToken {
    pub csrf_token: String,
}
