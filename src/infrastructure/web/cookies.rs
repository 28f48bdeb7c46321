// src/infrastructure/web/cookies.rs
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const REMEMBER_ME_COOKIE: &str = "remember_me";
pub const FLASH_COOKIE: &str = "flash";

/// Value of the first cookie named `name` in the request headers.
pub fn get(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// An HttpOnly cookie scoped to the whole site.
pub fn set_cookie(name: &str, value: &str, expires: DateTime<Utc>) -> String {
    format!(
        "{}={}; Path=/; Expires={}; HttpOnly; SameSite=Lax",
        name,
        value,
        http_date(expires)
    )
}

/// A cookie whose expiry lies in the past, so the browser drops it.
pub fn clear_cookie(name: &str) -> String {
    format!(
        "{}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:01 GMT; HttpOnly; SameSite=Lax",
        name
    )
}

pub fn append(headers: &mut HeaderMap, cookie: String) {
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(e) => warn!("dropping invalid Set-Cookie value: {}", e),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

/// One-shot message carried across a 303 redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    fn encode(&self) -> Option<String> {
        serde_json::to_vec(self).ok().map(|b| URL_SAFE.encode(b))
    }

    fn decode(value: &str) -> Option<Self> {
        let bytes = URL_SAFE.decode(value).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// `Set-Cookie` value carrying this message for a few minutes.
    pub fn cookie(&self) -> Option<String> {
        self.encode()
            .map(|v| set_cookie(FLASH_COOKIE, &v, Utc::now() + chrono::Duration::minutes(5)))
    }
}

/// Reads the pending flash message; the caller must clear the cookie on the response.
pub fn take_flash(headers: &HeaderMap) -> Option<Flash> {
    let value = get(headers, FLASH_COOKIE)?;
    let flash = Flash::decode(&value);
    if flash.is_none() {
        warn!("failed to decode flash cookie");
    }
    flash
}
