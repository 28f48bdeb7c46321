// src/infrastructure/web/error.rs
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::domain::context::RequestContext;
use crate::domain::error::DomainError;

/// JSON body of every error response.
#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponseBody {
    pub error: String,
}

impl IntoResponse for ErrorResponseBody {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Not Found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for WebError {
    fn from(err: DomainError) -> Self {
        WebError::Application(ApplicationError::Domain(err))
    }
}

impl WebError {
    /// Status code and client-facing message; store failures never leak their detail.
    pub fn as_status_and_msg(&self) -> (StatusCode, String) {
        match self {
            WebError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            WebError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            WebError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            WebError::Application(ApplicationError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            WebError::Application(ApplicationError::Domain(err)) => domain_status(err),
            WebError::Application(ApplicationError::Other(_)) | WebError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            ),
        }
    }
}

fn domain_status(err: &DomainError) -> (StatusCode, String) {
    if err.is_not_found() {
        return (StatusCode::NOT_FOUND, "Not Found".to_string());
    }
    if err.is_validation() || err.is_conflict() {
        return (StatusCode::BAD_REQUEST, err.to_string());
    }
    match err {
        DomainError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        DomainError::Cancelled => (
            StatusCode::SERVICE_UNAVAILABLE,
            "request cancelled".to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        ),
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (code, msg) = self.as_status_and_msg();
        if code.is_server_error() {
            error!(error = %self, "request failed");
        }
        (code, ErrorResponseBody { error: msg }).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;

/// Runs a synchronous service call on the blocking pool.
///
/// The request's cancellation signal fires if the handler future is dropped
/// before the call returns, e.g. when the client disconnects.
pub async fn blocking<T, F>(ctx: &RequestContext, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&RequestContext) -> ApplicationResult<T> + Send + 'static,
{
    let task_ctx = ctx.clone();
    let guard = ctx.cancellation().guard();
    let joined = tokio::task::spawn_blocking(move || f(&task_ctx)).await;
    guard.disarm();
    joined
        .map_err(|e| WebError::Internal(format!("blocking task failed: {}", e)))?
        .map_err(WebError::from)
}
