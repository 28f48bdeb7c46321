// src/infrastructure/web/tools.rs
//! Bookmark and feed import/export.
use std::collections::HashMap;

use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::{Extension, Form};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::cookies::Flash;
use super::error::{blocking, Result, WebError};
use super::forms::{check_csrf, form_token, render};
use super::response::{attachment, form_failure, see_other_with_flash};
use super::session::current_user;
use super::SharedState;
use crate::application::services::bookmark_import_service::BookmarkImportOptions;
use crate::application::services::csrf_service::CsrfAction;
use crate::domain::bookmark::Visibility;
use crate::domain::context::RequestContext;
use crate::domain::exchange::{DocumentFormat, ImportVisibility, OnConflict};

const BOOKMARK_TOOLS_LOCATION: &str = "/tools/bookmarks";
const FEED_TOOLS_LOCATION: &str = "/tools/feeds";

/// Name of the multipart field carrying the uploaded document.
const IMPORT_FILE_FIELD: &str = "importfile";

#[derive(Serialize)]
struct ToolsView {
    export_csrf_token: String,
    import_csrf_token: String,
}

fn tools_view(
    state: &SharedState,
    ctx: &RequestContext,
    export: CsrfAction,
    import: CsrfAction,
) -> Result<ToolsView> {
    Ok(ToolsView {
        export_csrf_token: form_token(state, ctx, export)?.csrf_token,
        import_csrf_token: form_token(state, ctx, import)?.csrf_token,
    })
}

/// `GET /tools/bookmarks`
pub async fn bookmark_tools(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
) -> Response {
    let view = tools_view(
        &state,
        &ctx,
        CsrfAction::ToolsBookmarkExport,
        CsrfAction::ToolsBookmarkImport,
    );
    render(&headers, view)
}

/// `GET /tools/feeds`
pub async fn feed_tools(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
) -> Response {
    let view = tools_view(
        &state,
        &ctx,
        CsrfAction::ToolsFeedExport,
        CsrfAction::ToolsFeedImport,
    );
    render(&headers, view)
}

#[derive(Deserialize)]
pub struct BookmarkExportForm {
    csrf_token: String,
    format: Option<String>,
    visibility: Option<String>,
}

pub async fn bookmark_export(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<BookmarkExportForm>,
) -> Response {
    let result = async {
        let user_uuid = current_user(&ctx)?.uuid.clone();
        check_csrf(&state, &user_uuid, &form.csrf_token, CsrfAction::ToolsBookmarkExport)?;
        let format: DocumentFormat = parse_or_default(form.format.as_deref())?;
        let visibility: Visibility = parse_or_default(form.visibility.as_deref())?;
        let service = state.services.bookmark_export_service.clone();
        blocking(&ctx, move |ctx| service.export(ctx, &user_uuid, format, visibility)).await
    }
    .await;

    match result {
        Ok(file) => attachment(file),
        Err(e) => form_failure(e, BOOKMARK_TOOLS_LOCATION),
    }
}

#[derive(Deserialize)]
pub struct TokenForm {
    csrf_token: String,
}

pub async fn feed_export(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<TokenForm>,
) -> Response {
    let result = async {
        let owner = current_user(&ctx)?.owner();
        check_csrf(&state, &owner.uuid, &form.csrf_token, CsrfAction::ToolsFeedExport)?;
        let service = state.services.feed_export_service.clone();
        blocking(&ctx, move |ctx| service.export(ctx, &owner)).await
    }
    .await;

    match result {
        Ok(file) => attachment(file),
        Err(e) => form_failure(e, FEED_TOOLS_LOCATION),
    }
}

/// Text fields plus the uploaded document of an import form.
#[derive(Debug, Default)]
struct ImportUpload {
    fields: HashMap<String, String>,
    document: Option<String>,
}

impl ImportUpload {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut upload = ImportUpload::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| WebError::BadRequest(format!("invalid upload: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let value = field
                .text()
                .await
                .map_err(|e| WebError::BadRequest(format!("invalid upload: {}", e)))?;
            if name == IMPORT_FILE_FIELD {
                upload.document = Some(value);
            } else {
                upload.fields.insert(name, value);
            }
        }
        Ok(upload)
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn csrf_token(&self) -> &str {
        self.field("csrf_token").unwrap_or_default()
    }

    fn document(&self) -> Result<&str> {
        match self.document.as_deref() {
            Some(doc) if !doc.trim().is_empty() => Ok(doc),
            _ => Err(WebError::BadRequest("no file uploaded".to_string())),
        }
    }
}

/// Blank or missing form values fall back to the type's default.
fn parse_or_default<T>(value: Option<&str>) -> Result<T>
where
    T: std::str::FromStr + Default,
    WebError: From<T::Err>,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Ok(v.parse()?),
        None => Ok(T::default()),
    }
}

pub async fn bookmark_import(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    multipart: Multipart,
) -> Response {
    let result = async {
        let user_uuid = current_user(&ctx)?.uuid.clone();
        let upload = ImportUpload::read(multipart).await?;
        check_csrf(&state, &user_uuid, upload.csrf_token(), CsrfAction::ToolsBookmarkImport)?;

        let options = BookmarkImportOptions {
            format: parse_or_default(upload.field("format"))?,
            visibility: parse_or_default(upload.field("visibility"))?,
            on_conflict: parse_or_default(upload.field("on_conflict"))?,
        };
        let document = upload.document()?.to_string();
        let service = state.services.bookmark_import_service.clone();
        blocking(&ctx, move |ctx| service.import(ctx, &user_uuid, &document, options)).await
    }
    .await;

    match result {
        Ok(status) => {
            info!(summary = %status.summary(), "bookmarks imported");
            see_other_with_flash(BOOKMARK_TOOLS_LOCATION, Flash::success(status.summary()))
        }
        Err(e) => form_failure(e, BOOKMARK_TOOLS_LOCATION),
    }
}

pub async fn feed_import(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    multipart: Multipart,
) -> Response {
    let result = async {
        let user_uuid = current_user(&ctx)?.uuid.clone();
        let upload = ImportUpload::read(multipart).await?;
        check_csrf(&state, &user_uuid, upload.csrf_token(), CsrfAction::ToolsFeedImport)?;
        let document = upload.document()?.to_string();
        let service = state.services.feed_import_service.clone();
        blocking(&ctx, move |ctx| service.import(ctx, &user_uuid, &document)).await
    }
    .await;

    match result {
        Ok(report) => {
            for e in &report.errors {
                warn!("feed import: {}", e);
            }
            let flash = if report.errors.is_empty() {
                Flash::success(report.status.summary())
            } else {
                Flash::error(format!(
                    "{} ({} errors)",
                    report.status.summary(),
                    report.errors.len()
                ))
            };
            see_other_with_flash(FEED_TOOLS_LOCATION, flash)
        }
        Err(e) => form_failure(e, FEED_TOOLS_LOCATION),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_blank_form_values_when_parsed_then_defaults() {
        let format: DocumentFormat = parse_or_default(None).unwrap();
        assert_eq!(format, DocumentFormat::default());

        let visibility: ImportVisibility = parse_or_default(Some("  ")).unwrap();
        assert_eq!(visibility, ImportVisibility::default());

        let on_conflict: OnConflict = parse_or_default(Some("overwrite")).unwrap();
        assert_eq!(on_conflict, OnConflict::Overwrite);

        assert!(parse_or_default::<OnConflict>(Some("merge")).is_err());
    }
}
