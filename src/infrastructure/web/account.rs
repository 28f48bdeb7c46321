// src/infrastructure/web/account.rs
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::{Extension, Form};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::cookies::Flash;
use super::error::{blocking, Result};
use super::forms::{check_csrf, checkbox, form_token, render};
use super::response::{form_failure, see_other_with_flash};
use super::session::current_user;
use super::SharedState;
use crate::application::services::csrf_service::CsrfAction;
use crate::domain::context::RequestContext;
use crate::domain::feed::EntryVisibility;
use crate::domain::user::{InfoUpdate, PasswordUpdate, User};

const ACCOUNT_LOCATION: &str = "/account";

#[derive(Serialize)]
struct AccountView {
    csrf_token: String,
    user: User,
}

/// `GET /account`: the current user and a token for both account forms.
pub async fn account_view(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
) -> Response {
    fn view1(state: &SharedState, ctx: &RequestContext) -> Result<AccountView> {
        let csrf_token = form_token(state, ctx, CsrfAction::AccountUpdate)?.csrf_token;
        Ok(AccountView {
            csrf_token,
            user: current_user(ctx)?.clone(),
        })
    }

    render(&headers, view1(&state, &ctx))
}

#[derive(Deserialize)]
pub struct InfoForm {
    csrf_token: String,
    email: String,
    nick_name: String,
    display_name: String,
}

pub async fn info_update(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<InfoForm>,
) -> Response {
    async fn update1(state: SharedState, ctx: &RequestContext, form: InfoForm) -> Result<()> {
        let user_uuid = current_user(ctx)?.uuid.clone();
        check_csrf(&state, &user_uuid, &form.csrf_token, CsrfAction::AccountUpdate)?;
        let service = state.services.user_service.clone();
        let update = InfoUpdate {
            uuid: user_uuid,
            email: form.email,
            nick_name: form.nick_name,
            display_name: form.display_name,
        };
        blocking(ctx, move |ctx| service.update_info(ctx, update)).await
    }

    match update1(state, &ctx, form).await {
        Ok(()) => see_other_with_flash(ACCOUNT_LOCATION, Flash::success("Account information updated")),
        Err(e) => form_failure(e, ACCOUNT_LOCATION),
    }
}

#[derive(Deserialize)]
pub struct PasswordForm {
    csrf_token: String,
    current_password: String,
    new_password: String,
    new_password_confirmation: String,
}

pub async fn password_update(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<PasswordForm>,
) -> Response {
    async fn update1(state: SharedState, ctx: &RequestContext, form: PasswordForm) -> Result<()> {
        let user_uuid = current_user(ctx)?.uuid.clone();
        check_csrf(&state, &user_uuid, &form.csrf_token, CsrfAction::AccountUpdate)?;
        let service = state.services.user_service.clone();
        let update = PasswordUpdate {
            uuid: user_uuid.clone(),
            current_password: form.current_password,
            new_password: form.new_password,
            new_password_confirmation: form.new_password_confirmation,
        };
        blocking(ctx, move |ctx| service.update_password(ctx, update)).await?;
        info!(%user_uuid, "password updated");
        Ok(())
    }

    match update1(state, &ctx, form).await {
        Ok(()) => see_other_with_flash(ACCOUNT_LOCATION, Flash::success("Password updated")),
        Err(e) => form_failure(e, ACCOUNT_LOCATION),
    }
}

#[derive(Serialize)]
struct PreferencesView {
    csrf_token: String,
    show_entries: EntryVisibility,
    show_entry_summaries: bool,
}

/// `GET /account/preferences`
pub async fn preferences_view(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
) -> Response {
    async fn view1(state: SharedState, ctx: &RequestContext) -> Result<PreferencesView> {
        let user_uuid = current_user(ctx)?.uuid.clone();
        let csrf_token = form_token(&state, ctx, CsrfAction::AccountPreferencesUpdate)?.csrf_token;
        let service = state.services.feed_service.clone();
        let preferences = blocking(ctx, move |ctx| service.preferences(ctx, &user_uuid)).await?;
        Ok(PreferencesView {
            csrf_token,
            show_entries: preferences.show_entries,
            show_entry_summaries: preferences.show_entry_summaries,
        })
    }

    render(&headers, view1(state, &ctx).await)
}

#[derive(Deserialize)]
pub struct PreferencesForm {
    csrf_token: String,
    show_entries: String,
    show_entry_summaries: Option<String>,
}

pub async fn preferences_update(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<PreferencesForm>,
) -> Response {
    async fn update1(state: SharedState, ctx: &RequestContext, form: PreferencesForm) -> Result<()> {
        let user_uuid = current_user(ctx)?.uuid.clone();
        check_csrf(
            &state,
            &user_uuid,
            &form.csrf_token,
            CsrfAction::AccountPreferencesUpdate,
        )?;
        let show_entries: EntryVisibility = form.show_entries.parse()?;
        let show_entry_summaries = checkbox(&form.show_entry_summaries);
        let service = state.services.feed_service.clone();
        blocking(ctx, move |ctx| {
            let mut preferences = service.preferences(ctx, &user_uuid)?;
            preferences.show_entries = show_entries;
            preferences.show_entry_summaries = show_entry_summaries;
            service.update_preferences(ctx, preferences)
        })
        .await
    }

    match update1(state, &ctx, form).await {
        Ok(()) => see_other_with_flash(
            "/account/preferences",
            Flash::success("Preferences updated"),
        ),
        Err(e) => form_failure(e, "/account/preferences"),
    }
}
