//! Handlers for the update lifecycle endpoints.
//!
//! Listing and reading are public. Creating, editing and request changes
//! require a bearer token; edits and request changes additionally require
//! the caller to be the submitter or an admin.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use relflow_core::enums::{UpdateRequest, UpdateSeverity, UpdateSuggestion, UpdateType};
use relflow_core::model::Update;
use relflow_core::submission::Submission;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::extract::{AppJson, AppQuery};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::query::ListUpdatesParams;
use crate::response::data;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /updates
// ---------------------------------------------------------------------------

/// List updates matching the query filters, newest first.
pub async fn list_updates(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<ListUpdatesParams>,
) -> AppResult<impl IntoResponse> {
    let (query, page) = params.into_parts()?;
    let result = state.service.list_updates(&query, page).await?;
    Ok(data(result))
}

// ---------------------------------------------------------------------------
// GET /updates/{id}
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct UpdateView {
    pub update: Update,
    /// Whether the caller may edit this update or change its request.
    pub can_edit: bool,
}

/// Fetch one update by id, alias, or title.
pub async fn get_update(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    Path(ident): Path<String>,
) -> AppResult<impl IntoResponse> {
    let update = state.service.get_update(&ident).await?;
    let can_edit = user.is_some_and(|u| u.can_edit(&update));
    Ok(data(UpdateView { update, can_edit }))
}

// ---------------------------------------------------------------------------
// GET /updates/{id}/edit
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct EditForm {
    pub update: Update,
    pub types: Vec<&'static str>,
    pub severities: Vec<&'static str>,
    pub suggestions: Vec<&'static str>,
}

fn reversed(mut names: Vec<&'static str>) -> Vec<&'static str> {
    names.reverse();
    names
}

/// Data for an edit form: the update plus the selectable option lists.
pub async fn edit_form(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(ident): Path<String>,
) -> AppResult<impl IntoResponse> {
    let update = state.service.get_update(&ident).await?;
    auth.require_edit(&update)?;
    Ok(data(EditForm {
        update,
        types: reversed(UpdateType::names()),
        severities: reversed(UpdateSeverity::names()),
        suggestions: reversed(UpdateSuggestion::names()),
    }))
}

// ---------------------------------------------------------------------------
// POST /updates
// ---------------------------------------------------------------------------

/// Create a new update, or edit the one named by `edited`.
///
/// Responds 201 for a new update and 200 for an edit. The body carries the
/// saved update and the obsoletion report.
pub async fn save_update(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(submission): AppJson<Submission>,
) -> AppResult<impl IntoResponse> {
    let status = match submission.edit_target() {
        Some(target) => {
            let existing = state.service.get_update(target).await?;
            auth.require_edit(&existing)?;
            StatusCode::OK
        }
        None => StatusCode::CREATED,
    };

    let outcome = state
        .service
        .create_or_edit(submission, &auth.username)
        .await?;

    tracing::info!(
        update = %outcome.update.alias,
        user = %auth.username,
        obsoleted = outcome.obsoletion.obsoleted.len(),
        failures = outcome.obsoletion.failures.len(),
        "Update saved",
    );

    Ok((status, data(outcome)))
}

// ---------------------------------------------------------------------------
// POST /updates/{id}/request
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SetRequestBody {
    pub request: UpdateRequest,
}

/// Change the request of an update.
pub async fn set_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(ident): Path<String>,
    AppJson(body): AppJson<SetRequestBody>,
) -> AppResult<impl IntoResponse> {
    let existing = state.service.get_update(&ident).await?;
    auth.require_edit(&existing)?;

    let update = state
        .service
        .set_request(&existing.alias, body.request, &auth.username)
        .await?;
    Ok(data(update))
}
