//! Route definitions for updates.
//!
//! Mounted at `/updates` by `api_routes()`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::updates;
use crate::state::AppState;

/// Update routes.
///
/// ```text
/// GET    /                  -> list_updates
/// POST   /                  -> save_update (auth)
/// GET    /{id}              -> get_update
/// GET    /{id}/edit         -> edit_form (auth, submitter or admin)
/// POST   /{id}/request      -> set_request (auth, submitter or admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(updates::list_updates).post(updates::save_update))
        .route("/{id}", get(updates::get_update))
        .route("/{id}/edit", get(updates::edit_form))
        .route("/{id}/request", post(updates::set_request))
}
