pub mod health;
pub mod metrics;
pub mod updates;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /updates                          list, create or edit
/// /updates/{id}                     get
/// /updates/{id}/edit                edit form data
/// /updates/{id}/request             change request
/// /metrics                          stable updates per release and type
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/updates", updates::router())
        .merge(metrics::router())
}
