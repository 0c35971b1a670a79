//! Handler for per-release update metrics.

use axum::extract::State;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::error::AppResult;
use crate::extract::AppQuery;
use crate::response::data;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MetricsParams {
    /// Release-name prefix; defaults to the configured prefix.
    pub prefix: Option<String>,
}

/// Stable update counts per release and type.
pub async fn release_metrics(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<MetricsParams>,
) -> AppResult<impl IntoResponse> {
    let prefix = params
        .prefix
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| state.config.workflow.metrics_prefix.clone());
    let metrics = state.service.release_metrics(&prefix).await?;
    Ok(data(metrics))
}
