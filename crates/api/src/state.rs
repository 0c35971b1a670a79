use std::sync::Arc;

use relflow_core::service::UpdateService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Update workflow operations over the configured store.
    pub service: Arc<UpdateService>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Database pool, when the store is database backed. Used by `/health`.
    pub pool: Option<relflow_db::DbPool>,
}
