//! Persistence errors and their mapping into the domain taxonomy.

use relflow_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value no longer parses into its domain type.
    #[error("Corrupt row in {table}: {detail}")]
    Corrupt { table: &'static str, detail: String },

    /// A domain error raised while the transaction was open.
    #[error(transparent)]
    Domain(#[from] CoreError),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(e) => e,
            other => {
                tracing::error!(error = %other, "Persistence failure");
                CoreError::Internal(other.to_string())
            }
        }
    }
}
