#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// Malformed input. Create/edit passes it through unchanged.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Can't change request on a locked update: {update}")]
    LockedUpdate { update: String },

    /// The reason is surfaced to the caller verbatim.
    #[error("Requirement not met: {0}")]
    RequirementNotMet(String),

    /// Generic create/edit failure. The underlying cause is logged, not carried.
    #[error("Unable to create update")]
    CreationFailed,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a missing update looked up by id, alias, or title.
    pub fn update_not_found(ident: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Update",
            id: ident.into(),
        }
    }
}
