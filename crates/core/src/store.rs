//! Persistence seam for the workflow engines.
//!
//! The engines never talk to a database directly. They describe each write as
//! a [`Revision`] and hand read-modify-write sequences to
//! [`UpdateStore::modify`], which runs the mutation with exclusive access to
//! the update and commits every field of the revision as one atomic write.

use async_trait::async_trait;
use serde::Serialize;

use crate::enums::{UpdateStatus, UpdateType};
use crate::error::CoreError;
use crate::model::{Comment, Release, Update};
use crate::query::{PageRequest, UpdateFilter};
use crate::types::DbId;

/// The complete new state of an update plus the audit entry explaining it.
///
/// `update.comments` holds the history as loaded; the store appends
/// `comment` when it commits.
#[derive(Debug, Clone)]
pub struct Revision {
    pub update: Update,
    pub comment: Comment,
}

/// What a mutation decided after inspecting the locked update.
#[derive(Debug, Clone)]
pub enum Outcome {
    Write(Revision),
    /// Leave the update untouched.
    Skip,
}

/// A check-then-act step run under exclusive access to one update.
pub type Mutation = Box<dyn FnOnce(&Update) -> Result<Outcome, CoreError> + Send>;

/// Number of updates in one (release, type) bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    pub release: String,
    pub update_type: UpdateType,
    pub count: i64,
}

#[async_trait]
pub trait UpdateStore: Send + Sync {
    /// Find an update by numeric id, alias, or title.
    async fn find(&self, ident: &str) -> Result<Option<Update>, CoreError>;

    /// One page of updates matching `filter`, newest submission first, plus
    /// the total number of matches ignoring pagination.
    async fn list(
        &self,
        filter: &UpdateFilter,
        page: PageRequest,
    ) -> Result<(Vec<Update>, i64), CoreError>;

    /// Persist a new update. The store assigns the id; `revision.update.id`
    /// is ignored.
    async fn insert(&self, revision: Revision) -> Result<Update, CoreError>;

    /// Run `mutation` against the update named by `ident` while holding it
    /// exclusively.
    ///
    /// Returns `Ok(Some(_))` with the committed state when the mutation wrote,
    /// `Ok(None)` when it skipped, and `CoreError::NotFound` when no update
    /// matches. A mutation error aborts without writing anything.
    async fn modify(&self, ident: &str, mutation: Mutation) -> Result<Option<Update>, CoreError>;

    /// Updates in `release` carrying a build of any of `packages`, other than
    /// `exclude`.
    async fn find_related(
        &self,
        release: &str,
        packages: &[String],
        exclude: DbId,
    ) -> Result<Vec<Update>, CoreError>;

    async fn find_release(&self, name: &str) -> Result<Option<Release>, CoreError>;

    async fn list_releases(&self) -> Result<Vec<Release>, CoreError>;

    /// Count updates in `status`, grouped by release and type.
    async fn count_by_release_and_type(
        &self,
        status: UpdateStatus,
    ) -> Result<Vec<TypeCount>, CoreError>;
}
