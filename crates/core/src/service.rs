//! Orchestration of the public update operations over an [`UpdateStore`].

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::enums::{UpdateRequest, UpdateStatus};
use crate::error::CoreError;
use crate::metrics::{shape_release_metrics, ReleaseMetrics};
use crate::model::Update;
use crate::obsoletion::{ObsoletionFailure, ObsoletionPolicy, ObsoletionReport};
use crate::query::{Page, PageRequest, UpdateFilter, UpdateQuery};
use crate::requirements::RequirementSettings;
use crate::store::{Outcome, UpdateStore};
use crate::submission::{plan_create, plan_edit, Submission};
use crate::transition::apply_request;

/// Result of a successful create or edit.
#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub update: Update,
    pub obsoletion: ObsoletionReport,
}

pub struct UpdateService {
    store: Arc<dyn UpdateStore>,
    settings: RequirementSettings,
    policy: ObsoletionPolicy,
}

impl UpdateService {
    pub fn new(
        store: Arc<dyn UpdateStore>,
        settings: RequirementSettings,
        policy: ObsoletionPolicy,
    ) -> Self {
        Self {
            store,
            settings,
            policy,
        }
    }

    pub fn settings(&self) -> &RequirementSettings {
        &self.settings
    }

    /// Look up an update by numeric id, alias, or title.
    pub async fn get_update(&self, ident: &str) -> Result<Update, CoreError> {
        self.store
            .find(ident)
            .await?
            .ok_or_else(|| CoreError::update_not_found(ident))
    }

    pub async fn list_updates(
        &self,
        query: &UpdateQuery,
        page: PageRequest,
    ) -> Result<Page<Update>, CoreError> {
        let filter = UpdateFilter::from_query(query);
        let (items, total) = self.store.list(&filter, page).await?;
        Ok(Page::new(items, total, page))
    }

    /// Change the request of the update named by `ident`.
    ///
    /// The lock and requirement checks run against the update as held by the
    /// store, so a concurrent writer cannot slip in between check and write.
    pub async fn set_request(
        &self,
        ident: &str,
        requested: UpdateRequest,
        actor: &str,
    ) -> Result<Update, CoreError> {
        let settings = self.settings.clone();
        let actor_name = actor.to_string();
        let now = Utc::now();

        let written = self
            .store
            .modify(
                ident,
                Box::new(move |current: &Update| {
                    apply_request(current, requested, &actor_name, &settings, now)
                        .map(Outcome::Write)
                }),
            )
            .await?
            .ok_or_else(|| CoreError::Internal(format!("request change on {ident} was skipped")))?;

        tracing::info!(
            update = %written.alias,
            request = %requested,
            actor,
            "Update request changed",
        );
        Ok(written)
    }

    /// Create a new update, or edit the one named by `submission.edited`,
    /// then obsolete whatever it supersedes.
    pub async fn create_or_edit(
        &self,
        submission: Submission,
        actor: &str,
    ) -> Result<SaveOutcome, CoreError> {
        let saved = match self.save(submission, actor).await {
            Ok(update) => update,
            Err(
                e @ (CoreError::LockedUpdate { .. }
                | CoreError::Validation(_)
                | CoreError::NotFound { .. }),
            ) => return Err(e),
            Err(e) => {
                tracing::error!(error = %e, actor, "Failed to save update");
                return Err(CoreError::CreationFailed);
            }
        };

        let obsoletion = self.obsolete_older_updates(&saved, actor).await;
        Ok(SaveOutcome {
            update: saved,
            obsoletion,
        })
    }

    async fn save(&self, submission: Submission, actor: &str) -> Result<Update, CoreError> {
        let now = Utc::now();

        if let Some(target) = submission.edit_target().map(str::to_string) {
            let actor_name = actor.to_string();
            let edited = self
                .store
                .modify(
                    &target,
                    Box::new(move |existing: &Update| {
                        plan_edit(existing, &submission, &actor_name, now).map(Outcome::Write)
                    }),
                )
                .await?
                .ok_or_else(|| CoreError::Internal(format!("edit of {target} was skipped")))?;
            tracing::info!(update = %edited.alias, actor, "Update edited");
            return Ok(edited);
        }

        let release = self
            .store
            .find_release(&submission.release)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Release",
                id: submission.release.clone(),
            })?;
        let revision = plan_create(&submission, &release, actor, now)?;
        let created = self.store.insert(revision).await?;
        tracing::info!(update = %created.alias, release = %created.release, actor, "Update created");
        Ok(created)
    }

    /// Obsolete every older update superseded by `new_update`.
    ///
    /// Best effort: each candidate is written independently and failures are
    /// collected in the report. Running it again obsoletes nothing new.
    pub async fn obsolete_older_updates(&self, new_update: &Update, actor: &str) -> ObsoletionReport {
        let mut report = ObsoletionReport::default();

        let related = match self
            .store
            .find_related(&new_update.release, &new_update.package_names(), new_update.id)
            .await
        {
            Ok(related) => related,
            Err(e) => {
                tracing::warn!(update = %new_update.alias, error = %e, "Failed to load obsoletion candidates");
                report.failures.push(ObsoletionFailure {
                    alias: new_update.alias.clone(),
                    error: e.to_string(),
                });
                return report;
            }
        };

        let shared = Arc::new(new_update.clone());
        for candidate in self.policy.select_candidates(new_update, related) {
            let policy = self.policy.clone();
            let new_update = Arc::clone(&shared);
            let actor_name = actor.to_string();
            let now = Utc::now();

            let result = self
                .store
                .modify(
                    &candidate.alias,
                    Box::new(move |current: &Update| {
                        Ok(policy.plan_obsoletion(&new_update, current, &actor_name, now))
                    }),
                )
                .await;

            match result {
                Ok(Some(obsoleted)) => {
                    tracing::info!(
                        update = %obsoleted.alias,
                        obsoleted_by = %shared.alias,
                        "Update obsoleted",
                    );
                    report.obsoleted.push(obsoleted);
                }
                Ok(None) => {
                    tracing::debug!(update = %candidate.alias, "Obsoletion candidate changed, skipped");
                }
                Err(e) => {
                    tracing::warn!(update = %candidate.alias, error = %e, "Failed to obsolete update");
                    report.failures.push(ObsoletionFailure {
                        alias: candidate.alias,
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Stable update counts per release and type for releases named with
    /// `prefix`.
    pub async fn release_metrics(&self, prefix: &str) -> Result<ReleaseMetrics, CoreError> {
        let releases = self.store.list_releases().await?;
        let counts = self
            .store
            .count_by_release_and_type(UpdateStatus::Stable)
            .await?;
        Ok(shape_release_metrics(&releases, &counts, prefix))
    }
}
