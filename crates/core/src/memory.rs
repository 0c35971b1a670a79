//! In-process [`UpdateStore`] backed by a mutex-guarded vector.
//!
//! Used by tests and by the API test harness. A single lock serializes every
//! write, which satisfies the exclusive-access contract of
//! [`UpdateStore::modify`].

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::enums::{UpdateStatus, UpdateType};
use crate::error::CoreError;
use crate::model::{Release, Update};
use crate::query::{newest_first, PageRequest, UpdateFilter};
use crate::store::{Mutation, Outcome, Revision, TypeCount, UpdateStore};
use crate::types::DbId;

#[derive(Debug, Default)]
struct State {
    updates: Vec<Update>,
    releases: Vec<Release>,
    next_id: DbId,
    /// Aliases whose writes fail, for exercising error paths.
    rejected: HashSet<String>,
    reject_inserts: bool,
}

impl State {
    fn alias_taken(&self, alias: &str) -> bool {
        self.updates.iter().any(|u| u.alias == alias)
    }

    fn allocate_id(&mut self) -> DbId {
        self.next_id = self.next_id.max(1);
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_releases(releases: Vec<Release>) -> Self {
        Self {
            state: Mutex::new(State {
                releases,
                ..State::default()
            }),
        }
    }

    /// Store `update` as-is. An id of 0 is replaced by a fresh one, and an
    /// alias already in use is rebuilt from the stored id so aliases stay
    /// unique.
    pub async fn seed(&self, mut update: Update) -> Update {
        let mut state = self.state.lock().await;
        if update.id == 0 {
            update.id = state.allocate_id();
        } else {
            state.next_id = state.next_id.max(update.id + 1);
        }
        if state.alias_taken(&update.alias) {
            let stem = update
                .alias
                .rsplit_once('-')
                .map_or(update.alias.as_str(), |(stem, _)| stem);
            update.alias = format!("{stem}-{:010x}", update.id);
        }
        state.updates.push(update.clone());
        update
    }

    /// Snapshot of every stored update in insertion order.
    pub async fn all(&self) -> Vec<Update> {
        self.state.lock().await.updates.clone()
    }

    /// Make every future write to the update with `alias` fail.
    pub async fn reject_writes_to(&self, alias: &str) {
        self.state.lock().await.rejected.insert(alias.to_string());
    }

    /// Make every future insert fail.
    pub async fn reject_inserts(&self) {
        self.state.lock().await.reject_inserts = true;
    }
}

#[async_trait]
impl UpdateStore for MemoryStore {
    async fn find(&self, ident: &str) -> Result<Option<Update>, CoreError> {
        let state = self.state.lock().await;
        Ok(state
            .updates
            .iter()
            .find(|u| u.is_identified_by(ident))
            .cloned())
    }

    async fn list(
        &self,
        filter: &UpdateFilter,
        page: PageRequest,
    ) -> Result<(Vec<Update>, i64), CoreError> {
        let state = self.state.lock().await;
        let mut matched: Vec<Update> = state
            .updates
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        matched.sort_by(newest_first);
        let total = matched.len() as i64;
        Ok((page.slice(matched), total))
    }

    async fn insert(&self, revision: Revision) -> Result<Update, CoreError> {
        let mut state = self.state.lock().await;
        if state.reject_inserts {
            return Err(CoreError::Internal("insert rejected".into()));
        }
        if state.alias_taken(&revision.update.alias) {
            return Err(CoreError::Conflict(format!(
                "alias {} already exists",
                revision.update.alias
            )));
        }
        let mut update = revision.update;
        update.id = state.allocate_id();
        update.comments.push(revision.comment);
        state.updates.push(update.clone());
        Ok(update)
    }

    async fn modify(&self, ident: &str, mutation: Mutation) -> Result<Option<Update>, CoreError> {
        let mut state = self.state.lock().await;
        let index = state
            .updates
            .iter()
            .position(|u| u.is_identified_by(ident))
            .ok_or_else(|| CoreError::update_not_found(ident))?;

        let Outcome::Write(revision) = mutation(&state.updates[index])? else {
            return Ok(None);
        };

        if state.rejected.contains(&state.updates[index].alias) {
            return Err(CoreError::Internal(format!(
                "write to {} rejected",
                state.updates[index].alias
            )));
        }

        let mut next = revision.update;
        next.id = state.updates[index].id;
        next.comments.push(revision.comment);
        state.updates[index] = next.clone();
        Ok(Some(next))
    }

    async fn find_related(
        &self,
        release: &str,
        packages: &[String],
        exclude: DbId,
    ) -> Result<Vec<Update>, CoreError> {
        let state = self.state.lock().await;
        Ok(state
            .updates
            .iter()
            .filter(|u| u.id != exclude && u.release == release)
            .filter(|u| packages.iter().any(|p| u.has_package(p)))
            .cloned()
            .collect())
    }

    async fn find_release(&self, name: &str) -> Result<Option<Release>, CoreError> {
        let state = self.state.lock().await;
        Ok(state.releases.iter().find(|r| r.name == name).cloned())
    }

    async fn list_releases(&self) -> Result<Vec<Release>, CoreError> {
        Ok(self.state.lock().await.releases.clone())
    }

    async fn count_by_release_and_type(
        &self,
        status: UpdateStatus,
    ) -> Result<Vec<TypeCount>, CoreError> {
        let state = self.state.lock().await;
        let mut counts: Vec<TypeCount> = Vec::new();
        for update in state.updates.iter().filter(|u| u.status == status) {
            match counts
                .iter_mut()
                .find(|c| c.release == update.release && c.update_type == update.update_type)
            {
                Some(c) => c.count += 1,
                None => counts.push(TypeCount {
                    release: update.release.clone(),
                    update_type: update.update_type,
                    count: 1,
                }),
            }
        }
        counts.sort_by(|a, b| {
            a.release
                .cmp(&b.release)
                .then(type_rank(a.update_type).cmp(&type_rank(b.update_type)))
        });
        Ok(counts)
    }
}

fn type_rank(update_type: UpdateType) -> usize {
    UpdateType::VALUES
        .iter()
        .position(|t| *t == update_type)
        .unwrap_or(usize::MAX)
}
