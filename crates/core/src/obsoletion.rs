//! Obsoletion engine: retire older updates superseded by a new one.
//!
//! Which updates are immune is policy, not code. [`ObsoletionPolicy`] is the
//! configurable predicate; the only hard rules are that an update never
//! obsoletes itself and terminal updates are never touched again.

use serde::{Deserialize, Serialize};

use crate::enums::{UpdateRequest, UpdateStatus};
use crate::model::{Comment, Update};
use crate::store::{Outcome, Revision};
use crate::types::Timestamp;

/// Configurable exclusion predicate for obsoletion candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObsoletionPolicy {
    /// Only updates in one of these statuses may be obsoleted.
    pub eligible_statuses: Vec<UpdateStatus>,
    /// Updates with one of these requests are left alone (e.g. queued for stable).
    pub immune_requests: Vec<UpdateRequest>,
    /// Leave locked updates alone.
    pub skip_locked: bool,
}

impl Default for ObsoletionPolicy {
    fn default() -> Self {
        Self {
            eligible_statuses: vec![UpdateStatus::Pending, UpdateStatus::Testing],
            immune_requests: vec![UpdateRequest::Stable],
            skip_locked: true,
        }
    }
}

impl ObsoletionPolicy {
    /// Whether `candidate` may be obsoleted by `new_update`.
    pub fn is_candidate(&self, new_update: &Update, candidate: &Update) -> bool {
        if candidate.id == new_update.id || candidate.status.is_terminal() {
            return false;
        }
        if candidate.release != new_update.release {
            return false;
        }
        if !new_update
            .package_names()
            .iter()
            .any(|p| candidate.has_package(p))
        {
            return false;
        }
        if candidate.date_submitted > new_update.date_submitted {
            return false;
        }
        if self.skip_locked && candidate.locked {
            return false;
        }
        self.eligible_statuses.contains(&candidate.status)
            && !self.immune_requests.contains(&candidate.request)
    }

    /// Filter `related` down to candidates, oldest submission first.
    pub fn select_candidates(&self, new_update: &Update, related: Vec<Update>) -> Vec<Update> {
        let mut candidates: Vec<Update> = related
            .into_iter()
            .filter(|c| self.is_candidate(new_update, c))
            .collect();
        candidates.sort_by(|a, b| {
            a.date_submitted
                .cmp(&b.date_submitted)
                .then(a.id.cmp(&b.id))
        });
        candidates
    }

    /// The check-then-act step for one candidate, evaluated against its
    /// current (locked) state. Skips if it stopped being a candidate.
    pub fn plan_obsoletion(
        &self,
        new_update: &Update,
        current: &Update,
        actor: &str,
        now: Timestamp,
    ) -> Outcome {
        if !self.is_candidate(new_update, current) {
            return Outcome::Skip;
        }

        let mut next = current.clone();
        next.status = UpdateStatus::Obsolete;
        next.request = UpdateRequest::None;
        next.date_modified = Some(now);

        Outcome::Write(Revision {
            update: next,
            comment: Comment {
                author: actor.to_string(),
                text: format!("This update has been obsoleted by {}.", new_update.alias),
                timestamp: now,
            },
        })
    }
}

/// A candidate that could not be obsoleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObsoletionFailure {
    pub alias: String,
    pub error: String,
}

/// Result of one obsoletion sweep. Failures are collected, never raised.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObsoletionReport {
    /// Updates obsoleted by this sweep, in processing order.
    pub obsoleted: Vec<Update>,
    pub failures: Vec<ObsoletionFailure>,
}

impl ObsoletionReport {
    pub fn obsoleted_aliases(&self) -> Vec<&str> {
        self.obsoleted.iter().map(|u| u.alias.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{at, update};
    use crate::model::Build;

    #[test]
    fn never_obsoletes_itself() {
        let new = update(2, "bash-5.2-2.fc40", "F40", at(2));
        assert!(!ObsoletionPolicy::default().is_candidate(&new, &new));
    }

    #[test]
    fn terminal_updates_are_immune_regardless_of_policy() {
        let new = update(2, "bash-5.2-2.fc40", "F40", at(2));
        let policy = ObsoletionPolicy {
            eligible_statuses: UpdateStatus::VALUES.to_vec(),
            immune_requests: Vec::new(),
            skip_locked: false,
        };
        for status in [UpdateStatus::Obsolete, UpdateStatus::Unpushed] {
            let mut old = update(1, "bash-5.2-1.fc40", "F40", at(1));
            old.status = status;
            assert!(!policy.is_candidate(&new, &old));
        }
    }

    #[test]
    fn requires_same_release_and_shared_package() {
        let new = update(3, "bash-5.2-2.fc40", "F40", at(3));
        let policy = ObsoletionPolicy::default();

        let other_release = update(1, "bash-5.2-1.fc41", "F41", at(1));
        assert!(!policy.is_candidate(&new, &other_release));

        let other_package = update(2, "zsh-5.9-1.fc40", "F40", at(1));
        assert!(!policy.is_candidate(&new, &other_package));

        let mut shares_one = update(4, "zsh-5.9-1.fc40", "F40", at(1));
        shares_one.builds.push(Build::from_nvr("bash-5.2-1.fc40").unwrap());
        assert!(policy.is_candidate(&new, &shares_one));
    }

    #[test]
    fn default_policy_spares_stable_requests_and_locked_updates() {
        let new = update(3, "bash-5.2-2.fc40", "F40", at(3));
        let policy = ObsoletionPolicy::default();

        let mut queued = update(1, "bash-5.2-1.fc40", "F40", at(1));
        queued.request = UpdateRequest::Stable;
        assert!(!policy.is_candidate(&new, &queued));

        let mut locked = update(2, "bash-5.2-1.fc40", "F40", at(1));
        locked.locked = true;
        assert!(!policy.is_candidate(&new, &locked));

        let mut stable = update(4, "bash-5.2-1.fc40", "F40", at(1));
        stable.status = UpdateStatus::Stable;
        assert!(!policy.is_candidate(&new, &stable));
    }

    #[test]
    fn policy_is_configurable() {
        let new = update(3, "bash-5.2-2.fc40", "F40", at(3));
        let mut queued = update(1, "bash-5.2-1.fc40", "F40", at(1));
        queued.request = UpdateRequest::Stable;
        queued.locked = true;

        let permissive = ObsoletionPolicy {
            immune_requests: Vec::new(),
            skip_locked: false,
            ..ObsoletionPolicy::default()
        };
        assert!(permissive.is_candidate(&new, &queued));
    }

    #[test]
    fn newer_updates_are_not_superseded() {
        let new = update(3, "bash-5.2-2.fc40", "F40", at(3));
        let newer = update(4, "bash-5.2-3.fc40", "F40", at(4));
        assert!(!ObsoletionPolicy::default().is_candidate(&new, &newer));
    }

    #[test]
    fn candidates_sorted_oldest_first() {
        let new = update(9, "bash-5.2-9.fc40", "F40", at(10));
        let related = vec![
            update(5, "bash-5.2-5.fc40", "F40", at(5)),
            update(2, "bash-5.2-2.fc40", "F40", at(2)),
            update(7, "bash-5.2-7.fc40", "F40", at(2)),
            update(8, "zsh-5.9-1.fc40", "F40", at(1)),
        ];
        let ids: Vec<_> = ObsoletionPolicy::default()
            .select_candidates(&new, related)
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![2, 7, 5]);
    }

    #[test]
    fn plan_marks_obsolete_and_clears_request() {
        let new = update(3, "bash-5.2-2.fc40", "F40", at(3));
        let old = update(1, "bash-5.2-1.fc40", "F40", at(1));
        let Outcome::Write(rev) = ObsoletionPolicy::default().plan_obsoletion(&new, &old, "alice", at(4))
        else {
            panic!("expected a write");
        };
        assert_eq!(rev.update.status, UpdateStatus::Obsolete);
        assert_eq!(rev.update.request, UpdateRequest::None);
        assert_eq!(rev.update.date_modified, Some(at(4)));
        assert_eq!(
            rev.comment.text,
            format!("This update has been obsoleted by {}.", new.alias)
        );
    }

    #[test]
    fn plan_skips_already_obsolete() {
        let new = update(3, "bash-5.2-2.fc40", "F40", at(3));
        let mut old = update(1, "bash-5.2-1.fc40", "F40", at(1));
        old.status = UpdateStatus::Obsolete;
        assert!(matches!(
            ObsoletionPolicy::default().plan_obsoletion(&new, &old, "alice", at(4)),
            Outcome::Skip
        ));
    }
}
