//! Update creation and edit planning.
//!
//! Input arrives already validated by the collaborator layer (builds exist
//! and are tagged, the submitter holds ACLs on every package). These
//! functions turn a [`Submission`] into the [`Revision`] to persist.

use chrono::Datelike;
use serde::Deserialize;

use crate::enums::{
    TestGatingStatus, UpdateRequest, UpdateSeverity, UpdateStatus, UpdateSuggestion, UpdateType,
};
use crate::error::CoreError;
use crate::model::{
    dedup_bugs, dedup_builds, dedup_cves, title_for, Bug, Build, Comment, Cve, Release, Update,
};
use crate::store::Revision;
use crate::types::Timestamp;

/// Number of random hex characters in a generated alias.
pub const ALIAS_SUFFIX_LEN: usize = 10;

/// A validated new-update or edit submission.
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    /// Build NVRs.
    pub builds: Vec<String>,
    /// Release name.
    pub release: String,
    #[serde(rename = "type")]
    pub update_type: UpdateType,
    #[serde(default = "default_severity")]
    pub severity: UpdateSeverity,
    #[serde(default = "default_suggest")]
    pub suggest: UpdateSuggestion,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub bugs: Vec<i64>,
    #[serde(default)]
    pub cves: Vec<String>,
    #[serde(default)]
    pub critpath: bool,
    /// Id, alias, or title of the update being edited. Absent for new updates.
    #[serde(default)]
    pub edited: Option<String>,
}

fn default_severity() -> UpdateSeverity {
    UpdateSeverity::Unspecified
}

fn default_suggest() -> UpdateSuggestion {
    UpdateSuggestion::Unspecified
}

impl Submission {
    /// The edit marker, if this submission edits an existing update.
    pub fn edit_target(&self) -> Option<&str> {
        self.edited.as_deref().filter(|e| !e.trim().is_empty())
    }

    fn parsed_builds(&self) -> Result<Vec<Build>, CoreError> {
        if self.builds.is_empty() {
            return Err(CoreError::Validation(
                "An update requires at least one build".into(),
            ));
        }
        let builds = self
            .builds
            .iter()
            .map(|nvr| Build::from_nvr(nvr.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dedup_builds(builds))
    }

    fn parsed_bugs(&self) -> Vec<Bug> {
        dedup_bugs(
            self.bugs
                .iter()
                .map(|&bug_id| Bug {
                    bug_id,
                    title: None,
                })
                .collect(),
        )
    }

    fn parsed_cves(&self) -> Vec<Cve> {
        dedup_cves(
            self.cves
                .iter()
                .map(|c| Cve {
                    cve_id: c.trim().to_string(),
                })
                .collect(),
        )
    }
}

/// Generate an immutable alias such as `FEDORA-2024-3f9a0c51d2`.
pub fn generate_alias(id_prefix: &str, now: Timestamp) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    let suffix = &random[random.len() - ALIAS_SUFFIX_LEN..];
    format!("{id_prefix}-{}-{suffix}", now.year())
}

/// Plan a brand-new update from `submission`.
///
/// New updates start `pending` with an implicit `testing` request.
pub fn plan_create(
    submission: &Submission,
    release: &Release,
    actor: &str,
    now: Timestamp,
) -> Result<Revision, CoreError> {
    let builds = submission.parsed_builds()?;

    let update = Update {
        id: 0,
        alias: generate_alias(&release.id_prefix, now),
        title: title_for(&builds),
        status: UpdateStatus::Pending,
        request: UpdateRequest::Testing,
        locked: false,
        pushed: false,
        update_type: submission.update_type,
        severity: submission.severity,
        suggest: submission.suggest,
        notes: submission.notes.clone(),
        user: actor.to_string(),
        release: release.name.clone(),
        critpath: submission.critpath,
        karma: 0,
        test_gating_status: TestGatingStatus::Waiting,
        date_submitted: now,
        date_modified: None,
        date_approved: None,
        date_pushed: None,
        builds,
        bugs: submission.parsed_bugs(),
        cves: submission.parsed_cves(),
        comments: Vec::new(),
    };

    Ok(Revision {
        update,
        comment: Comment {
            author: actor.to_string(),
            text: format!("This update has been submitted for testing by {actor}."),
            timestamp: now,
        },
    })
}

/// Builds added and removed by an edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl BuildDiff {
    pub fn between(old: &[Build], new: &[Build]) -> Self {
        let added = new
            .iter()
            .filter(|b| !old.iter().any(|o| o.nvr == b.nvr))
            .map(|b| b.nvr.clone())
            .collect();
        let removed = old
            .iter()
            .filter(|o| !new.iter().any(|b| b.nvr == o.nvr))
            .map(|o| o.nvr.clone())
            .collect();
        Self { added, removed }
    }
}

/// Plan an edit of `existing`, replacing its builds, bugs and CVEs with the
/// submitted sets.
pub fn plan_edit(
    existing: &Update,
    submission: &Submission,
    actor: &str,
    now: Timestamp,
) -> Result<Revision, CoreError> {
    if existing.locked {
        return Err(CoreError::LockedUpdate {
            update: existing.alias.clone(),
        });
    }
    if submission.release != existing.release {
        return Err(CoreError::Validation(format!(
            "Cannot move update {} from {} to {}",
            existing.alias, existing.release, submission.release
        )));
    }

    let builds = submission.parsed_builds()?;
    let diff = BuildDiff::between(&existing.builds, &builds);

    let mut next = existing.clone();
    next.title = title_for(&builds);
    next.builds = builds;
    next.bugs = submission.parsed_bugs();
    next.cves = submission.parsed_cves();
    next.update_type = submission.update_type;
    next.severity = submission.severity;
    next.suggest = submission.suggest;
    next.notes = submission.notes.clone();
    next.critpath = submission.critpath;
    next.date_modified = Some(now);

    Ok(Revision {
        update: next,
        comment: Comment {
            author: actor.to_string(),
            text: edit_comment(actor, &diff),
            timestamp: now,
        },
    })
}

fn edit_comment(actor: &str, diff: &BuildDiff) -> String {
    let mut text = format!("{actor} edited this update.");
    if !diff.added.is_empty() {
        text.push_str(&format!(" Added build(s): {}.", diff.added.join(", ")));
    }
    if !diff.removed.is_empty() {
        text.push_str(&format!(" Removed build(s): {}.", diff.removed.join(", ")));
    }
    text
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn release(name: &str) -> Release {
        Release {
            id: 1,
            name: name.to_string(),
            long_name: format!("Fedora {}", &name[1..]),
            version: name[1..].parse().unwrap_or(0),
            id_prefix: "FEDORA".to_string(),
        }
    }

    pub fn submission(builds: &[&str], release: &str) -> Submission {
        Submission {
            builds: builds.iter().map(|b| b.to_string()).collect(),
            release: release.to_string(),
            update_type: UpdateType::Bugfix,
            severity: UpdateSeverity::Unspecified,
            suggest: UpdateSuggestion::Unspecified,
            notes: "Fixes things".to_string(),
            bugs: Vec::new(),
            cves: Vec::new(),
            critpath: false,
            edited: None,
        }
    }
}
