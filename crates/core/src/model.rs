//! Update aggregate and its value objects.
//!
//! Builds, bugs, CVEs and comments are owned by the update. Packages and
//! releases are referenced by name, which is their stable identifier, so the
//! aggregate never embeds another entity.

use serde::{Deserialize, Serialize};

use crate::enums::{
    TestGatingStatus, UpdateRequest, UpdateSeverity, UpdateStatus, UpdateSuggestion, UpdateType,
};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// NVR
// ---------------------------------------------------------------------------

/// A parsed `name-version-release` build identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nvr<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub release: &'a str,
}

impl<'a> Nvr<'a> {
    /// Split an NVR from the right. Package names may contain dashes, versions
    /// and releases may not.
    pub fn parse(nvr: &'a str) -> Result<Self, CoreError> {
        let mut parts = nvr.rsplitn(3, '-');
        let release = parts.next().unwrap_or_default();
        let version = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default();

        if name.is_empty() || version.is_empty() || release.is_empty() {
            return Err(CoreError::Validation(format!(
                "Invalid build '{nvr}'. Expected name-version-release"
            )));
        }
        Ok(Self {
            name,
            version,
            release,
        })
    }
}

// ---------------------------------------------------------------------------
// Value objects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub nvr: String,
    /// Name of the package this build belongs to.
    pub package: String,
}

impl Build {
    /// Build a value object from an NVR, deriving the package name.
    pub fn from_nvr(nvr: &str) -> Result<Self, CoreError> {
        let parsed = Nvr::parse(nvr)?;
        Ok(Self {
            nvr: nvr.to_string(),
            package: parsed.name.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bug {
    pub bug_id: i64,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cve {
    pub cve_id: String,
}

/// One entry in an update's append-only audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub text: String,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: DbId,
    /// Short name, e.g. `F30`. Unique.
    pub name: String,
    pub long_name: String,
    /// Numeric version used for ordering.
    pub version: i32,
    /// Prefix used when generating update aliases, e.g. `FEDORA`.
    pub id_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: DbId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// The root entity: a proposed package change moving through a release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub id: DbId,
    pub alias: String,
    pub title: String,
    pub status: UpdateStatus,
    pub request: UpdateRequest,
    pub locked: bool,
    pub pushed: bool,
    #[serde(rename = "type")]
    pub update_type: UpdateType,
    pub severity: UpdateSeverity,
    pub suggest: UpdateSuggestion,
    pub notes: String,
    /// Username of the submitter.
    pub user: String,
    /// Release name.
    pub release: String,
    pub critpath: bool,
    pub karma: i32,
    pub test_gating_status: TestGatingStatus,
    pub date_submitted: Timestamp,
    pub date_modified: Option<Timestamp>,
    pub date_approved: Option<Timestamp>,
    pub date_pushed: Option<Timestamp>,
    pub builds: Vec<Build>,
    pub bugs: Vec<Bug>,
    pub cves: Vec<Cve>,
    pub comments: Vec<Comment>,
}

impl Update {
    /// Whether `ident` names this update by numeric id, alias, or title.
    pub fn is_identified_by(&self, ident: &str) -> bool {
        self.alias == ident || self.title == ident || ident.parse::<DbId>() == Ok(self.id)
    }

    /// Distinct package names across all builds, in build order.
    pub fn package_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for build in &self.builds {
            if !names.contains(&build.package) {
                names.push(build.package.clone());
            }
        }
        names
    }

    /// Whether this update carries a build of `package`.
    pub fn has_package(&self, package: &str) -> bool {
        self.builds.iter().any(|b| b.package == package)
    }

    /// Whole days spent in testing as of `now`.
    ///
    /// Counts from `date_pushed` while the update sits in `testing`; any other
    /// status counts as zero days.
    pub fn days_in_testing(&self, now: Timestamp) -> i64 {
        match (self.status, self.date_pushed) {
            (UpdateStatus::Testing, Some(pushed)) if now > pushed => (now - pushed).num_days(),
            _ => 0,
        }
    }
}

/// Title of an update: its build NVRs joined by spaces.
pub fn title_for(builds: &[Build]) -> String {
    builds
        .iter()
        .map(|b| b.nvr.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove duplicate builds by NVR, keeping first occurrences.
pub fn dedup_builds(builds: Vec<Build>) -> Vec<Build> {
    let mut out: Vec<Build> = Vec::with_capacity(builds.len());
    for build in builds {
        if !out.iter().any(|b| b.nvr == build.nvr) {
            out.push(build);
        }
    }
    out
}

/// Remove duplicate bugs by bug id, keeping first occurrences.
pub fn dedup_bugs(bugs: Vec<Bug>) -> Vec<Bug> {
    let mut out: Vec<Bug> = Vec::with_capacity(bugs.len());
    for bug in bugs {
        if !out.iter().any(|b| b.bug_id == bug.bug_id) {
            out.push(bug);
        }
    }
    out
}

/// Remove duplicate CVEs by identifier, keeping first occurrences.
pub fn dedup_cves(cves: Vec<Cve>) -> Vec<Cve> {
    let mut out: Vec<Cve> = Vec::with_capacity(cves.len());
    for cve in cves {
        if !out.iter().any(|c| c.cve_id == cve.cve_id) {
            out.push(cve);
        }
    }
    out
}
