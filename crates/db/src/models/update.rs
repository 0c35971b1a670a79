//! Update rows and their collection rows.

use relflow_core::enums::{
    TestGatingStatus, UpdateRequest, UpdateSeverity, UpdateStatus, UpdateSuggestion, UpdateType,
};
use relflow_core::model::{Bug, Build, Comment, Cve, Update};
use relflow_core::store::TypeCount;
use relflow_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use crate::error::StoreError;

/// A row from `updates` joined with its release name.
#[derive(Debug, Clone, FromRow)]
pub struct UpdateRow {
    pub id: DbId,
    pub alias: String,
    pub title: String,
    pub status: String,
    pub request: String,
    pub locked: bool,
    pub pushed: bool,
    pub update_type: String,
    pub severity: String,
    pub suggest: String,
    pub notes: String,
    pub submitter: String,
    pub release_id: DbId,
    pub release_name: String,
    pub critpath: bool,
    pub karma: i32,
    pub test_gating_status: String,
    pub date_submitted: Timestamp,
    pub date_modified: Option<Timestamp>,
    pub date_approved: Option<Timestamp>,
    pub date_pushed: Option<Timestamp>,
}

/// A build attached to an update, with its package name.
#[derive(Debug, Clone, FromRow)]
pub struct BuildRow {
    pub update_id: DbId,
    pub nvr: String,
    pub package: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct BugRow {
    pub update_id: DbId,
    pub bug_id: i64,
    pub title: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CveRow {
    pub update_id: DbId,
    pub cve_id: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub update_id: DbId,
    pub author: String,
    pub text: String,
    pub timestamp: Timestamp,
}

/// One `(release, type)` bucket from the metrics aggregate.
#[derive(Debug, Clone, FromRow)]
pub struct TypeCountRow {
    pub release: String,
    pub update_type: String,
    pub count: i64,
}

impl TryFrom<TypeCountRow> for TypeCount {
    type Error = StoreError;

    fn try_from(row: TypeCountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            update_type: parse("updates", &row.update_type, UpdateType::from_str_value)?,
            release: row.release,
            count: row.count,
        })
    }
}

/// Collections loaded separately for a batch of updates.
#[derive(Debug, Default)]
pub struct UpdateCollections {
    pub builds: Vec<BuildRow>,
    pub bugs: Vec<BugRow>,
    pub cves: Vec<CveRow>,
    pub comments: Vec<CommentRow>,
}

fn parse<T, E>(table: &'static str, raw: &str, f: fn(&str) -> Result<T, E>) -> Result<T, StoreError>
where
    E: std::fmt::Display,
{
    f(raw).map_err(|e| StoreError::Corrupt {
        table,
        detail: e.to_string(),
    })
}

impl UpdateRow {
    /// Assemble the aggregate from this row and the rows of `collections`
    /// that belong to it. Collection rows are expected in display order.
    pub fn into_update(self, collections: &UpdateCollections) -> Result<Update, StoreError> {
        let id = self.id;
        Ok(Update {
            id,
            alias: self.alias,
            title: self.title,
            status: parse("updates", &self.status, UpdateStatus::from_str_value)?,
            request: parse("updates", &self.request, UpdateRequest::from_str_value)?,
            locked: self.locked,
            pushed: self.pushed,
            update_type: parse("updates", &self.update_type, UpdateType::from_str_value)?,
            severity: parse("updates", &self.severity, UpdateSeverity::from_str_value)?,
            suggest: parse("updates", &self.suggest, UpdateSuggestion::from_str_value)?,
            notes: self.notes,
            user: self.submitter,
            release: self.release_name,
            critpath: self.critpath,
            karma: self.karma,
            test_gating_status: parse(
                "updates",
                &self.test_gating_status,
                TestGatingStatus::from_str_value,
            )?,
            date_submitted: self.date_submitted,
            date_modified: self.date_modified,
            date_approved: self.date_approved,
            date_pushed: self.date_pushed,
            builds: collections
                .builds
                .iter()
                .filter(|b| b.update_id == id)
                .map(|b| Build {
                    nvr: b.nvr.clone(),
                    package: b.package.clone(),
                })
                .collect(),
            bugs: collections
                .bugs
                .iter()
                .filter(|b| b.update_id == id)
                .map(|b| Bug {
                    bug_id: b.bug_id,
                    title: b.title.clone(),
                })
                .collect(),
            cves: collections
                .cves
                .iter()
                .filter(|c| c.update_id == id)
                .map(|c| Cve {
                    cve_id: c.cve_id.clone(),
                })
                .collect(),
            comments: collections
                .comments
                .iter()
                .filter(|c| c.update_id == id)
                .map(|c| Comment {
                    author: c.author.clone(),
                    text: c.text.clone(),
                    timestamp: c.timestamp,
                })
                .collect(),
        })
    }
}
