//! Update query, filter and pagination engine.
//!
//! [`UpdateFilter`] accumulates one typed [`Predicate`] per supplied filter
//! value. Predicates evaluate in memory via [`Predicate::matches`]; the
//! database layer compiles the same list into SQL. Filters combine with AND;
//! the values inside one multi-value filter combine with OR.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::enums::{UpdateRequest, UpdateSeverity, UpdateStatus, UpdateSuggestion, UpdateType};
use crate::error::CoreError;
use crate::model::Update;
use crate::types::Timestamp;

/// Default page size at the HTTP boundary.
pub const DEFAULT_ROWS_PER_PAGE: i64 = 20;

/// Largest page size accepted at the HTTP boundary.
pub const MAX_ROWS_PER_PAGE: i64 = 100;

// ---------------------------------------------------------------------------
// Query input
// ---------------------------------------------------------------------------

/// Validated list filters. Every field is optional; an absent field filters
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UpdateQuery {
    pub approved_since: Option<Timestamp>,
    pub bugs: Option<Vec<i64>>,
    pub critpath: Option<bool>,
    pub cves: Option<Vec<String>>,
    pub like: Option<String>,
    pub locked: Option<bool>,
    pub modified_since: Option<Timestamp>,
    pub packages: Option<Vec<String>>,
    pub builds: Option<Vec<String>>,
    pub pushed: Option<bool>,
    pub pushed_since: Option<Timestamp>,
    pub releases: Option<Vec<String>>,
    /// Singular legacy alias of `releases`. When both are given they are
    /// ANDed, not merged.
    pub release: Option<String>,
    pub request: Option<UpdateRequest>,
    pub severity: Option<UpdateSeverity>,
    pub status: Option<UpdateStatus>,
    pub submitted_since: Option<Timestamp>,
    pub suggest: Option<UpdateSuggestion>,
    #[serde(rename = "type")]
    pub update_type: Option<UpdateType>,
    pub user: Option<String>,
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// One filter condition over updates.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    ApprovedSince(Timestamp),
    /// Any of these bug ids is attached.
    Bugs(Vec<i64>),
    Critpath(bool),
    /// Any of these CVE ids is attached.
    Cves(Vec<String>),
    /// Literal substring of the title.
    TitleLike(String),
    Locked(bool),
    ModifiedSince(Timestamp),
    /// Any build belongs to one of these packages.
    Packages(Vec<String>),
    /// Any build has one of these NVRs.
    Builds(Vec<String>),
    Pushed(bool),
    PushedSince(Timestamp),
    /// Release is one of these names.
    Releases(Vec<String>),
    Release(String),
    Request(UpdateRequest),
    Severity(UpdateSeverity),
    Status(UpdateStatus),
    SubmittedSince(Timestamp),
    Suggest(UpdateSuggestion),
    Type(UpdateType),
    User(String),
}

fn since(value: Option<Timestamp>, bound: Timestamp) -> bool {
    value.is_some_and(|v| v >= bound)
}

impl Predicate {
    pub fn matches(&self, update: &Update) -> bool {
        match self {
            Self::ApprovedSince(t) => since(update.date_approved, *t),
            Self::Bugs(ids) => update.bugs.iter().any(|b| ids.contains(&b.bug_id)),
            Self::Critpath(v) => update.critpath == *v,
            Self::Cves(ids) => update.cves.iter().any(|c| ids.contains(&c.cve_id)),
            Self::TitleLike(s) => update.title.contains(s.as_str()),
            Self::Locked(v) => update.locked == *v,
            Self::ModifiedSince(t) => since(update.date_modified, *t),
            Self::Packages(names) => update.builds.iter().any(|b| names.contains(&b.package)),
            Self::Builds(nvrs) => update.builds.iter().any(|b| nvrs.contains(&b.nvr)),
            Self::Pushed(v) => update.pushed == *v,
            Self::PushedSince(t) => since(update.date_pushed, *t),
            Self::Releases(names) => names.contains(&update.release),
            Self::Release(name) => update.release == *name,
            Self::Request(r) => update.request == *r,
            Self::Severity(s) => update.severity == *s,
            Self::Status(s) => update.status == *s,
            Self::SubmittedSince(t) => update.date_submitted >= *t,
            Self::Suggest(s) => update.suggest == *s,
            Self::Type(t) => update.update_type == *t,
            Self::User(u) => update.user == *u,
        }
    }
}

// ---------------------------------------------------------------------------
// Filter builder
// ---------------------------------------------------------------------------

/// A conjunction of predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateFilter {
    predicates: Vec<Predicate>,
}

impl UpdateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate.
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    fn push_if<T>(&mut self, value: &Option<T>, make: impl FnOnce(T) -> Predicate)
    where
        T: Clone,
    {
        if let Some(v) = value {
            self.predicates.push(make(v.clone()));
        }
    }

    /// Build one predicate per filter present in `query`.
    pub fn from_query(query: &UpdateQuery) -> Self {
        let mut filter = Self::new();
        filter.push_if(&query.approved_since, Predicate::ApprovedSince);
        filter.push_if(&query.bugs, Predicate::Bugs);
        filter.push_if(&query.critpath, Predicate::Critpath);
        filter.push_if(&query.cves, Predicate::Cves);
        filter.push_if(&query.like, Predicate::TitleLike);
        filter.push_if(&query.locked, Predicate::Locked);
        filter.push_if(&query.modified_since, Predicate::ModifiedSince);
        filter.push_if(&query.packages, Predicate::Packages);
        filter.push_if(&query.builds, Predicate::Builds);
        filter.push_if(&query.pushed, Predicate::Pushed);
        filter.push_if(&query.pushed_since, Predicate::PushedSince);
        filter.push_if(&query.releases, Predicate::Releases);
        filter.push_if(&query.release, Predicate::Release);
        filter.push_if(&query.request, Predicate::Request);
        filter.push_if(&query.severity, Predicate::Severity);
        filter.push_if(&query.status, Predicate::Status);
        filter.push_if(&query.submitted_since, Predicate::SubmittedSince);
        filter.push_if(&query.suggest, Predicate::Suggest);
        filter.push_if(&query.update_type, Predicate::Type);
        filter.push_if(&query.user, Predicate::User);
        filter
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Whether `update` satisfies every predicate.
    pub fn matches(&self, update: &Update) -> bool {
        self.predicates.iter().all(|p| p.matches(update))
    }
}

// ---------------------------------------------------------------------------
// Ordering and pagination
// ---------------------------------------------------------------------------

/// Result ordering: newest submission first, id descending as tie-break.
pub fn newest_first(a: &Update, b: &Update) -> Ordering {
    b.date_submitted
        .cmp(&a.date_submitted)
        .then(b.id.cmp(&a.id))
}

/// A 1-indexed page request. Out-of-range pages are not an error; they
/// yield no items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    page: i64,
    rows_per_page: i64,
}

impl PageRequest {
    pub fn new(page: i64, rows_per_page: i64) -> Result<Self, CoreError> {
        if page < 1 {
            return Err(CoreError::Validation(format!(
                "page must be a positive integer, got {page}"
            )));
        }
        if rows_per_page < 1 {
            return Err(CoreError::Validation(format!(
                "rows_per_page must be a positive integer, got {rows_per_page}"
            )));
        }
        Ok(Self {
            page,
            rows_per_page,
        })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn rows_per_page(&self) -> i64 {
        self.rows_per_page
    }

    /// Rows skipped before this page. Saturates at `i64::MAX` for pages far
    /// past any real result set.
    pub fn offset(&self) -> i64 {
        self.rows_per_page.saturating_mul(self.page - 1)
    }

    /// Whether this page starts at or beyond the last of `total` rows.
    pub fn is_past_end(&self, total: i64) -> bool {
        self.offset() >= total
    }

    /// Number of pages needed for `total` rows.
    pub fn pages_for(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            total / self.rows_per_page + i64::from(total % self.rows_per_page != 0)
        }
    }

    /// Slice this page out of an already ordered, unpaged result.
    pub fn slice<T>(&self, rows: Vec<T>) -> Vec<T> {
        if self.is_past_end(rows.len() as i64) {
            return Vec::new();
        }
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.rows_per_page).unwrap_or(usize::MAX);
        rows.into_iter().skip(offset).take(limit).collect()
    }
}

/// One page of results with pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub pages: i64,
    pub rows_per_page: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            page: request.page(),
            pages: request.pages_for(total),
            rows_per_page: request.rows_per_page(),
            total,
        }
    }
}
