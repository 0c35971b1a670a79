//! Query-string parsing for the update list endpoint.
//!
//! Raw parameters arrive as strings; multi-value filters are comma separated.
//! Parsing produces the typed [`UpdateQuery`] and a [`PageRequest`], or a
//! validation error naming the offending parameter.

use chrono::{DateTime, NaiveDate, Utc};
use relflow_core::enums::{UpdateRequest, UpdateSeverity, UpdateStatus, UpdateSuggestion, UpdateType};
use relflow_core::error::CoreError;
use relflow_core::query::{PageRequest, UpdateQuery, DEFAULT_ROWS_PER_PAGE, MAX_ROWS_PER_PAGE};
use relflow_core::types::Timestamp;
use serde::Deserialize;

/// `GET /updates` query parameters, before validation.
#[derive(Debug, Default, Deserialize)]
pub struct ListUpdatesParams {
    pub approved_since: Option<String>,
    pub bugs: Option<String>,
    pub critpath: Option<String>,
    pub cves: Option<String>,
    pub like: Option<String>,
    pub locked: Option<String>,
    pub modified_since: Option<String>,
    pub packages: Option<String>,
    pub builds: Option<String>,
    pub pushed: Option<String>,
    pub pushed_since: Option<String>,
    pub releases: Option<String>,
    pub release: Option<String>,
    pub request: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub submitted_since: Option<String>,
    pub suggest: Option<String>,
    #[serde(rename = "type")]
    pub update_type: Option<String>,
    pub user: Option<String>,
    pub page: Option<i64>,
    pub rows_per_page: Option<i64>,
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn invalid(name: &str, value: &str, expected: &str) -> CoreError {
    CoreError::Validation(format!("Invalid {name} '{value}': expected {expected}"))
}

fn text(raw: &Option<String>) -> Option<String> {
    present(raw).map(str::to_string)
}

fn list(raw: &Option<String>) -> Option<Vec<String>> {
    present(raw).map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    })
}

fn bug_ids(raw: &Option<String>) -> Result<Option<Vec<i64>>, CoreError> {
    list(raw)
        .map(|values| {
            values
                .iter()
                .map(|v| v.parse::<i64>().map_err(|_| invalid("bug ID", v, "an integer")))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()
}

fn boolean(name: &str, raw: &Option<String>) -> Result<Option<bool>, CoreError> {
    present(raw)
        .map(|v| match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(invalid(name, v, "true or false")),
        })
        .transpose()
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` date meaning midnight UTC.
fn timestamp(name: &str, raw: &Option<String>) -> Result<Option<Timestamp>, CoreError> {
    present(raw)
        .map(|v| {
            if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
                return Ok(dt.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
                .ok_or_else(|| invalid(name, v, "an RFC 3339 timestamp or YYYY-MM-DD date"))
        })
        .transpose()
}

fn choice<T>(
    raw: &Option<String>,
    parse: fn(&str) -> Result<T, CoreError>,
) -> Result<Option<T>, CoreError> {
    present(raw).map(parse).transpose()
}

impl ListUpdatesParams {
    /// Validate into typed filters and a page request.
    pub fn into_parts(self) -> Result<(UpdateQuery, PageRequest), CoreError> {
        let rows_per_page = self.rows_per_page.unwrap_or(DEFAULT_ROWS_PER_PAGE);
        if rows_per_page > MAX_ROWS_PER_PAGE {
            return Err(CoreError::Validation(format!(
                "rows_per_page must be at most {MAX_ROWS_PER_PAGE}, got {rows_per_page}"
            )));
        }
        let page = PageRequest::new(self.page.unwrap_or(1), rows_per_page)?;

        let query = UpdateQuery {
            approved_since: timestamp("approved_since", &self.approved_since)?,
            bugs: bug_ids(&self.bugs)?,
            critpath: boolean("critpath", &self.critpath)?,
            cves: list(&self.cves),
            like: text(&self.like),
            locked: boolean("locked", &self.locked)?,
            modified_since: timestamp("modified_since", &self.modified_since)?,
            packages: list(&self.packages),
            builds: list(&self.builds),
            pushed: boolean("pushed", &self.pushed)?,
            pushed_since: timestamp("pushed_since", &self.pushed_since)?,
            releases: list(&self.releases),
            release: text(&self.release),
            request: choice(&self.request, UpdateRequest::from_str_value)?,
            severity: choice(&self.severity, UpdateSeverity::from_str_value)?,
            status: choice(&self.status, UpdateStatus::from_str_value)?,
            submitted_since: timestamp("submitted_since", &self.submitted_since)?,
            suggest: choice(&self.suggest, UpdateSuggestion::from_str_value)?,
            update_type: choice(&self.update_type, UpdateType::from_str_value)?,
            user: text(&self.user),
        };

        Ok((query, page))
    }
}
