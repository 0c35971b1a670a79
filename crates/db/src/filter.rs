//! Compilation of typed update predicates into a parameterized `WHERE`.
//!
//! Queries alias `updates` as `u` and `releases` as `r`. Membership
//! predicates use `EXISTS` sub-selects so a matching update is returned once
//! no matter how many of its builds, bugs or CVEs match.

use relflow_core::query::{Predicate, UpdateFilter};
use relflow_core::types::Timestamp;

/// A typed value bound to a positional `$n` parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    BigIntArray(Vec<i64>),
    Bool(bool),
    Text(String),
    TextArray(Vec<String>),
    Timestamp(Timestamp),
}

/// Escape `LIKE` metacharacters so `value` matches literally.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build the `WHERE` clause for `filter`.
///
/// Returns the clause (empty when there are no predicates), the values to
/// bind in order, and the next free parameter index.
pub fn build_update_filter(filter: &UpdateFilter) -> (String, Vec<BindValue>, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_idx = 1u32;
    let mut bind_values: Vec<BindValue> = Vec::new();

    for predicate in filter.predicates() {
        let (template, value) = compile(predicate);
        conditions.push(template.replace("$?", &format!("${bind_idx}")));
        bind_idx += 1;
        bind_values.push(value);
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (where_clause, bind_values, bind_idx)
}

/// One predicate as a condition template with a single `$?` placeholder.
fn compile(predicate: &Predicate) -> (&'static str, BindValue) {
    match predicate {
        Predicate::ApprovedSince(t) => ("u.date_approved >= $?", BindValue::Timestamp(*t)),
        Predicate::Bugs(ids) => (
            "EXISTS (SELECT 1 FROM update_bugs ub \
             WHERE ub.update_id = u.id AND ub.bug_id = ANY($?))",
            BindValue::BigIntArray(ids.clone()),
        ),
        Predicate::Critpath(v) => ("u.critpath = $?", BindValue::Bool(*v)),
        Predicate::Cves(ids) => (
            "EXISTS (SELECT 1 FROM update_cves uc \
             WHERE uc.update_id = u.id AND uc.cve_id = ANY($?))",
            BindValue::TextArray(ids.clone()),
        ),
        Predicate::TitleLike(s) => (
            "u.title LIKE $? ESCAPE '\\'",
            BindValue::Text(format!("%{}%", escape_like(s))),
        ),
        Predicate::Locked(v) => ("u.locked = $?", BindValue::Bool(*v)),
        Predicate::ModifiedSince(t) => ("u.date_modified >= $?", BindValue::Timestamp(*t)),
        Predicate::Packages(names) => (
            "EXISTS (SELECT 1 FROM builds b JOIN packages p ON p.id = b.package_id \
             WHERE b.update_id = u.id AND p.name = ANY($?))",
            BindValue::TextArray(names.clone()),
        ),
        Predicate::Builds(nvrs) => (
            "EXISTS (SELECT 1 FROM builds b \
             WHERE b.update_id = u.id AND b.nvr = ANY($?))",
            BindValue::TextArray(nvrs.clone()),
        ),
        Predicate::Pushed(v) => ("u.pushed = $?", BindValue::Bool(*v)),
        Predicate::PushedSince(t) => ("u.date_pushed >= $?", BindValue::Timestamp(*t)),
        Predicate::Releases(names) => ("r.name = ANY($?)", BindValue::TextArray(names.clone())),
        Predicate::Release(name) => ("r.name = $?", BindValue::Text(name.clone())),
        Predicate::Request(r) => ("u.request = $?", BindValue::Text(r.as_str().to_string())),
        Predicate::Severity(s) => ("u.severity = $?", BindValue::Text(s.as_str().to_string())),
        Predicate::Status(s) => ("u.status = $?", BindValue::Text(s.as_str().to_string())),
        Predicate::SubmittedSince(t) => ("u.date_submitted >= $?", BindValue::Timestamp(*t)),
        Predicate::Suggest(s) => ("u.suggest = $?", BindValue::Text(s.as_str().to_string())),
        Predicate::Type(t) => ("u.update_type = $?", BindValue::Text(t.as_str().to_string())),
        Predicate::User(name) => ("u.submitter = $?", BindValue::Text(name.clone())),
    }
}

/// Bind a slice of `BindValue` to a sqlx `QueryAs`.
pub fn bind_values<'q, O>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigIntArray(v) => q = q.bind(v.as_slice()),
            BindValue::Bool(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::TextArray(v) => q = q.bind(v.as_slice()),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}

/// Bind a slice of `BindValue` to a sqlx `QueryScalar`.
pub fn bind_values_scalar<'q>(
    mut q: sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments>,
    bind_values: &'q [BindValue],
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, i64, sqlx::postgres::PgArguments> {
    for val in bind_values {
        match val {
            BindValue::BigIntArray(v) => q = q.bind(v.as_slice()),
            BindValue::Bool(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::TextArray(v) => q = q.bind(v.as_slice()),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}
