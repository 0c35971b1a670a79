//! Repository for the `updates` table.

use relflow_core::enums::UpdateStatus;
use relflow_core::model::Update;
use relflow_core::query::{PageRequest, UpdateFilter};
use relflow_core::types::DbId;
use sqlx::PgConnection;

use crate::filter::{bind_values, bind_values_scalar, build_update_filter};
use crate::models::update::{TypeCountRow, UpdateRow};

/// Column list for SELECTs over `updates u JOIN releases r`.
const COLUMNS: &str = "\
    u.id, u.alias, u.title, u.status, u.request, u.locked, u.pushed, \
    u.update_type, u.severity, u.suggest, u.notes, u.submitter, \
    u.release_id, r.name AS release_name, u.critpath, u.karma, \
    u.test_gating_status, u.date_submitted, u.date_modified, \
    u.date_approved, u.date_pushed";

const FROM: &str = "FROM updates u JOIN releases r ON r.id = u.release_id";

/// Matches an update by alias, title, or numeric id (`$1` text, `$2` id).
const IDENT_MATCH: &str = "(u.alias = $1 OR u.title = $1 OR u.id = $2)";

pub struct UpdateRepo;

impl UpdateRepo {
    pub async fn find_by_ident(
        conn: &mut PgConnection,
        ident: &str,
    ) -> Result<Option<UpdateRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} {FROM} WHERE {IDENT_MATCH} ORDER BY u.id LIMIT 1");
        sqlx::query_as::<_, UpdateRow>(&query)
            .bind(ident)
            .bind(ident.parse::<DbId>().ok())
            .fetch_optional(conn)
            .await
    }

    /// Same as [`Self::find_by_ident`] but takes a row lock on the update
    /// until the surrounding transaction ends.
    pub async fn lock_by_ident(
        conn: &mut PgConnection,
        ident: &str,
    ) -> Result<Option<UpdateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} {FROM} WHERE {IDENT_MATCH} ORDER BY u.id LIMIT 1 FOR UPDATE OF u"
        );
        sqlx::query_as::<_, UpdateRow>(&query)
            .bind(ident)
            .bind(ident.parse::<DbId>().ok())
            .fetch_optional(conn)
            .await
    }

    /// One page of updates matching `filter`, newest submission first.
    pub async fn list(
        conn: &mut PgConnection,
        filter: &UpdateFilter,
        page: PageRequest,
    ) -> Result<Vec<UpdateRow>, sqlx::Error> {
        let (where_clause, values, bind_idx) = build_update_filter(filter);
        let query = format!(
            "SELECT {COLUMNS} {FROM} {where_clause} \
             ORDER BY u.date_submitted DESC, u.id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1
        );
        bind_values(sqlx::query_as::<_, UpdateRow>(&query), &values)
            .bind(page.rows_per_page())
            .bind(page.offset())
            .fetch_all(conn)
            .await
    }

    /// Number of updates matching `filter`, ignoring pagination.
    pub async fn count(conn: &mut PgConnection, filter: &UpdateFilter) -> Result<i64, sqlx::Error> {
        let (where_clause, values, _) = build_update_filter(filter);
        let query = format!("SELECT COUNT(*)::BIGINT AS count {FROM} {where_clause}");
        bind_values_scalar(sqlx::query_scalar::<_, i64>(&query), &values)
            .fetch_one(conn)
            .await
    }

    /// Updates in `release` with a build of any of `packages`, except `exclude`.
    pub async fn find_related(
        conn: &mut PgConnection,
        release: &str,
        packages: &[String],
        exclude: DbId,
    ) -> Result<Vec<UpdateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} {FROM} \
             WHERE r.name = $1 AND u.id <> $3 \
               AND EXISTS (SELECT 1 FROM builds b JOIN packages p ON p.id = b.package_id \
                           WHERE b.update_id = u.id AND p.name = ANY($2)) \
             ORDER BY u.date_submitted ASC, u.id ASC"
        );
        sqlx::query_as::<_, UpdateRow>(&query)
            .bind(release)
            .bind(packages)
            .bind(exclude)
            .fetch_all(conn)
            .await
    }

    /// Insert the scalar fields of `update`, returning the new id.
    pub async fn insert(
        conn: &mut PgConnection,
        update: &Update,
        release_id: DbId,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO updates \
                (alias, title, status, request, locked, pushed, update_type, severity, \
                 suggest, notes, submitter, release_id, critpath, karma, test_gating_status, \
                 date_submitted, date_modified, date_approved, date_pushed) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                     $16, $17, $18, $19) \
             RETURNING id",
        )
        .bind(&update.alias)
        .bind(&update.title)
        .bind(update.status.as_str())
        .bind(update.request.as_str())
        .bind(update.locked)
        .bind(update.pushed)
        .bind(update.update_type.as_str())
        .bind(update.severity.as_str())
        .bind(update.suggest.as_str())
        .bind(&update.notes)
        .bind(&update.user)
        .bind(release_id)
        .bind(update.critpath)
        .bind(update.karma)
        .bind(update.test_gating_status.as_str())
        .bind(update.date_submitted)
        .bind(update.date_modified)
        .bind(update.date_approved)
        .bind(update.date_pushed)
        .fetch_one(conn)
        .await
    }

    /// Write every mutable scalar field of `update`. Alias, submitter,
    /// release and submission date never change.
    pub async fn save_fields(conn: &mut PgConnection, update: &Update) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE updates SET \
                title = $2, status = $3, request = $4, locked = $5, pushed = $6, \
                update_type = $7, severity = $8, suggest = $9, notes = $10, \
                critpath = $11, karma = $12, test_gating_status = $13, \
                date_modified = $14, date_approved = $15, date_pushed = $16 \
             WHERE id = $1",
        )
        .bind(update.id)
        .bind(&update.title)
        .bind(update.status.as_str())
        .bind(update.request.as_str())
        .bind(update.locked)
        .bind(update.pushed)
        .bind(update.update_type.as_str())
        .bind(update.severity.as_str())
        .bind(update.suggest.as_str())
        .bind(&update.notes)
        .bind(update.critpath)
        .bind(update.karma)
        .bind(update.test_gating_status.as_str())
        .bind(update.date_modified)
        .bind(update.date_approved)
        .bind(update.date_pushed)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Count updates in `status` grouped by release name and type.
    pub async fn count_by_release_and_type(
        conn: &mut PgConnection,
        status: UpdateStatus,
    ) -> Result<Vec<TypeCountRow>, sqlx::Error> {
        sqlx::query_as::<_, TypeCountRow>(
            "SELECT r.name AS release, u.update_type, COUNT(*)::BIGINT AS count \
             FROM updates u JOIN releases r ON r.id = u.release_id \
             WHERE u.status = $1 \
             GROUP BY r.name, u.update_type \
             ORDER BY r.name, u.update_type",
        )
        .bind(status.as_str())
        .fetch_all(conn)
        .await
    }
}
