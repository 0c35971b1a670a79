//! Repository for the `bugs` and `update_bugs` tables.

use relflow_core::model::Bug;
use relflow_core::types::DbId;
use sqlx::PgConnection;

use crate::models::update::BugRow;

pub struct BugRepo;

impl BugRepo {
    pub async fn list_for_updates(
        conn: &mut PgConnection,
        update_ids: &[DbId],
    ) -> Result<Vec<BugRow>, sqlx::Error> {
        sqlx::query_as::<_, BugRow>(
            "SELECT ub.update_id, b.bug_id, b.title \
             FROM update_bugs ub JOIN bugs b ON b.bug_id = ub.bug_id \
             WHERE ub.update_id = ANY($1) \
             ORDER BY ub.update_id, b.bug_id",
        )
        .bind(update_ids)
        .fetch_all(conn)
        .await
    }

    /// Replace the bug links of `update_id` with `bugs`.
    pub async fn replace_for_update(
        conn: &mut PgConnection,
        update_id: DbId,
        bugs: &[Bug],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM update_bugs WHERE update_id = $1")
            .bind(update_id)
            .execute(&mut *conn)
            .await?;

        for bug in bugs {
            sqlx::query(
                "INSERT INTO bugs (bug_id, title) VALUES ($1, $2) \
                 ON CONFLICT (bug_id) DO UPDATE SET title = COALESCE(EXCLUDED.title, bugs.title)",
            )
            .bind(bug.bug_id)
            .bind(&bug.title)
            .execute(&mut *conn)
            .await?;
            sqlx::query("INSERT INTO update_bugs (update_id, bug_id) VALUES ($1, $2)")
                .bind(update_id)
                .bind(bug.bug_id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}
