//! Repository for the `cves` and `update_cves` tables.

use relflow_core::model::Cve;
use relflow_core::types::DbId;
use sqlx::PgConnection;

use crate::models::update::CveRow;

pub struct CveRepo;

impl CveRepo {
    pub async fn list_for_updates(
        conn: &mut PgConnection,
        update_ids: &[DbId],
    ) -> Result<Vec<CveRow>, sqlx::Error> {
        sqlx::query_as::<_, CveRow>(
            "SELECT update_id, cve_id FROM update_cves \
             WHERE update_id = ANY($1) \
             ORDER BY update_id, cve_id",
        )
        .bind(update_ids)
        .fetch_all(conn)
        .await
    }

    /// Replace the CVE links of `update_id` with `cves`.
    pub async fn replace_for_update(
        conn: &mut PgConnection,
        update_id: DbId,
        cves: &[Cve],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM update_cves WHERE update_id = $1")
            .bind(update_id)
            .execute(&mut *conn)
            .await?;

        for cve in cves {
            sqlx::query("INSERT INTO cves (cve_id) VALUES ($1) ON CONFLICT DO NOTHING")
                .bind(&cve.cve_id)
                .execute(&mut *conn)
                .await?;
            sqlx::query("INSERT INTO update_cves (update_id, cve_id) VALUES ($1, $2)")
                .bind(update_id)
                .bind(&cve.cve_id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}
