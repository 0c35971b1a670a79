//! Repository for the `builds` table.

use relflow_core::model::Build;
use relflow_core::types::DbId;
use sqlx::PgConnection;

use crate::models::update::BuildRow;
use crate::repositories::PackageRepo;

pub struct BuildRepo;

impl BuildRepo {
    /// Builds of the given updates, in each update's build order.
    pub async fn list_for_updates(
        conn: &mut PgConnection,
        update_ids: &[DbId],
    ) -> Result<Vec<BuildRow>, sqlx::Error> {
        sqlx::query_as::<_, BuildRow>(
            "SELECT b.update_id, b.nvr, p.name AS package \
             FROM builds b JOIN packages p ON p.id = b.package_id \
             WHERE b.update_id = ANY($1) \
             ORDER BY b.update_id, b.position, b.id",
        )
        .bind(update_ids)
        .fetch_all(conn)
        .await
    }

    /// Make `builds` exactly the builds of `update_id`.
    ///
    /// Builds no longer listed are detached, not deleted. A listed build that
    /// already exists is re-attached here.
    pub async fn replace_for_update(
        conn: &mut PgConnection,
        update_id: DbId,
        builds: &[Build],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE builds SET update_id = NULL WHERE update_id = $1")
            .bind(update_id)
            .execute(&mut *conn)
            .await?;

        for (position, build) in builds.iter().enumerate() {
            let package_id = PackageRepo::ensure(&mut *conn, &build.package).await?;
            sqlx::query(
                "INSERT INTO builds (nvr, package_id, update_id, position) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (nvr) DO UPDATE \
                 SET update_id = EXCLUDED.update_id, position = EXCLUDED.position",
            )
            .bind(&build.nvr)
            .bind(package_id)
            .bind(update_id)
            .bind(position as i32)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}
