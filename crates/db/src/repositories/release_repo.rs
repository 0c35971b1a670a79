//! Repository for the `releases` table.

use sqlx::PgConnection;

use crate::models::release::ReleaseRow;

const COLUMNS: &str = "id, name, long_name, version, id_prefix";

pub struct ReleaseRepo;

impl ReleaseRepo {
    pub async fn find_by_name(
        conn: &mut PgConnection,
        name: &str,
    ) -> Result<Option<ReleaseRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM releases WHERE name = $1");
        sqlx::query_as::<_, ReleaseRow>(&query)
            .bind(name)
            .fetch_optional(conn)
            .await
    }

    /// All releases, oldest version first.
    pub async fn list(conn: &mut PgConnection) -> Result<Vec<ReleaseRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM releases ORDER BY version ASC, name ASC");
        sqlx::query_as::<_, ReleaseRow>(&query).fetch_all(conn).await
    }
}
