//! Repository for the `packages` table.

use relflow_core::types::DbId;
use sqlx::PgConnection;

pub struct PackageRepo;

impl PackageRepo {
    /// Id of the package named `name`, creating it on first use.
    pub async fn ensure(conn: &mut PgConnection, name: &str) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO packages (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING id",
        )
        .bind(name)
        .fetch_one(conn)
        .await
    }
}
