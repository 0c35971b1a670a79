//! Release rows.

use relflow_core::model::Release;
use relflow_core::types::DbId;
use sqlx::FromRow;

/// A row from the `releases` table.
#[derive(Debug, Clone, FromRow)]
pub struct ReleaseRow {
    pub id: DbId,
    pub name: String,
    pub long_name: String,
    pub version: i32,
    pub id_prefix: String,
}

impl From<ReleaseRow> for Release {
    fn from(row: ReleaseRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            long_name: row.long_name,
            version: row.version,
            id_prefix: row.id_prefix,
        }
    }
}
