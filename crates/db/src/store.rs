//! PostgreSQL implementation of the update store.

use async_trait::async_trait;
use relflow_core::enums::UpdateStatus;
use relflow_core::error::CoreError;
use relflow_core::model::{Release, Update};
use relflow_core::query::{PageRequest, UpdateFilter};
use relflow_core::store::{Mutation, Outcome, Revision, TypeCount, UpdateStore};
use relflow_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::error::StoreError;
use crate::models::update::{UpdateCollections, UpdateRow};
use crate::repositories::{
    BugRepo, BuildRepo, CommentRepo, CveRepo, ReleaseRepo, UpdateRepo,
};

/// [`UpdateStore`] over a connection pool.
///
/// `modify` runs inside a transaction holding `SELECT ... FOR UPDATE` on the
/// update row, so concurrent check-then-act sequences on one update serialize.
#[derive(Clone)]
pub struct PgUpdateStore {
    pool: PgPool,
}

impl PgUpdateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Load the collections for `rows` and assemble the aggregates.
async fn hydrate(conn: &mut PgConnection, rows: Vec<UpdateRow>) -> Result<Vec<Update>, StoreError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<DbId> = rows.iter().map(|r| r.id).collect();
    let collections = UpdateCollections {
        builds: BuildRepo::list_for_updates(&mut *conn, &ids).await?,
        bugs: BugRepo::list_for_updates(&mut *conn, &ids).await?,
        cves: CveRepo::list_for_updates(&mut *conn, &ids).await?,
        comments: CommentRepo::list_for_updates(&mut *conn, &ids).await?,
    };
    rows.into_iter()
        .map(|row| row.into_update(&collections))
        .collect()
}

async fn hydrate_one(conn: &mut PgConnection, row: UpdateRow) -> Result<Update, StoreError> {
    let mut updates = hydrate(conn, vec![row]).await?;
    updates.pop().ok_or_else(|| StoreError::Corrupt {
        table: "updates",
        detail: "row vanished during load".into(),
    })
}

/// Write the collections and audit comment of `revision` for `update_id`.
async fn write_children(
    conn: &mut PgConnection,
    update_id: DbId,
    revision: &Revision,
) -> Result<(), StoreError> {
    BuildRepo::replace_for_update(&mut *conn, update_id, &revision.update.builds).await?;
    BugRepo::replace_for_update(&mut *conn, update_id, &revision.update.bugs).await?;
    CveRepo::replace_for_update(&mut *conn, update_id, &revision.update.cves).await?;
    CommentRepo::append(&mut *conn, update_id, &revision.comment).await?;
    Ok(())
}

impl PgUpdateStore {
    async fn find_inner(&self, ident: &str) -> Result<Option<Update>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        match UpdateRepo::find_by_ident(&mut conn, ident).await? {
            Some(row) => Ok(Some(hydrate_one(&mut conn, row).await?)),
            None => Ok(None),
        }
    }

    async fn list_inner(
        &self,
        filter: &UpdateFilter,
        page: PageRequest,
    ) -> Result<(Vec<Update>, i64), StoreError> {
        let mut conn = self.pool.acquire().await?;
        let total = UpdateRepo::count(&mut conn, filter).await?;
        if page.is_past_end(total) {
            return Ok((Vec::new(), total));
        }
        let rows = UpdateRepo::list(&mut conn, filter, page).await?;
        Ok((hydrate(&mut conn, rows).await?, total))
    }

    async fn insert_inner(&self, revision: Revision) -> Result<Update, StoreError> {
        let mut tx = self.pool.begin().await?;

        let release = ReleaseRepo::find_by_name(&mut tx, &revision.update.release)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Release",
                id: revision.update.release.clone(),
            })?;
        let id = UpdateRepo::insert(&mut tx, &revision.update, release.id).await?;
        write_children(&mut tx, id, &revision).await?;

        let row = UpdateRepo::find_by_ident(&mut tx, &id.to_string())
            .await?
            .ok_or_else(|| CoreError::update_not_found(id.to_string()))?;
        let created = hydrate_one(&mut tx, row).await?;

        tx.commit().await?;
        tracing::debug!(update = %created.alias, id, "Inserted update");
        Ok(created)
    }

    async fn modify_inner(
        &self,
        ident: &str,
        mutation: Mutation,
    ) -> Result<Option<Update>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = UpdateRepo::lock_by_ident(&mut tx, ident)
            .await?
            .ok_or_else(|| CoreError::update_not_found(ident))?;
        let current = hydrate_one(&mut tx, row).await?;

        // Dropping the transaction rolls back and releases the row lock.
        let revision = match mutation(&current)? {
            Outcome::Write(revision) => revision,
            Outcome::Skip => return Ok(None),
        };

        let mut next = revision.update.clone();
        next.id = current.id;
        UpdateRepo::save_fields(&mut tx, &next).await?;
        write_children(&mut tx, current.id, &revision).await?;

        let row = UpdateRepo::find_by_ident(&mut tx, &current.id.to_string())
            .await?
            .ok_or_else(|| CoreError::update_not_found(ident))?;
        let written = hydrate_one(&mut tx, row).await?;

        tx.commit().await?;
        Ok(Some(written))
    }

    async fn find_related_inner(
        &self,
        release: &str,
        packages: &[String],
        exclude: DbId,
    ) -> Result<Vec<Update>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let rows = UpdateRepo::find_related(&mut conn, release, packages, exclude).await?;
        hydrate(&mut conn, rows).await
    }
}

#[async_trait]
impl UpdateStore for PgUpdateStore {
    async fn find(&self, ident: &str) -> Result<Option<Update>, CoreError> {
        Ok(self.find_inner(ident).await?)
    }

    async fn list(
        &self,
        filter: &UpdateFilter,
        page: PageRequest,
    ) -> Result<(Vec<Update>, i64), CoreError> {
        Ok(self.list_inner(filter, page).await?)
    }

    async fn insert(&self, revision: Revision) -> Result<Update, CoreError> {
        Ok(self.insert_inner(revision).await?)
    }

    async fn modify(&self, ident: &str, mutation: Mutation) -> Result<Option<Update>, CoreError> {
        Ok(self.modify_inner(ident, mutation).await?)
    }

    async fn find_related(
        &self,
        release: &str,
        packages: &[String],
        exclude: DbId,
    ) -> Result<Vec<Update>, CoreError> {
        Ok(self.find_related_inner(release, packages, exclude).await?)
    }

    async fn find_release(&self, name: &str) -> Result<Option<Release>, CoreError> {
        let mut conn = self.pool.acquire().await.map_err(StoreError::from)?;
        let row = ReleaseRepo::find_by_name(&mut conn, name)
            .await
            .map_err(StoreError::from)?;
        Ok(row.map(Release::from))
    }

    async fn list_releases(&self) -> Result<Vec<Release>, CoreError> {
        let mut conn = self.pool.acquire().await.map_err(StoreError::from)?;
        let rows = ReleaseRepo::list(&mut conn).await.map_err(StoreError::from)?;
        Ok(rows.into_iter().map(Release::from).collect())
    }

    async fn count_by_release_and_type(
        &self,
        status: UpdateStatus,
    ) -> Result<Vec<TypeCount>, CoreError> {
        let mut conn = self.pool.acquire().await.map_err(StoreError::from)?;
        let rows = UpdateRepo::count_by_release_and_type(&mut conn, status)
            .await
            .map_err(StoreError::from)?;
        let counts = rows
            .into_iter()
            .map(TypeCount::try_from)
            .collect::<Result<Vec<_>, StoreError>>()?;
        Ok(counts)
    }
}
