//! Repository for the append-only `comments` table.

use relflow_core::model::Comment;
use relflow_core::types::DbId;
use sqlx::PgConnection;

use crate::models::update::CommentRow;

pub struct CommentRepo;

impl CommentRepo {
    /// Comments of the given updates, oldest first.
    pub async fn list_for_updates(
        conn: &mut PgConnection,
        update_ids: &[DbId],
    ) -> Result<Vec<CommentRow>, sqlx::Error> {
        sqlx::query_as::<_, CommentRow>(
            "SELECT update_id, author, text, timestamp FROM comments \
             WHERE update_id = ANY($1) \
             ORDER BY update_id, id",
        )
        .bind(update_ids)
        .fetch_all(conn)
        .await
    }

    pub async fn append(
        conn: &mut PgConnection,
        update_id: DbId,
        comment: &Comment,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO comments (update_id, author, text, timestamp) VALUES ($1, $2, $3, $4)",
        )
        .bind(update_id)
        .bind(&comment.author)
        .bind(&comment.text)
        .bind(comment.timestamp)
        .execute(conn)
        .await?;
        Ok(())
    }
}
