//! Denormalized reply bookkeeping on topics.
//!
//! Post mutations keep three topic columns in step with the live set of
//! replies: `response_count`, `updated_at` and `updater_id`. The writes here
//! touch exactly those columns on the topic row and nothing else, so they
//! never cascade into further updates.
//!
//! A topic's original post is not a reply and is never reflected in
//! `response_count`; callers skip these hooks for it.

use sqlx::SqliteConnection;

use crate::db::Post;
use crate::error::StoreError;

/// Record a newly live post on its topic.
///
/// The increment happens inside the SQL expression, so two concurrent
/// creates cannot read the same old count and lose an update. The topic's
/// activity fields are stamped from the post. Must not be called for a
/// topic's original post.
pub async fn on_post_created(conn: &mut SqliteConnection, post: &Post) -> Result<(), StoreError> {
    sqlx::query(
        r"
        UPDATE topics
        SET response_count = response_count + 1,
            updated_at = ?,
            updater_id = ?
        WHERE id = ?
        ",
    )
    .bind(&post.updated_at)
    .bind(post.updater_id)
    .bind(post.topic_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Record a removed post on its topic.
///
/// Decrements `response_count`, then backfills `updated_at` and `updater_id`
/// from the most recent surviving reply. When no reply survives, the
/// activity fields keep their last value while the count still drops. Must
/// not be called for a topic's original post.
pub async fn on_post_removed(conn: &mut SqliteConnection, post: &Post) -> Result<(), StoreError> {
    sqlx::query("UPDATE topics SET response_count = response_count - 1 WHERE id = ?")
        .bind(post.topic_id)
        .execute(&mut *conn)
        .await?;

    let survivor: Option<Post> = sqlx::query_as(
        r"
        SELECT * FROM posts
        WHERE topic_id = ?
          AND is_deleted = 0
          AND id <> (SELECT MIN(id) FROM posts WHERE topic_id = ?)
        ORDER BY updated_at DESC, id DESC
        LIMIT 1
        ",
    )
    .bind(post.topic_id)
    .bind(post.topic_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(survivor) = survivor {
        sqlx::query("UPDATE topics SET updated_at = ?, updater_id = ? WHERE id = ?")
            .bind(&survivor.updated_at)
            .bind(survivor.updater_id)
            .bind(post.topic_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Refresh only the topic's `updated_at`, used when its original post is
/// edited.
pub(crate) async fn touch_topic(
    conn: &mut SqliteConnection,
    topic_id: i64,
    updated_at: &str,
) -> Result<(), StoreError> {
    sqlx::query("UPDATE topics SET updated_at = ? WHERE id = ?")
        .bind(updated_at)
        .bind(topic_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
