use sqlx::SqlitePool;
use tracing::warn;

use crate::db::{Actor, Post, Topic};
use crate::error::StoreError;

/// Create a topic and its original post in one transaction.
///
/// The original post holds the topic's opening body. It is not a response,
/// so the new topic starts with `response_count` 0.
pub async fn create_topic(
    pool: &SqlitePool,
    title: &str,
    body: &str,
    actor: &Actor,
) -> Result<(Topic, Post), StoreError> {
    if title.trim().is_empty() {
        return Err(StoreError::Validation("title is required".into()));
    }
    if body.trim().is_empty() {
        return Err(StoreError::Validation("body is required".into()));
    }

    let mut tx = pool.begin().await?;

    let result = sqlx::query("INSERT INTO topics (title, updater_id) VALUES (?, ?)")
        .bind(title)
        .bind(actor.id)
        .execute(&mut *tx)
        .await?;
    let topic_id = result.last_insert_rowid();

    let result = sqlx::query(
        r"
        INSERT INTO posts (topic_id, body, creator_id, updater_id)
        VALUES (?, ?, ?, ?)
        ",
    )
    .bind(topic_id)
    .bind(body)
    .bind(actor.id)
    .bind(actor.id)
    .execute(&mut *tx)
    .await?;
    let post_id = result.last_insert_rowid();

    let topic: Topic = sqlx::query_as("SELECT * FROM topics WHERE id = ?")
        .bind(topic_id)
        .fetch_one(&mut *tx)
        .await?;
    let post: Post = sqlx::query_as("SELECT * FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok((topic, post))
}

/// Get a topic by id, deleted or not.
pub async fn get_topic(pool: &SqlitePool, topic_id: i64) -> Result<Option<Topic>, StoreError> {
    let topic: Option<Topic> = sqlx::query_as("SELECT * FROM topics WHERE id = ?")
        .bind(topic_id)
        .fetch_optional(pool)
        .await?;

    Ok(topic)
}

/// Lock or unlock a topic. Moderators only.
///
/// A locked topic rejects new posts, edits and deletions from ordinary
/// actors; moderators are unaffected.
pub async fn set_topic_locked(
    pool: &SqlitePool,
    topic_id: i64,
    locked: bool,
    actor: &Actor,
) -> Result<(), StoreError> {
    if !actor.is_elevated() {
        return Err(StoreError::Authorization(
            "only a moderator can lock a topic".into(),
        ));
    }

    let result = sqlx::query("UPDATE topics SET is_locked = ? WHERE id = ?")
        .bind(locked)
        .bind(topic_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            kind: "topic",
            id: topic_id,
        });
    }
    Ok(())
}

/// Count a topic's live replies straight from the posts table: non-deleted
/// posts excluding the original. This is the ground truth the denormalized
/// `response_count` must agree with.
pub async fn live_response_count(pool: &SqlitePool, topic_id: i64) -> Result<i64, StoreError> {
    let row: (i64,) = sqlx::query_as(
        r"
        SELECT COUNT(*) FROM posts
        WHERE topic_id = ?
          AND is_deleted = 0
          AND id <> (SELECT MIN(id) FROM posts WHERE topic_id = ?)
        ",
    )
    .bind(topic_id)
    .bind(topic_id)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// Recompute a topic's `response_count` from the posts table and persist it.
///
/// Returns the recomputed count. Logs a warning when the stored value had
/// drifted from the ground truth.
pub async fn repair_response_count(pool: &SqlitePool, topic_id: i64) -> Result<i64, StoreError> {
    let mut tx = pool.begin().await?;

    let stored: Option<(i64,)> = sqlx::query_as("SELECT response_count FROM topics WHERE id = ?")
        .bind(topic_id)
        .fetch_optional(&mut *tx)
        .await?;
    let stored = stored
        .ok_or(StoreError::NotFound {
            kind: "topic",
            id: topic_id,
        })?
        .0;

    sqlx::query(
        r"
        UPDATE topics
        SET response_count = (
            SELECT COUNT(*) FROM posts p
            WHERE p.topic_id = topics.id
              AND p.is_deleted = 0
              AND p.id <> (SELECT MIN(p2.id) FROM posts p2 WHERE p2.topic_id = topics.id)
        )
        WHERE id = ?
        ",
    )
    .bind(topic_id)
    .execute(&mut *tx)
    .await?;

    let repaired: (i64,) = sqlx::query_as("SELECT response_count FROM topics WHERE id = ?")
        .bind(topic_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    if stored != repaired.0 {
        warn!(
            topic_id,
            stored,
            repaired = repaired.0,
            "Repaired drifted response count"
        );
    }

    Ok(repaired.0)
}
