use sqlx::SqlitePool;

use crate::error::StoreError;

/// Subscribe a user to new-post notifications for a topic. Subscribing
/// twice is a no-op. The liveness check and the insert share one
/// transaction so the row cannot outlive the topic it was checked
/// against.
pub async fn subscribe(pool: &SqlitePool, topic_id: i64, user_id: i64) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    let topic: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM topics WHERE id = ? AND is_deleted = 0")
            .bind(topic_id)
            .fetch_optional(&mut *tx)
            .await?;
    if topic.is_none() {
        return Err(StoreError::NotFound {
            kind: "topic",
            id: topic_id,
        });
    }

    sqlx::query("INSERT OR IGNORE INTO subscriptions (topic_id, user_id) VALUES (?, ?)")
        .bind(topic_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Remove a user's subscription to a topic. Removing one that does not
/// exist is a no-op.
pub async fn unsubscribe(pool: &SqlitePool, topic_id: i64, user_id: i64) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM subscriptions WHERE topic_id = ? AND user_id = ?")
        .bind(topic_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Whether a user is subscribed to a topic.
pub async fn is_subscribed(
    pool: &SqlitePool,
    topic_id: i64,
    user_id: i64,
) -> Result<bool, StoreError> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM subscriptions WHERE topic_id = ? AND user_id = ?")
            .bind(topic_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

/// User ids to notify about a new post in a topic. The post's author is
/// excluded so nobody is notified of their own post.
pub async fn subscribers_to_notify(
    pool: &SqlitePool,
    topic_id: i64,
    author_id: i64,
) -> Result<Vec<i64>, StoreError> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r"
        SELECT user_id FROM subscriptions
        WHERE topic_id = ? AND user_id <> ?
        ORDER BY user_id ASC
        ",
    )
    .bind(topic_id)
    .bind(author_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}
