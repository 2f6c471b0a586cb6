use sqlx::{SqliteConnection, SqlitePool};

use crate::db::{Actor, Post, Topic};
use crate::error::StoreError;

use super::counters;

/// Create a new post in a topic.
///
/// The topic must exist, not be deleted, and not be locked (moderators
/// bypass the lock). The first post of a topic becomes its original post
/// and is not counted as a response; every later post bumps the topic's
/// `response_count` and activity fields in the same transaction.
pub async fn create_post(
    pool: &SqlitePool,
    topic_id: i64,
    body: &str,
    actor: &Actor,
) -> Result<Post, StoreError> {
    if body.trim().is_empty() {
        return Err(StoreError::Validation("body is required".into()));
    }

    let mut tx = pool.begin().await?;

    let topic = fetch_live_topic(&mut tx, topic_id).await?;
    if topic.is_locked && !actor.is_elevated() {
        return Err(StoreError::Validation("topic is locked".into()));
    }

    let is_first_post = original_post_id(&mut tx, topic_id).await?.is_none();

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

    let post = fetch_post(&mut tx, result.last_insert_rowid()).await?;

    if !is_first_post {
        counters::on_post_created(&mut tx, &post).await?;
    }

    tx.commit().await?;
    Ok(post)
}

/// Edit a post's body.
///
/// Only the post's creator or a moderator may edit, and neither the topic
/// nor the post may be locked (moderators bypass both locks). Editing a
/// topic's original post refreshes the topic's `updated_at` without touching
/// its `response_count`; editing a reply leaves the topic row alone.
pub async fn update_post(
    pool: &SqlitePool,
    post_id: i64,
    body: &str,
    actor: &Actor,
) -> Result<Post, StoreError> {
    if body.trim().is_empty() {
        return Err(StoreError::Validation("body is required".into()));
    }

    let mut tx = pool.begin().await?;

    let post = fetch_post_required(&mut tx, post_id).await?;
    if post.creator_id != actor.id && !actor.is_elevated() {
        return Err(StoreError::Authorization(
            "only the creator or a moderator can edit this post".into(),
        ));
    }
    if post.is_deleted {
        return Err(StoreError::Validation("post is deleted".into()));
    }

    let topic = fetch_live_topic(&mut tx, post.topic_id).await?;
    if topic.is_locked && !actor.is_elevated() {
        return Err(StoreError::Validation("topic is locked".into()));
    }
    if post.is_locked && !actor.is_elevated() {
        return Err(StoreError::Validation("post is locked".into()));
    }

    sqlx::query(
        r"
        UPDATE posts
        SET body = ?, updater_id = ?, updated_at = datetime('now')
        WHERE id = ?
        ",
    )
    .bind(body)
    .bind(actor.id)
    .bind(post_id)
    .execute(&mut *tx)
    .await?;

    let updated = fetch_post(&mut tx, post_id).await?;

    if original_post_id(&mut tx, post.topic_id).await? == Some(post.id) {
        counters::touch_topic(&mut tx, post.topic_id, &updated.updated_at).await?;
    }

    tx.commit().await?;
    Ok(updated)
}

/// Soft-delete a post. The row is retained with `is_deleted` set.
///
/// The topic must not be locked (moderators bypass the lock). Deleting a
/// reply decrements the topic's `response_count` and backfills its activity
/// fields from the most recent surviving reply. Deleting the topic's
/// original post soft-deletes the whole topic instead and leaves the count
/// alone. Deleting an already-deleted post is a no-op.
pub async fn soft_delete_post(
    pool: &SqlitePool,
    post_id: i64,
    actor: &Actor,
) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    let post = fetch_post_required(&mut tx, post_id).await?;
    if post.is_deleted {
        return Ok(());
    }

    let topic = fetch_live_topic(&mut tx, post.topic_id).await?;
    if topic.is_locked && !actor.is_elevated() {
        return Err(StoreError::Validation("topic is locked".into()));
    }

    let original = original_post_id(&mut tx, post.topic_id).await?;

    sqlx::query("UPDATE posts SET is_deleted = 1 WHERE id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    if original == Some(post.id) {
        // The original post is the topic's body; removing it removes the
        // topic.
        sqlx::query("UPDATE topics SET is_deleted = 1 WHERE id = ?")
            .bind(post.topic_id)
            .execute(&mut *tx)
            .await?;
    } else {
        counters::on_post_removed(&mut tx, &post).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Reverse a soft delete.
///
/// Restoring a reply re-applies the response-count increment, stamping the
/// topic's activity fields from the restored post. Restoring a topic's
/// original post does not resurrect the topic. Undeleting a live post is a
/// no-op.
pub async fn undelete_post(pool: &SqlitePool, post_id: i64) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    let post = fetch_post_required(&mut tx, post_id).await?;
    if !post.is_deleted {
        return Ok(());
    }

    sqlx::query("UPDATE posts SET is_deleted = 0 WHERE id = ?")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    if original_post_id(&mut tx, post.topic_id).await? != Some(post.id) {
        counters::on_post_created(&mut tx, &post).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Get a post by id, deleted or not.
pub async fn get_post(pool: &SqlitePool, post_id: i64) -> Result<Option<Post>, StoreError> {
    let post: Option<Post> = sqlx::query_as("SELECT * FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(pool)
        .await?;

    Ok(post)
}

/// Non-deleted posts of a topic, sticky posts first, then oldest first.
pub async fn get_posts_for_topic(
    pool: &SqlitePool,
    topic_id: i64,
) -> Result<Vec<Post>, StoreError> {
    let posts: Vec<Post> = sqlx::query_as(
        r"
        SELECT * FROM posts
        WHERE topic_id = ? AND is_deleted = 0
        ORDER BY is_sticky DESC, created_at ASC, id ASC
        ",
    )
    .bind(topic_id)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

/// Whether `post` is its topic's original post (lowest id in the topic,
/// deleted rows included).
pub async fn is_original_post(pool: &SqlitePool, post: &Post) -> Result<bool, StoreError> {
    let row: (Option<i64>,) = sqlx::query_as("SELECT MIN(id) FROM posts WHERE topic_id = ?")
        .bind(post.topic_id)
        .fetch_one(pool)
        .await?;

    Ok(row.0 == Some(post.id))
}

/// Pin or unpin a post within its topic listing. Moderators only.
pub async fn set_post_sticky(
    pool: &SqlitePool,
    post_id: i64,
    sticky: bool,
    actor: &Actor,
) -> Result<(), StoreError> {
    if !actor.is_elevated() {
        return Err(StoreError::Authorization(
            "only a moderator can change sticky status".into(),
        ));
    }

    let result = sqlx::query("UPDATE posts SET is_sticky = ? WHERE id = ?")
        .bind(sticky)
        .bind(post_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            kind: "post",
            id: post_id,
        });
    }
    Ok(())
}

/// Lock or unlock a single post against edits. Moderators only.
pub async fn set_post_locked(
    pool: &SqlitePool,
    post_id: i64,
    locked: bool,
    actor: &Actor,
) -> Result<(), StoreError> {
    if !actor.is_elevated() {
        return Err(StoreError::Authorization(
            "only a moderator can lock a post".into(),
        ));
    }

    let result = sqlx::query("UPDATE posts SET is_locked = ? WHERE id = ?")
        .bind(locked)
        .bind(post_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            kind: "post",
            id: post_id,
        });
    }
    Ok(())
}

async fn fetch_post(conn: &mut SqliteConnection, post_id: i64) -> Result<Post, StoreError> {
    let post: Post = sqlx::query_as("SELECT * FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(post)
}

async fn fetch_post_required(
    conn: &mut SqliteConnection,
    post_id: i64,
) -> Result<Post, StoreError> {
    let post: Option<Post> = sqlx::query_as("SELECT * FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(&mut *conn)
        .await?;

    post.ok_or(StoreError::NotFound {
        kind: "post",
        id: post_id,
    })
}

async fn fetch_live_topic(
    conn: &mut SqliteConnection,
    topic_id: i64,
) -> Result<Topic, StoreError> {
    let topic: Option<Topic> = sqlx::query_as("SELECT * FROM topics WHERE id = ?")
        .bind(topic_id)
        .fetch_optional(&mut *conn)
        .await?;

    topic
        .filter(|t| !t.is_deleted)
        .ok_or(StoreError::NotFound {
            kind: "topic",
            id: topic_id,
        })
}

async fn original_post_id(
    conn: &mut SqliteConnection,
    topic_id: i64,
) -> Result<Option<i64>, StoreError> {
    let row: (Option<i64>,) = sqlx::query_as("SELECT MIN(id) FROM posts WHERE topic_id = ?")
        .bind(topic_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(row.0)
}
