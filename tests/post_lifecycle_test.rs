//! Integration tests for post creation, editing, deletion and moderation.

use forum_store::db::{Actor, Database};
use forum_store::error::StoreError;
use forum_store::store::{
    create_post, create_topic, get_post, get_posts_for_topic, get_topic, is_original_post,
    set_post_locked, set_post_sticky, set_topic_locked, soft_delete_post, undelete_post,
    update_post,
};
use tempfile::TempDir;

async fn setup_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

#[tokio::test]
async fn test_create_topic_seeds_original_post() {
    let (db, _temp_dir) = setup_test_db().await;
    let author = Actor::member(1);

    let (topic, post) = create_topic(db.pool(), "First topic", "Opening body", &author)
        .await
        .expect("Failed to create topic");

    assert_eq!(topic.title, "First topic");
    assert_eq!(topic.response_count, 0);
    assert_eq!(topic.updater_id, Some(1));
    assert!(!topic.is_locked);
    assert!(!topic.is_deleted);

    assert_eq!(post.topic_id, topic.id);
    assert_eq!(post.body, "Opening body");
    assert_eq!(post.creator_id, 1);
    assert_eq!(post.updater_id, 1);
    assert!(!post.is_deleted);

    assert!(is_original_post(db.pool(), &post).await.unwrap());

    let posts = get_posts_for_topic(db.pool(), topic.id).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, post.id);
}

#[tokio::test]
async fn test_create_post_stamps_actor() {
    let (db, _temp_dir) = setup_test_db().await;
    let (topic, original) = create_topic(db.pool(), "Topic", "Body", &Actor::member(1))
        .await
        .unwrap();

    let reply = create_post(db.pool(), topic.id, "A reply", &Actor::member(2))
        .await
        .expect("Failed to create reply");

    assert_eq!(reply.topic_id, topic.id);
    assert_eq!(reply.creator_id, 2);
    assert_eq!(reply.updater_id, 2);
    assert!(!reply.is_deleted);
    assert!(!is_original_post(db.pool(), &reply).await.unwrap());

    let fetched = get_post(db.pool(), reply.id).await.unwrap().unwrap();
    assert_eq!(fetched.body, "A reply");

    let posts = get_posts_for_topic(db.pool(), topic.id).await.unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].id, original.id);
    assert_eq!(posts[1].id, reply.id);
}

#[tokio::test]
async fn test_create_post_missing_topic() {
    let (db, _temp_dir) = setup_test_db().await;

    let err = create_post(db.pool(), 999, "hi", &Actor::member(1))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "topic", .. }));
}

#[tokio::test]
async fn test_blank_bodies_rejected() {
    let (db, _temp_dir) = setup_test_db().await;
    let author = Actor::member(1);

    let err = create_topic(db.pool(), "  ", "Body", &author)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(err.to_string().contains("title"));

    let err = create_topic(db.pool(), "Topic", " \n ", &author)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    let (topic, original) = create_topic(db.pool(), "Topic", "Body", &author)
        .await
        .unwrap();
    let err = create_post(db.pool(), topic.id, "   ", &author)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    let err = update_post(db.pool(), original.id, "", &author)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[tokio::test]
async fn test_locked_topic_rejects_member_post() {
    let (db, _temp_dir) = setup_test_db().await;
    let (topic, _) = create_topic(db.pool(), "Topic", "Body", &Actor::member(1))
        .await
        .unwrap();

    set_topic_locked(db.pool(), topic.id, true, &Actor::moderator(9))
        .await
        .unwrap();

    let err = create_post(db.pool(), topic.id, "reply", &Actor::member(2))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(err.to_string().contains("locked"));

    // Moderators bypass the lock.
    let reply = create_post(db.pool(), topic.id, "mod reply", &Actor::moderator(9))
        .await
        .expect("Moderator should bypass topic lock");
    assert_eq!(reply.creator_id, 9);
}

#[tokio::test]
async fn test_update_post_by_creator() {
    let (db, _temp_dir) = setup_test_db().await;
    let (topic, _) = create_topic(db.pool(), "Topic", "Body", &Actor::member(1))
        .await
        .unwrap();
    let reply = create_post(db.pool(), topic.id, "original text", &Actor::member(2))
        .await
        .unwrap();

    let updated = update_post(db.pool(), reply.id, "edited text", &Actor::member(2))
        .await
        .expect("Creator should be able to edit");

    assert_eq!(updated.body, "edited text");
    assert_eq!(updated.updater_id, 2);
    assert_eq!(updated.creator_id, 2);
}

#[tokio::test]
async fn test_update_post_authorization() {
    let (db, _temp_dir) = setup_test_db().await;
    let (topic, _) = create_topic(db.pool(), "Topic", "Body", &Actor::member(1))
        .await
        .unwrap();
    let reply = create_post(db.pool(), topic.id, "text", &Actor::member(2))
        .await
        .unwrap();

    let err = update_post(db.pool(), reply.id, "hijacked", &Actor::member(3))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Authorization(_)));

    // A moderator can edit anyone's post.
    let updated = update_post(db.pool(), reply.id, "moderated", &Actor::moderator(9))
        .await
        .expect("Moderator should be able to edit");
    assert_eq!(updated.body, "moderated");
    assert_eq!(updated.updater_id, 9);
    assert_eq!(updated.creator_id, 2);
}

#[tokio::test]
async fn test_update_missing_and_deleted_posts() {
    let (db, _temp_dir) = setup_test_db().await;
    let (topic, _) = create_topic(db.pool(), "Topic", "Body", &Actor::member(1))
        .await
        .unwrap();
    let reply = create_post(db.pool(), topic.id, "text", &Actor::member(2))
        .await
        .unwrap();

    let err = update_post(db.pool(), 999, "x", &Actor::member(2))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "post", .. }));

    soft_delete_post(db.pool(), reply.id, &Actor::member(2))
        .await
        .unwrap();
    let err = update_post(db.pool(), reply.id, "x", &Actor::member(2))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(err.to_string().contains("deleted"));
}

#[tokio::test]
async fn test_locked_topic_blocks_member_edit() {
    let (db, _temp_dir) = setup_test_db().await;
    let (topic, _) = create_topic(db.pool(), "Topic", "Body", &Actor::member(1))
        .await
        .unwrap();
    let reply = create_post(db.pool(), topic.id, "before lock", &Actor::member(2))
        .await
        .unwrap();

    set_topic_locked(db.pool(), topic.id, true, &Actor::moderator(9))
        .await
        .unwrap();

    // Even the creator cannot edit once the topic is locked.
    let err = update_post(db.pool(), reply.id, "member edit", &Actor::member(2))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(err.to_string().contains("topic is locked"));

    let kept = get_post(db.pool(), reply.id).await.unwrap().unwrap();
    assert_eq!(kept.body, "before lock");

    // Moderators edit through the lock.
    let updated = update_post(db.pool(), reply.id, "moderator edit", &Actor::moderator(9))
        .await
        .expect("Moderator edit in a locked topic failed");
    assert_eq!(updated.body, "moderator edit");
    assert_eq!(updated.updater_id, 9);
}

#[tokio::test]
async fn test_locked_post_blocks_member_edit() {
    let (db, _temp_dir) = setup_test_db().await;
    let (topic, _) = create_topic(db.pool(), "Topic", "Body", &Actor::member(1))
        .await
        .unwrap();
    let reply = create_post(db.pool(), topic.id, "text", &Actor::member(2))
        .await
        .unwrap();

    set_post_locked(db.pool(), reply.id, true, &Actor::moderator(9))
        .await
        .unwrap();
    assert!(
        get_post(db.pool(), reply.id)
            .await
            .unwrap()
            .unwrap()
            .is_locked
    );

    let err = update_post(db.pool(), reply.id, "edit", &Actor::member(2))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    let updated = update_post(db.pool(), reply.id, "mod edit", &Actor::moderator(9))
        .await
        .expect("Moderator should bypass post lock");
    assert_eq!(updated.body, "mod edit");

    set_post_locked(db.pool(), reply.id, false, &Actor::moderator(9))
        .await
        .unwrap();
    update_post(db.pool(), reply.id, "unlocked edit", &Actor::member(2))
        .await
        .expect("Unlocked post should be editable again");
}

#[tokio::test]
async fn test_update_original_post_touches_topic_timestamp() {
    let (db, _temp_dir) = setup_test_db().await;
    let (topic, original) = create_topic(db.pool(), "Topic", "Body", &Actor::member(1))
        .await
        .unwrap();

    // Backdate the topic so the refresh is observable within one second.
    sqlx::query("UPDATE topics SET updated_at = '2020-01-01 00:00:00' WHERE id = ?")
        .bind(topic.id)
        .execute(db.pool())
        .await
        .unwrap();

    let updated = update_post(db.pool(), original.id, "Edited body", &Actor::member(1))
        .await
        .unwrap();

    let topic = get_topic(db.pool(), topic.id).await.unwrap().unwrap();
    assert_eq!(topic.updated_at, updated.updated_at);
    assert_eq!(topic.response_count, 0);
}

#[tokio::test]
async fn test_update_reply_leaves_topic_untouched() {
    let (db, _temp_dir) = setup_test_db().await;
    let (topic, _) = create_topic(db.pool(), "Topic", "Body", &Actor::member(1))
        .await
        .unwrap();
    let reply = create_post(db.pool(), topic.id, "reply", &Actor::member(2))
        .await
        .unwrap();

    sqlx::query("UPDATE topics SET updated_at = '2020-01-01 00:00:00' WHERE id = ?")
        .bind(topic.id)
        .execute(db.pool())
        .await
        .unwrap();

    update_post(db.pool(), reply.id, "edited reply", &Actor::member(2))
        .await
        .unwrap();

    let topic = get_topic(db.pool(), topic.id).await.unwrap().unwrap();
    assert_eq!(topic.updated_at, "2020-01-01 00:00:00");
    assert_eq!(topic.response_count, 1);
}

#[tokio::test]
async fn test_soft_delete_hides_post_but_keeps_row() {
    let (db, _temp_dir) = setup_test_db().await;
    let (topic, original) = create_topic(db.pool(), "Topic", "Body", &Actor::member(1))
        .await
        .unwrap();
    let reply = create_post(db.pool(), topic.id, "reply", &Actor::member(2))
        .await
        .unwrap();

    soft_delete_post(db.pool(), reply.id, &Actor::member(2))
        .await
        .expect("Failed to soft-delete");

    let fetched = get_post(db.pool(), reply.id).await.unwrap().unwrap();
    assert!(fetched.is_deleted);
    assert_eq!(fetched.body, "reply");

    let posts = get_posts_for_topic(db.pool(), topic.id).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, original.id);
}

#[tokio::test]
async fn test_soft_delete_respects_topic_lock() {
    let (db, _temp_dir) = setup_test_db().await;
    let (topic, _) = create_topic(db.pool(), "Topic", "Body", &Actor::member(1))
        .await
        .unwrap();
    let reply = create_post(db.pool(), topic.id, "reply", &Actor::member(2))
        .await
        .unwrap();

    set_topic_locked(db.pool(), topic.id, true, &Actor::moderator(9))
        .await
        .unwrap();

    let err = soft_delete_post(db.pool(), reply.id, &Actor::member(2))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    soft_delete_post(db.pool(), reply.id, &Actor::moderator(9))
        .await
        .expect("Moderator should bypass topic lock");
}

#[tokio::test]
async fn test_delete_and_undelete_missing_post() {
    let (db, _temp_dir) = setup_test_db().await;

    let err = soft_delete_post(db.pool(), 999, &Actor::member(1))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "post", .. }));

    let err = undelete_post(db.pool(), 999).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "post", .. }));
}

#[tokio::test]
async fn test_sticky_posts_list_first() {
    let (db, _temp_dir) = setup_test_db().await;
    let (topic, original) = create_topic(db.pool(), "Topic", "Body", &Actor::member(1))
        .await
        .unwrap();
    let reply_a = create_post(db.pool(), topic.id, "reply a", &Actor::member(2))
        .await
        .unwrap();
    let reply_b = create_post(db.pool(), topic.id, "reply b", &Actor::member(3))
        .await
        .unwrap();

    let err = set_post_sticky(db.pool(), reply_b.id, true, &Actor::member(3))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Authorization(_)));

    set_post_sticky(db.pool(), reply_b.id, true, &Actor::moderator(9))
        .await
        .unwrap();

    let posts = get_posts_for_topic(db.pool(), topic.id).await.unwrap();
    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![reply_b.id, original.id, reply_a.id]);

    set_post_sticky(db.pool(), reply_b.id, false, &Actor::moderator(9))
        .await
        .unwrap();
    let posts = get_posts_for_topic(db.pool(), topic.id).await.unwrap();
    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![original.id, reply_a.id, reply_b.id]);
}

#[tokio::test]
async fn test_moderation_toggles_missing_post() {
    let (db, _temp_dir) = setup_test_db().await;

    let err = set_post_sticky(db.pool(), 999, true, &Actor::moderator(9))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "post", .. }));

    let err = set_post_locked(db.pool(), 999, true, &Actor::moderator(9))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "post", .. }));
}

#[tokio::test]
async fn test_topic_lock_requires_moderator() {
    let (db, _temp_dir) = setup_test_db().await;
    let (topic, _) = create_topic(db.pool(), "Topic", "Body", &Actor::member(1))
        .await
        .unwrap();

    let err = set_topic_locked(db.pool(), topic.id, true, &Actor::member(1))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Authorization(_)));

    let err = set_topic_locked(db.pool(), 999, true, &Actor::moderator(9))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "topic", .. }));
}
