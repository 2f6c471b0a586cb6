//! Integration tests for database setup and migrations.

use std::time::Duration;

use forum_store::config::Config;
use forum_store::db::{Actor, Database};
use forum_store::store::{create_topic, get_topic};
use tempfile::TempDir;

#[tokio::test]
async fn test_new_creates_database_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let _db = Database::new(&db_path)
        .await
        .expect("Failed to create database");

    assert!(db_path.exists());
}

#[tokio::test]
async fn test_reopen_preserves_data_and_reruns_migrations() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let db = Database::new(&db_path).await.unwrap();
    let (topic, _) = create_topic(db.pool(), "Persistent", "Body", &Actor::member(1))
        .await
        .unwrap();
    db.pool().close().await;

    // A second open finds the schema already at the latest version.
    let db = Database::new(&db_path).await.unwrap();
    let fetched = get_topic(db.pool(), topic.id)
        .await
        .unwrap()
        .expect("Topic should survive a reopen");
    assert_eq!(fetched.title, "Persistent");
}

#[tokio::test]
async fn test_from_config_opens_database() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = Config {
        database_path: temp_dir.path().join("configured.db"),
        max_connections: 2,
        busy_timeout: Duration::from_secs(5),
    };
    config.validate().unwrap();

    let db = Database::from_config(&config)
        .await
        .expect("Failed to open database from config");
    create_topic(db.pool(), "Topic", "Body", &Actor::member(1))
        .await
        .expect("Configured database should accept writes");
}
