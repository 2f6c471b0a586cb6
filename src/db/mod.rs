mod migrations;
mod models;

pub use models::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::config::Config;

/// A single connection serializes writers through the pool queue. SQLite only
/// ever has one writer at a time, and a write transaction started from a
/// second connection can fail with a stale-snapshot SQLITE_BUSY once the WAL
/// has advanced past its read snapshot.
const DEFAULT_MAX_CONNECTIONS: u32 = 1;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection with default pool settings, running
    /// migrations if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or migrations fail.
    pub async fn new(path: &Path) -> Result<Self> {
        Self::open(path, DEFAULT_MAX_CONNECTIONS, DEFAULT_BUSY_TIMEOUT).await
    }

    /// Create a new database connection using pool settings from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or migrations fail.
    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::open(
            &config.database_path,
            config.max_connections,
            config.busy_timeout,
        )
        .await
    }

    async fn open(path: &Path, max_connections: u32, busy_timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Without a busy timeout, another process holding the write lock
            // causes immediate SQLITE_BUSY errors. WAL helps, but writes are
            // still serialized.
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        let db = Self { pool };
        db.run_migrations().await?;
        db.verify_writable(path).await?;

        Ok(db)
    }

    async fn verify_writable(&self, path: &Path) -> Result<()> {
        // Detect deployment misconfigurations early (e.g. a volume mounted as
        // root-owned while running as non-root), which otherwise show up later
        // as "attempt to write a readonly database" on the first post.
        //
        // Starting a transaction requires write capability on SQLite.
        let tx = self.pool.begin().await.with_context(|| {
            format!(
                "SQLite database is not writable (path: {}). Check volume mount permissions/ownership",
                path.display()
            )
        })?;

        tx.commit()
            .await
            .context("Failed to commit SQLite writability check")?;
        Ok(())
    }

    /// Run all pending migrations.
    async fn run_migrations(&self) -> Result<()> {
        migrations::run(&self.pool).await?;
        info!("Database migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
