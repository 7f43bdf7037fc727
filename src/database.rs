use std::str::FromStr;
use std::time::Duration;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    Connection(#[from] sqlx::Error),
    #[error("invalid database URL: {0}")]
    InvalidUrl(String),
    #[error("database is unreachable: {0}")]
    Unreachable(sqlx::Error),
}

/// Open the connection pool described by `config` and verify it answers queries.
///
/// An unreachable database fails startup rather than surfacing on the first request.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
    info!(target: "startup", "initializing database connection pool");

    let connect_options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| DatabaseError::InvalidUrl(e.to_string()))?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    let pool_options = if is_in_memory(&config.url) {
        // Every connection to `:memory:` would otherwise see its own empty database.
        pinned_pool_options()
    } else {
        SqlitePoolOptions::new().max_connections(config.max_connections)
    };

    let pool = pool_options.connect_with(connect_options).await?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(DatabaseError::Unreachable)?;

    info!(
        target: "startup",
        max_connections = config.max_connections,
        "database connection pool ready"
    );

    Ok(pool)
}

/// Create the pool and make sure the application tables exist.
pub async fn initialize_database(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(config).await?;
    create_tables(&pool).await?;
    info!(target: "startup", "database initialization completed");
    Ok(pool)
}

/// A private in-memory database with the application schema applied.
pub async fn open_in_memory() -> Result<SqlitePool, DatabaseError> {
    let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| DatabaseError::InvalidUrl(e.to_string()))?;
    let pool = pinned_pool_options().connect_with(connect_options).await?;
    create_tables(&pool).await?;
    Ok(pool)
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

fn pinned_pool_options() -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
}

/// Create the snippet and user tables. Session storage owns its own table.
pub async fn create_tables(pool: &SqlitePool) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS snippets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_snippets_expires_at ON snippets(expires_at)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            hashed_password TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS users_uc_email ON users(email)")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_pool_keeps_schema_between_queries() {
        let pool = open_in_memory().await.unwrap();

        for _ in 0..3 {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(count, 0);
        }
    }

    #[tokio::test]
    async fn unopenable_database_fails_fast() {
        let config = DatabaseConfig {
            url: "sqlite:///definitely/not/a/real/dir/snippetbox.db".to_string(),
            max_connections: 1,
        };
        assert!(create_pool(&config).await.is_err());
    }

    #[tokio::test]
    async fn create_tables_is_idempotent() {
        let pool = open_in_memory().await.unwrap();
        create_tables(&pool).await.unwrap();
    }
}
