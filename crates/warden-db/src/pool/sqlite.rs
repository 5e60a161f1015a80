//! SQLite connection pool management

use std::time::Duration;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Database configuration for the connection pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// SQLite connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Maximum time to wait for a connection
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            url: String::from("sqlite://warden.db?mode=rwc"),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// Create a new SQLite connection pool
pub async fn create_pool(config: &PoolConfig) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
}

/// Create the silences table if it does not exist yet.
///
/// Ran once at startup; the schema is small enough that a migration
/// framework would be overhead.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS silences (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            guild_id TEXT NOT NULL,
            expires_at DATETIME NOT NULL
        )
        ",
    )
    .execute(pool)
    .await?;

    tracing::debug!("database schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.acquire_timeout, Duration::from_secs(10));
        assert!(config.url.starts_with("sqlite://"));
    }

    #[tokio::test]
    async fn test_schema_init_is_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        init_schema(&pool).await.unwrap();
        init_schema(&pool).await.unwrap();
    }
}
