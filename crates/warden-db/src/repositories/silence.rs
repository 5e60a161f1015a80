//! SQLite implementation of the silence store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use crate::models::SilenceModel;

use super::error::{map_db_error, RepoResult};

/// Store of durable silence records.
///
/// All operations are keyed by platform ids (strings on the wire), matching
/// the dispatch payloads they are extracted from.
#[async_trait]
pub trait SilenceRepository: Send + Sync {
    /// Record a silence that lapses at `expires_at`.
    async fn insert(&self, user_id: &str, guild_id: &str, expires_at: DateTime<Utc>)
        -> RepoResult<()>;

    /// Remove every record that lapsed at or before `now`. Returns the number
    /// of rows removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64>;

    /// Whether the user currently has any silence record.
    async fn exists(&self, user_id: &str) -> RepoResult<bool>;

    /// Remove every record for the user in the guild (on confirmed unmute).
    async fn delete(&self, user_id: &str, guild_id: &str) -> RepoResult<u64>;
}

/// SQLite implementation of [`SilenceRepository`]
#[derive(Clone)]
pub struct SqliteSilenceRepository {
    pool: SqlitePool,
}

impl SqliteSilenceRepository {
    /// Create a new SqliteSilenceRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch every active record for a guild, soonest expiry first.
    #[instrument(skip(self))]
    pub async fn active_in_guild(&self, guild_id: &str) -> RepoResult<Vec<SilenceModel>> {
        let results = sqlx::query_as::<_, SilenceModel>(
            r"
            SELECT id, user_id, guild_id, expires_at
            FROM silences
            WHERE guild_id = ? AND expires_at > ?
            ORDER BY expires_at ASC
            ",
        )
        .bind(guild_id)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results)
    }
}

#[async_trait]
impl SilenceRepository for SqliteSilenceRepository {
    #[instrument(skip(self))]
    async fn insert(
        &self,
        user_id: &str,
        guild_id: &str,
        expires_at: DateTime<Utc>,
    ) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO silences (user_id, guild_id, expires_at)
            VALUES (?, ?, ?)
            ",
        )
        .bind(user_id)
        .bind(guild_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            DELETE FROM silences WHERE expires_at <= ?
            ",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn exists(&self, user_id: &str) -> RepoResult<bool> {
        let result = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(SELECT 1 FROM silences WHERE user_id = ?)
            ",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn delete(&self, user_id: &str, guild_id: &str) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            DELETE FROM silences WHERE user_id = ? AND guild_id = ?
            ",
        )
        .bind(user_id)
        .bind(guild_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}
