//! Silence database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for the silences table
#[derive(Debug, Clone, FromRow)]
pub struct SilenceModel {
    pub id: i64,
    /// Platform id of the silenced user
    pub user_id: String,
    /// Guild the silence applies to
    pub guild_id: String,
    /// When the silence lapses
    pub expires_at: DateTime<Utc>,
}

impl SilenceModel {
    /// Whether this record has lapsed at the given instant.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
