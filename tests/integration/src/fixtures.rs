//! Test fixtures
//!
//! In-memory stand-ins for the REST collaborator, and a real SQLite
//! repository on an in-memory database.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::sqlite::SqlitePoolOptions;

use warden_db::{SilenceRepository, SqliteSilenceRepository};
use warden_gateway::events::MessageApi;
use warden_gateway::MuteApi;

/// Records every mute mutation and message deletion the router performs.
#[derive(Default)]
pub struct RecordingApi {
    muted: Mutex<bool>,
    set_calls: Mutex<Vec<bool>>,
    deleted: Mutex<Vec<(String, String)>>,
}

impl RecordingApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_calls(&self) -> Vec<bool> {
        self.set_calls.lock().clone()
    }

    pub fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().clone()
    }
}

#[async_trait]
impl MuteApi for RecordingApi {
    async fn get_mute_state(&self, _guild: &str, _user: &str) -> anyhow::Result<bool> {
        Ok(*self.muted.lock())
    }

    async fn set_mute_state(&self, _guild: &str, _user: &str, muted: bool) -> anyhow::Result<()> {
        *self.muted.lock() = muted;
        self.set_calls.lock().push(muted);
        Ok(())
    }
}

#[async_trait]
impl MessageApi for RecordingApi {
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> anyhow::Result<()> {
        self.deleted
            .lock()
            .push((channel_id.to_string(), message_id.to_string()));
        Ok(())
    }
}

/// A real repository over an in-memory SQLite database.
///
/// One connection keeps the database alive for the repository's lifetime.
pub async fn memory_repository() -> Arc<SqliteSilenceRepository> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    warden_db::init_schema(&pool).await.expect("schema");
    Arc::new(SqliteSilenceRepository::new(pool))
}

/// The repository as the trait object the router consumes.
pub async fn memory_repository_dyn() -> Arc<dyn SilenceRepository> {
    memory_repository().await
}
