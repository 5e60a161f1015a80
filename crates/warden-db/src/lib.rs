//! # warden-db
//!
//! Persistence layer for silence records, backed by SQLite via SQLx.
//!
//! The durable side of a timed mute lives here: a row per silenced user that
//! survives process restarts and is swept lazily as messages arrive. The
//! in-memory deadline is owned by the enforcement loop in `warden-gateway`.

pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, init_schema, SqlitePool};
pub use repositories::{RepositoryError, RepoResult, SilenceRepository, SqliteSilenceRepository};
