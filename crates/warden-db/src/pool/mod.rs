//! Database connection pool management

mod sqlite;

pub use sqlite::{create_pool, init_schema, PoolConfig};

// Re-export SqlitePool for convenience
pub use sqlx::sqlite::SqlitePool;
