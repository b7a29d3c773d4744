//! User store: SQLite pool, migrations and the three tables the bot keeps.

pub mod admins;
pub mod channels;
pub mod db;
pub mod migrations;
pub mod users;

use thiserror::Error;

// Re-exports for convenience
pub use db::{create_pool, create_pool_with, with_connection, DbConnection, DbPool};

/// Errors raised by the user store.
///
/// Every variant means the same thing to callers ("store unavailable"); the
/// split only keeps the log lines precise.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No connection could be checked out of the pool
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// SQLite rejected a statement
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Schema migration failed
    #[error("migration error: {0}")]
    Migration(#[from] refinery::Error),

    /// The blocking worker running the query panicked or was cancelled
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
