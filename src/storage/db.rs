use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::time::Duration;

use super::migrations::run_migrations;
use super::StoreError;
use crate::core::config;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Uses `DB_POOL_SIZE` and `DB_BUSY_TIMEOUT_SECS` from the environment and
/// runs schema migrations before returning.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
///
/// # Example
///
/// ```no_run
/// use linguabot::storage;
///
/// let pool = storage::create_pool("database.sqlite")?;
/// # Ok::<(), linguabot::storage::StoreError>(())
/// ```
pub fn create_pool(database_path: &str) -> Result<DbPool, StoreError> {
    create_pool_with(
        database_path,
        *config::database::POOL_SIZE,
        config::database::busy_timeout(),
    )
}

/// Create a pool with explicit sizing
///
/// Every connection gets the busy timeout and WAL journaling on checkout,
/// so concurrent writers wait instead of failing with `SQLITE_BUSY`.
pub fn create_pool_with(database_path: &str, max_size: u32, busy_timeout: Duration) -> Result<DbPool, StoreError> {
    let manager = SqliteConnectionManager::file(database_path).with_init(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
    });
    let pool = Pool::builder().max_size(max_size.max(1)).build(manager)?;

    // Ensure schema is up to date on first connection
    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    log::info!("Database pool ready at {} (max {} connections)", database_path, max_size);
    Ok(pool)
}

/// Runs `op` on a pooled connection inside `spawn_blocking`.
///
/// The pool handle is cloned into the worker; rusqlite calls never block the
/// async runtime.
pub async fn with_connection<T, F>(pool: &DbPool, op: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        op(&mut *conn)
    })
    .await?
}
