//! `admins` table: admins granted at runtime.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::users::format_timestamp;
use super::StoreError;

/// Grants admin rights. Returns `false` if the user already had them.
pub fn add_admin(conn: &Connection, user_id: i64) -> Result<bool, StoreError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO admins (user_id, added_at) VALUES (?1, ?2)",
        params![user_id, format_timestamp(Utc::now())],
    )?;
    Ok(inserted > 0)
}

/// Revokes admin rights. Returns `false` if the user had none.
pub fn remove_admin(conn: &Connection, user_id: i64) -> Result<bool, StoreError> {
    let removed = conn.execute("DELETE FROM admins WHERE user_id = ?1", [user_id])?;
    Ok(removed > 0)
}

pub fn is_persisted_admin(conn: &Connection, user_id: i64) -> Result<bool, StoreError> {
    let found = conn
        .query_row("SELECT 1 FROM admins WHERE user_id = ?1", [user_id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

pub fn list_admins(conn: &Connection) -> Result<Vec<i64>, StoreError> {
    let mut stmt = conn.prepare_cached("SELECT user_id FROM admins ORDER BY user_id")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}
