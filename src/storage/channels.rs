//! `required_channels` table.

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use super::users::format_timestamp;
use super::StoreError;

/// A channel users must join before using the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredChannel {
    pub chat_id: i64,
    pub invite_url: String,
    pub is_active: bool,
}

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<RequiredChannel> {
    Ok(RequiredChannel {
        chat_id: row.get(0)?,
        invite_url: row.get(1)?,
        is_active: row.get::<_, i64>(2)? != 0,
    })
}

/// Registers a channel, or reactivates it with a fresh invite link.
pub fn upsert_channel(conn: &Connection, chat_id: i64, invite_url: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO required_channels (chat_id, invite_url, is_active, created_at)
         VALUES (?1, ?2, 1, ?3)
         ON CONFLICT(chat_id) DO UPDATE SET
            invite_url = excluded.invite_url,
            is_active = 1",
        params![chat_id, invite_url, format_timestamp(Utc::now())],
    )?;
    Ok(())
}

/// Deletes a channel. Returns `false` when it was not registered.
pub fn delete_channel(conn: &Connection, chat_id: i64) -> Result<bool, StoreError> {
    let removed = conn.execute("DELETE FROM required_channels WHERE chat_id = ?1", [chat_id])?;
    Ok(removed > 0)
}

/// Active channels in one statement, so a gate check sees a single snapshot.
pub fn active_channels(conn: &Connection) -> Result<Vec<RequiredChannel>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT chat_id, invite_url, is_active FROM required_channels
         WHERE is_active = 1
         ORDER BY created_at, chat_id",
    )?;
    let channels = stmt
        .query_map([], channel_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(channels)
}

pub fn all_channels(conn: &Connection) -> Result<Vec<RequiredChannel>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT chat_id, invite_url, is_active FROM required_channels ORDER BY created_at, chat_id",
    )?;
    let channels = stmt
        .query_map([], channel_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(channels)
}
