//! `users` table: registry writes and broadcast recipient paging.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::StoreError;

/// Text format of every stored timestamp (UTC, millisecond precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Formats a timestamp the way it is stored.
///
/// Fixed width, so lexical order matches chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Display fields taken from an incoming update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserIdentity {
    pub user_id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

impl UserIdentity {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }
}

/// A stored user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// What `observe_user` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveOutcome {
    Created,
    Refreshed,
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
        }
        _ => false,
    }
}

fn refresh_user(conn: &Connection, identity: &UserIdentity, now: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE users SET
            first_name = COALESCE(?2, first_name),
            username = COALESCE(?3, username),
            language_code = COALESCE(?4, language_code),
            updated_at = MAX(updated_at, ?5)
         WHERE user_id = ?1",
        params![
            identity.user_id,
            identity.first_name,
            identity.username,
            identity.language_code,
            now
        ],
    )
}

/// Records one contact with a user.
///
/// Select, insert and update run in a single `IMMEDIATE` transaction so two
/// observers of the same id never both insert. `created_at` is written only
/// by the insert; `updated_at` never moves backwards.
pub fn observe_user(
    conn: &mut Connection,
    identity: &UserIdentity,
    now: DateTime<Utc>,
) -> Result<ObserveOutcome, StoreError> {
    let now = format_timestamp(now);
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let exists = tx
        .query_row(
            "SELECT 1 FROM users WHERE user_id = ?1",
            [identity.user_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    let outcome = if exists {
        refresh_user(&tx, identity, &now)?;
        ObserveOutcome::Refreshed
    } else {
        let inserted = tx.execute(
            "INSERT INTO users (user_id, first_name, username, language_code, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                identity.user_id,
                identity.first_name,
                identity.username,
                identity.language_code,
                now
            ],
        );
        match inserted {
            Ok(_) => ObserveOutcome::Created,
            Err(e) if is_unique_violation(&e) => {
                log::debug!("User {} inserted concurrently, refreshing instead", identity.user_id);
                refresh_user(&tx, identity, &now)?;
                ObserveOutcome::Refreshed
            }
            Err(e) => return Err(e.into()),
        }
    };

    tx.commit()?;
    Ok(outcome)
}

/// Loads one user by id.
pub fn get_user(conn: &Connection, user_id: i64) -> Result<Option<UserRecord>, StoreError> {
    let record = conn
        .query_row(
            "SELECT user_id, first_name, username, language_code, created_at, updated_at
             FROM users WHERE user_id = ?1",
            [user_id],
            |row| {
                Ok(UserRecord {
                    user_id: row.get(0)?,
                    first_name: row.get(1)?,
                    username: row.get(2)?,
                    language_code: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(record)
}

pub fn count_users(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
}

/// One keyset page of broadcast recipients.
///
/// Returns ids strictly greater than `after`, in ascending order, limited to
/// users created at or before `created_before`.
pub fn recipient_page(
    conn: &Connection,
    after: Option<i64>,
    created_before: &str,
    limit: usize,
) -> Result<Vec<i64>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT user_id FROM users
         WHERE user_id > ?1 AND created_at <= ?2
         ORDER BY user_id
         LIMIT ?3",
    )?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let ids = stmt
        .query_map(params![after.unwrap_or(i64::MIN), created_before, limit], |row| {
            row.get::<_, i64>(0)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}
