use std::collections::HashSet;
use std::sync::Arc;

use crate::core::config;
use crate::storage::admins::is_persisted_admin;
use crate::storage::{with_connection, DbPool, StoreError};

/// Static `ADMIN_IDS` plus the persisted `admins` table.
#[derive(Clone)]
pub struct AdminDirectory {
    static_ids: Arc<HashSet<i64>>,
    pool: DbPool,
}

impl AdminDirectory {
    pub fn new(static_ids: impl IntoIterator<Item = i64>, pool: DbPool) -> Self {
        Self {
            static_ids: Arc::new(static_ids.into_iter().collect()),
            pool,
        }
    }

    /// Directory seeded from `ADMIN_IDS`.
    pub fn from_config(pool: DbPool) -> Self {
        Self::new(config::admin::ADMIN_IDS.iter().copied(), pool)
    }

    /// Static admins cannot be removed at runtime.
    pub fn is_static(&self, user_id: i64) -> bool {
        self.static_ids.contains(&user_id)
    }

    pub async fn is_admin(&self, user_id: i64) -> Result<bool, StoreError> {
        if self.is_static(user_id) {
            return Ok(true);
        }
        with_connection(&self.pool, move |conn| is_persisted_admin(conn, user_id)).await
    }
}
