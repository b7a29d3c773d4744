use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::storage::users::{format_timestamp, recipient_page};
use crate::storage::{with_connection, DbPool, StoreError};

/// Default page size when reading recipients.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Lazy, single-pass sequence of recipient ids.
#[async_trait]
pub trait RecipientSource: Send {
    /// Next batch, `None` once exhausted. An error ends the traversal.
    async fn next_batch(&mut self) -> Result<Option<Vec<i64>>, StoreError>;
}

/// Recipients read from the `users` table by keyset pagination on `user_id`.
///
/// Only users registered at or before `snapshot` are listed, so people who
/// join while the broadcast runs are not picked up halfway through.
pub struct UserStoreSource {
    pool: DbPool,
    batch_size: usize,
    snapshot: String,
    cursor: Option<i64>,
    exhausted: bool,
}

impl UserStoreSource {
    pub fn new(pool: DbPool, batch_size: usize, snapshot: DateTime<Utc>) -> Self {
        Self {
            pool,
            batch_size: batch_size.max(1),
            snapshot: format_timestamp(snapshot),
            cursor: None,
            exhausted: false,
        }
    }
}

#[async_trait]
impl RecipientSource for UserStoreSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<i64>>, StoreError> {
        if self.exhausted {
            return Ok(None);
        }

        let after = self.cursor;
        let snapshot = self.snapshot.clone();
        let limit = self.batch_size;
        let page = match with_connection(&self.pool, move |conn| recipient_page(conn, after, &snapshot, limit)).await {
            Ok(page) => page,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };

        if page.len() < limit {
            self.exhausted = true;
        }
        match page.last() {
            Some(&last) => {
                self.cursor = Some(last);
                Ok(Some(page))
            }
            None => Ok(None),
        }
    }
}
