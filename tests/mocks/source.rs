//! In-memory recipient sources

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;

use linguabot::broadcast::RecipientSource;
use linguabot::storage::StoreError;

/// Yields the given batches in order.
pub struct StaticSource {
    batches: VecDeque<Vec<i64>>,
}

impl StaticSource {
    pub fn new(batches: impl IntoIterator<Item = Vec<i64>>) -> Self {
        Self {
            batches: batches.into_iter().collect(),
        }
    }

    pub fn single(recipients: impl IntoIterator<Item = i64>) -> Self {
        Self::new([recipients.into_iter().collect::<Vec<_>>()])
    }
}

#[async_trait]
impl RecipientSource for StaticSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<i64>>, StoreError> {
        Ok(self.batches.pop_front())
    }
}

/// Yields the given batches, then fails as if the store went away.
pub struct FailingSource {
    inner: StaticSource,
}

impl FailingSource {
    pub fn after(batches: impl IntoIterator<Item = Vec<i64>>) -> Self {
        Self {
            inner: StaticSource::new(batches),
        }
    }
}

#[async_trait]
impl RecipientSource for FailingSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<i64>>, StoreError> {
        match self.inner.next_batch().await? {
            Some(batch) => Ok(Some(batch)),
            None => Err(StoreError::Database(rusqlite::Error::InvalidQuery)),
        }
    }
}
