//! User registry: records every user that talks to the bot.

use chrono::{DateTime, Utc};

use crate::storage::users::{observe_user, ObserveOutcome, UserIdentity};
use crate::storage::{with_connection, DbPool, StoreError};

/// Idempotent upsert of users on every contact.
#[derive(Clone)]
pub struct UserRegistry {
    pool: DbPool,
}

impl UserRegistry {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Records a contact at the current instant.
    pub async fn observe(&self, identity: UserIdentity) -> Result<ObserveOutcome, StoreError> {
        self.observe_at(identity, Utc::now()).await
    }

    /// Records a contact at `now`. Safe to call concurrently for the same id.
    pub async fn observe_at(&self, identity: UserIdentity, now: DateTime<Utc>) -> Result<ObserveOutcome, StoreError> {
        let user_id = identity.user_id;
        let outcome = with_connection(&self.pool, move |conn| observe_user(conn, &identity, now)).await?;
        if outcome == ObserveOutcome::Created {
            log::info!("Registered new user {}", user_id);
        }
        Ok(outcome)
    }
}
