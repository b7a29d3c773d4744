//! Handler types and dependencies

use std::sync::Arc;

use teloxide::types::User;

use crate::broadcast::{BroadcastPaths, BroadcastService};
use crate::gate::{AdminDirectory, MembershipGate};
use crate::registry::UserRegistry;
use crate::storage::users::UserIdentity;
use crate::storage::DbPool;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub pool: DbPool,
    pub registry: UserRegistry,
    pub gate: MembershipGate,
    pub admins: AdminDirectory,
    pub broadcasts: BroadcastService,
    pub paths: Arc<BroadcastPaths>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(pool: DbPool, gate: MembershipGate, broadcasts: BroadcastService, paths: BroadcastPaths) -> Self {
        Self {
            registry: UserRegistry::new(pool.clone()),
            admins: gate.admins().clone(),
            pool,
            gate,
            broadcasts,
            paths: Arc::new(paths),
        }
    }
}

/// Registry identity of a Telegram user.
pub fn identity_of(user: &User) -> UserIdentity {
    UserIdentity {
        user_id: user.id.0 as i64,
        first_name: Some(user.first_name.clone()),
        username: user.username.clone(),
        language_code: user.language_code.clone(),
    }
}
