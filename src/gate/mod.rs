//! Membership gate
//!
//! Decides whether a user may use the bot: admins always pass, everyone else
//! must be present in every active required channel. Nothing is cached, each
//! check reads the channel list and probes Telegram again.

pub mod admins;
pub mod probe;

use std::sync::Arc;

pub use admins::AdminDirectory;
pub use probe::{MemberStatus, MembershipProbe, ProbeError};

use crate::storage::channels::{active_channels, RequiredChannel};
use crate::storage::{with_connection, DbPool};

/// Result of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub allowed: bool,
    /// Channels the user still has to join, in roster order
    pub join_list: Vec<RequiredChannel>,
}

impl GateDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            join_list: Vec::new(),
        }
    }

    /// Denied without a join list (store unavailable).
    pub fn closed() -> Self {
        Self {
            allowed: false,
            join_list: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct MembershipGate {
    pool: DbPool,
    probe: Arc<dyn MembershipProbe>,
    admins: AdminDirectory,
}

impl MembershipGate {
    pub fn new(pool: DbPool, probe: Arc<dyn MembershipProbe>, admins: AdminDirectory) -> Self {
        Self { pool, probe, admins }
    }

    pub fn admins(&self) -> &AdminDirectory {
        &self.admins
    }

    pub async fn check(&self, user_id: i64) -> GateDecision {
        match self.admins.is_admin(user_id).await {
            Ok(true) => return GateDecision::allow(),
            Ok(false) => {}
            Err(e) => log::warn!("Admin lookup for {} failed, treating as regular user: {}", user_id, e),
        }

        let channels = match with_connection(&self.pool, |conn| active_channels(conn)).await {
            Ok(channels) => channels,
            Err(e) => {
                log::error!("Gate denied {}: failed to load required channels: {}", user_id, e);
                return GateDecision::closed();
            }
        };

        let mut join_list = Vec::new();
        for channel in channels {
            match self.probe.member_status(channel.chat_id, user_id).await {
                Ok(status) if status.is_present() => {}
                Ok(status) => {
                    log::debug!("User {} is {:?} in {}", user_id, status, channel.chat_id);
                    join_list.push(channel);
                }
                Err(e) => {
                    log::warn!("Membership probe {} in {} failed: {}", user_id, channel.chat_id, e);
                    join_list.push(channel);
                }
            }
        }

        GateDecision {
            allowed: join_list.is_empty(),
            join_list,
        }
    }
}
