//! Membership lookup seam between the gate and the Telegram client.

use async_trait::async_trait;
use thiserror::Error;

/// A user's standing in a channel, reduced to what the gate needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Owner,
    Administrator,
    Member,
    Restricted,
    Left,
    Banned,
}

impl MemberStatus {
    /// `Left` and `Banned` users have not joined; everyone else has.
    pub fn is_present(self) -> bool {
        !matches!(self, MemberStatus::Left | MemberStatus::Banned)
    }
}

/// Membership lookup failed (bot not in channel, network, etc.).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("membership probe failed: {0}")]
pub struct ProbeError(pub String);

/// Answers "what is this user's status in this chat".
#[async_trait]
pub trait MembershipProbe: Send + Sync {
    async fn member_status(&self, chat_id: i64, user_id: i64) -> Result<MemberStatus, ProbeError>;
}
