use async_trait::async_trait;
use std::time::Duration;

use super::{BroadcastMode, SourceMessage};

/// Reason carried by `SendOutcome::BadRequest` when the source message no
/// longer exists.
pub const SOURCE_MESSAGE_MISSING: &str = "message not found";

/// Classified result of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Delivered; carries the id of the message in the recipient's chat
    Ok(i32),
    /// Rate limited; the next attempt must wait at least this long
    RetryAfter(Duration),
    /// Recipient blocked the bot or was deactivated
    Forbidden,
    /// Recipient chat does not exist
    NotFound,
    BadRequest(String),
    Transient(String),
}

impl SendOutcome {
    pub fn is_source_missing(&self) -> bool {
        matches!(self, SendOutcome::BadRequest(reason) if reason == SOURCE_MESSAGE_MISSING)
    }
}

/// The send primitive the dispatcher drives.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Copies or forwards `source` to `recipient`. Never fails: every error
    /// is folded into a `SendOutcome`.
    async fn send(&self, recipient: i64, source: &SourceMessage, mode: BroadcastMode) -> SendOutcome;

    /// Removes a delivered message (test broadcasts clean up after themselves).
    async fn delete(&self, recipient: i64, message_id: i32) -> anyhow::Result<()>;
}
