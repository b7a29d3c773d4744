//! Broadcast service
//!
//! Process-wide entry point for broadcasts. It holds the admins' pending
//! arms (`/broadcast_copy` waits for the next message) and makes sure only
//! one broadcast runs at a time.

use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::coordinator::{BroadcastCoordinator, BroadcastReporter, BroadcastSummary, CoordinatorSettings};
use super::sender::MessageSender;
use super::source::RecipientSource;
use super::{BroadcastJob, BroadcastMode};

/// A broadcast armed by an admin, waiting for its source message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingBroadcast {
    pub mode: BroadcastMode,
    pub is_test: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    #[error("a broadcast is already running")]
    AlreadyRunning,
}

#[derive(Clone, Default)]
pub struct BroadcastService {
    running: Arc<Mutex<()>>,
    pending: Arc<DashMap<i64, PendingBroadcast>>,
}

impl BroadcastService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a broadcast for `admin_id`, replacing any earlier arm.
    pub fn arm(&self, admin_id: i64, pending: PendingBroadcast) -> Option<PendingBroadcast> {
        self.pending.insert(admin_id, pending)
    }

    /// Takes the arm so the next message consumes it exactly once.
    pub fn take(&self, admin_id: i64) -> Option<PendingBroadcast> {
        self.pending.remove(&admin_id).map(|(_, pending)| pending)
    }

    pub fn is_armed(&self, admin_id: i64) -> bool {
        self.pending.contains_key(&admin_id)
    }

    /// Cancels an arm. Returns `false` if nothing was armed.
    pub fn disarm(&self, admin_id: i64) -> bool {
        self.pending.remove(&admin_id).is_some()
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Starts `job` in a background task. The lock is held by the task until
    /// the summary has been reported.
    pub fn launch(
        &self,
        job: BroadcastJob,
        sender: Arc<dyn MessageSender>,
        reporter: Arc<dyn BroadcastReporter>,
        settings: CoordinatorSettings,
        source: Box<dyn RecipientSource>,
    ) -> Result<JoinHandle<BroadcastSummary>, LaunchError> {
        let guard = Arc::clone(&self.running)
            .try_lock_owned()
            .map_err(|_| LaunchError::AlreadyRunning)?;

        let coordinator = BroadcastCoordinator::new(job, sender, reporter, settings);
        Ok(tokio::spawn(async move {
            let _guard = guard;
            coordinator.run(source).await
        }))
    }
}
