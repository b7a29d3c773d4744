//! Broadcast engine
//!
//! One admin-initiated fan-out of a single source message to every
//! registered user. The pieces, bottom-up:
//! - `source`: pages recipient ids out of the user store
//! - `sender`: the send primitive and its classified outcomes
//! - `failure_log`: append-only file of permanently failed ids
//! - `dispatcher`: bounded-concurrency delivery with retry and back-off
//! - `coordinator`: one job's lifecycle, progress and summary
//! - `service`: process-wide serialization and pending-source arming

pub mod coordinator;
pub mod dispatcher;
pub mod failure_log;
pub mod sender;
pub mod service;
pub mod source;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::config;

pub use coordinator::{BroadcastCoordinator, BroadcastReporter, BroadcastSummary, CoordinatorSettings, Progress};
pub use dispatcher::{Delivery, DispatchOptions, DispatchReport, DispatchRun, Dispatcher, RecipientOutcome};
pub use failure_log::{FailureLog, FailureLogError};
pub use sender::{MessageSender, SendOutcome, SOURCE_MESSAGE_MISSING};
pub use service::{BroadcastService, LaunchError, PendingBroadcast};
pub use source::{RecipientSource, UserStoreSource};

/// How the source message reaches recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastMode {
    /// Re-sent without attribution
    Copy,
    /// Forwarded with the origin header
    Forward,
}

impl BroadcastMode {
    /// Pause after every completed recipient slot.
    pub fn min_spacing(self) -> Duration {
        match self {
            BroadcastMode::Copy => Duration::from_millis(config::broadcast::COPY_SPACING_MS),
            BroadcastMode::Forward => Duration::from_millis(config::broadcast::FORWARD_SPACING_MS),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BroadcastMode::Copy => "copy",
            BroadcastMode::Forward => "forward",
        }
    }
}

impl fmt::Display for BroadcastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The message being broadcast, as it sits in the admin's chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMessage {
    pub from_chat_id: i64,
    pub message_id: i32,
}

/// Failure log locations: one for live runs, one per test mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastPaths {
    pub live: PathBuf,
    pub test_copy: PathBuf,
    pub test_forward: PathBuf,
}

impl BroadcastPaths {
    pub fn from_config() -> Self {
        Self {
            live: PathBuf::from(config::broadcast::FAILURE_LOG_PATH.as_str()),
            test_copy: PathBuf::from(config::broadcast::TEST_COPY_LOG_PATH.as_str()),
            test_forward: PathBuf::from(config::broadcast::TEST_FORWARD_LOG_PATH.as_str()),
        }
    }

    pub fn path_for(&self, mode: BroadcastMode, is_test: bool) -> &PathBuf {
        match (is_test, mode) {
            (false, _) => &self.live,
            (true, BroadcastMode::Copy) => &self.test_copy,
            (true, BroadcastMode::Forward) => &self.test_forward,
        }
    }
}

/// A broadcast about to run. Lives only in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastJob {
    pub mode: BroadcastMode,
    pub is_test: bool,
    pub source: SourceMessage,
    /// Chat that receives progress, summary and the failure log
    pub admin_chat_id: i64,
    pub failure_log_path: PathBuf,
}

impl BroadcastJob {
    pub fn new(
        mode: BroadcastMode,
        is_test: bool,
        source: SourceMessage,
        admin_chat_id: i64,
        paths: &BroadcastPaths,
    ) -> Self {
        Self {
            mode,
            is_test,
            source,
            admin_chat_id,
            failure_log_path: paths.path_for(mode, is_test).clone(),
        }
    }
}
