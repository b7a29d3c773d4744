//! Broadcast coordinator
//!
//! Owns one broadcast from start to finish: resets the failure log, pulls
//! recipient pages, feeds the dispatcher, tallies outcomes, reports progress
//! and delivers the final summary. Runs as a background task; nothing it
//! does is fatal to the process.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::dispatcher::{DispatchOptions, Dispatcher};
use super::failure_log::FailureLog;
use super::sender::MessageSender;
use super::source::RecipientSource;
use super::{BroadcastJob, BroadcastMode};
use crate::core::config;

/// Lifecycle phases. Transitions are logged; `run` consumes the coordinator
/// so they are not observable from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BroadcastState {
    Collecting,
    Sending,
    Reporting,
    Done,
}

/// Running totals shown in progress updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub delivered: usize,
    pub failed: usize,
}

impl Progress {
    pub fn completed(&self) -> usize {
        self.delivered + self.failed
    }

    /// Delivered share of completed recipients, 0..=100.
    pub fn percent(&self) -> f64 {
        match self.completed() {
            0 => 0.0,
            done => self.delivered as f64 * 100.0 / done as f64,
        }
    }
}

/// Final report of a broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastSummary {
    pub mode: BroadcastMode,
    pub is_test: bool,
    pub delivered: usize,
    pub failed: usize,
    /// Recipients drawn from the source
    pub consumed: usize,
    /// Set when the job stopped early; the counts are partial
    pub aborted: Option<String>,
    pub elapsed: Duration,
    pub failure_log: PathBuf,
}

impl BroadcastSummary {
    pub fn is_partial(&self) -> bool {
        self.aborted.is_some()
    }
}

/// Where a broadcast reports to (the admin chat, in production).
#[async_trait]
pub trait BroadcastReporter: Send + Sync {
    async fn progress(&self, progress: Progress) -> anyhow::Result<()>;

    async fn summary(&self, summary: &BroadcastSummary) -> anyhow::Result<()>;

    /// Sends the failure log as a document.
    async fn failure_log(&self, path: &Path, failed: usize) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Completions between progress updates
    pub progress_interval: usize,
    pub dispatch: DispatchOptions,
}

impl CoordinatorSettings {
    pub fn new(progress_interval: usize, dispatch: DispatchOptions) -> Self {
        Self {
            progress_interval: progress_interval.max(1),
            dispatch,
        }
    }

    pub fn from_config(mode: BroadcastMode, is_test: bool) -> Self {
        Self::new(
            *config::broadcast::PROGRESS_INTERVAL,
            DispatchOptions::from_config(mode, is_test),
        )
    }
}

pub struct BroadcastCoordinator {
    job: BroadcastJob,
    sender: Arc<dyn MessageSender>,
    reporter: Arc<dyn BroadcastReporter>,
    settings: CoordinatorSettings,
    state: BroadcastState,
}

impl BroadcastCoordinator {
    pub fn new(
        job: BroadcastJob,
        sender: Arc<dyn MessageSender>,
        reporter: Arc<dyn BroadcastReporter>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            job,
            sender,
            reporter,
            settings,
            state: BroadcastState::Collecting,
        }
    }

    fn enter(&mut self, state: BroadcastState) {
        log::debug!("Broadcast ({}) {:?} -> {:?}", self.job.mode, self.state, state);
        self.state = state;
    }

    /// Runs the job to completion and returns what was reported to the admin.
    pub async fn run(mut self, mut source: Box<dyn RecipientSource>) -> BroadcastSummary {
        let started = Instant::now();
        log::info!(
            "Broadcast started: mode={}, test={}, source={}/{}",
            self.job.mode,
            self.job.is_test,
            self.job.source.from_chat_id,
            self.job.source.message_id
        );

        self.enter(BroadcastState::Collecting);
        let failure_log = match FailureLog::create(&self.job.failure_log_path).await {
            Ok(log) => Arc::new(log),
            Err(e) => {
                log::error!("Broadcast aborted before sending: {}", e);
                let summary = self.summarize(Progress::default(), 0, Some(e.to_string()), started.elapsed());
                self.finish(&summary, None).await;
                return summary;
            }
        };

        self.enter(BroadcastState::Sending);
        let dispatcher = Dispatcher::new(
            Arc::clone(&self.sender),
            self.job.source,
            self.job.mode,
            self.settings.dispatch.clone(),
            Arc::clone(&failure_log),
        );
        let refill_below = self.settings.dispatch.max_in_flight;
        let interval = self.settings.progress_interval;

        let mut run = dispatcher.start();
        let mut progress = Progress::default();
        let mut consumed = 0usize;
        let mut last_reported = 0usize;
        let mut aborted = None;
        let mut source_done = false;

        loop {
            // Keep at most one page queued beyond the in-flight window
            if !source_done && run.pending() <= refill_below {
                match source.next_batch().await {
                    Ok(Some(batch)) => {
                        consumed += batch.len();
                        run.enqueue(batch);
                        continue;
                    }
                    Ok(None) => source_done = true,
                    Err(e) => {
                        log::error!("Recipient source failed after {} recipient(s): {}", consumed, e);
                        aborted = Some(e.to_string());
                        source_done = true;
                    }
                }
            }

            let Some(joined) = run.next().await else {
                if source_done {
                    break;
                }
                continue;
            };
            match joined {
                Ok(outcome) if outcome.is_delivered() => progress.delivered += 1,
                Ok(_) => progress.failed += 1,
                Err(e) => {
                    log::error!("Recipient task died: {}", e);
                    progress.failed += 1;
                }
            }

            if progress.completed() % interval == 0 {
                self.report_progress(progress).await;
                last_reported = progress.completed();
            }
        }

        self.enter(BroadcastState::Reporting);
        if consumed > 0 && progress.completed() != last_reported {
            self.report_progress(progress).await;
        }

        let summary = self.summarize(progress, consumed, aborted, started.elapsed());
        self.finish(&summary, Some(&failure_log)).await;
        summary
    }

    async fn report_progress(&self, progress: Progress) {
        log::info!(
            "Broadcast progress: {}/{} delivered ({:.1}%)",
            progress.delivered,
            progress.completed(),
            progress.percent()
        );
        if let Err(e) = self.reporter.progress(progress).await {
            log::warn!("Failed to update broadcast progress: {}", e);
        }
    }

    fn summarize(
        &self,
        progress: Progress,
        consumed: usize,
        aborted: Option<String>,
        elapsed: Duration,
    ) -> BroadcastSummary {
        BroadcastSummary {
            mode: self.job.mode,
            is_test: self.job.is_test,
            delivered: progress.delivered,
            failed: progress.failed,
            consumed,
            aborted,
            elapsed,
            failure_log: self.job.failure_log_path.clone(),
        }
    }

    async fn finish(&mut self, summary: &BroadcastSummary, failure_log: Option<&FailureLog>) {
        log::info!(
            "Broadcast finished: delivered={}, failed={}, consumed={}, partial={}, elapsed={:?}",
            summary.delivered,
            summary.failed,
            summary.consumed,
            summary.is_partial(),
            summary.elapsed
        );
        if let Err(e) = self.reporter.summary(summary).await {
            log::warn!("Failed to send broadcast summary: {}", e);
        }

        if let Some(failure_log) = failure_log {
            let recorded = failure_log.len().await;
            if recorded > 0 {
                if let Err(e) = self.reporter.failure_log(failure_log.path(), recorded).await {
                    log::warn!("Failed to send failure log {}: {}", failure_log.path().display(), e);
                }
            }
        }
        self.enter(BroadcastState::Done);
    }
}
