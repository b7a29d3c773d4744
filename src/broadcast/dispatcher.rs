//! Rate-limited dispatcher
//!
//! Delivers one source message to many recipients. Every recipient gets its
//! own task; a semaphore caps how many of them hold a slot at once. A slot
//! spans every attempt for that recipient plus the pacing pause after it, so
//! `max_in_flight` bounds both concurrent sends and the send rate.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use super::failure_log::FailureLog;
use super::sender::{MessageSender, SendOutcome};
use super::{BroadcastMode, SourceMessage};
use crate::core::config;
use crate::core::retry::BackoffPolicy;

/// Dispatcher tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    pub max_in_flight: usize,
    /// Sends per recipient before it counts as failed
    pub max_attempts: u32,
    /// Pause after every completed slot
    pub min_spacing: Duration,
    /// Delete delivered messages right away
    pub is_test: bool,
    /// Upper bound for a single send call
    pub send_timeout: Duration,
    pub backoff: BackoffPolicy,
}

impl DispatchOptions {
    /// Built-in defaults for `mode`.
    pub fn for_mode(mode: BroadcastMode) -> Self {
        Self {
            max_in_flight: 20,
            max_attempts: 5,
            min_spacing: mode.min_spacing(),
            is_test: false,
            send_timeout: Duration::from_secs(15),
            backoff: BackoffPolicy::default(),
        }
    }

    /// Defaults overridden by the `BROADCAST_*` environment.
    pub fn from_config(mode: BroadcastMode, is_test: bool) -> Self {
        Self::for_mode(mode)
            .max_in_flight(*config::broadcast::MAX_IN_FLIGHT)
            .max_attempts(*config::broadcast::MAX_ATTEMPTS)
            .send_timeout(config::broadcast::send_timeout())
            .test(is_test)
    }

    #[must_use]
    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn min_spacing(mut self, spacing: Duration) -> Self {
        self.min_spacing = spacing;
        self
    }

    #[must_use]
    pub fn test(mut self, is_test: bool) -> Self {
        self.is_test = is_test;
        self
    }

    #[must_use]
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    #[must_use]
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Terminal state of one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    PermanentlyFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientOutcome {
    pub recipient: i64,
    pub delivery: Delivery,
    /// Send calls made for this recipient
    pub attempts: u32,
}

impl RecipientOutcome {
    pub fn is_delivered(&self) -> bool {
        self.delivery == Delivery::Delivered
    }
}

/// Aggregate counts of a dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

impl DispatchReport {
    pub fn record(&mut self, delivery: &Delivery) {
        match delivery {
            Delivery::Delivered => self.delivered += 1,
            Delivery::PermanentlyFailed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }
}

struct DispatchContext {
    sender: Arc<dyn MessageSender>,
    source: SourceMessage,
    mode: BroadcastMode,
    options: DispatchOptions,
    failure_log: Arc<FailureLog>,
    permits: Arc<Semaphore>,
}

#[derive(Clone)]
pub struct Dispatcher {
    ctx: Arc<DispatchContext>,
}

impl Dispatcher {
    pub fn new(
        sender: Arc<dyn MessageSender>,
        source: SourceMessage,
        mode: BroadcastMode,
        options: DispatchOptions,
        failure_log: Arc<FailureLog>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(options.max_in_flight.max(1)));
        Self {
            ctx: Arc::new(DispatchContext {
                sender,
                source,
                mode,
                options,
                failure_log,
                permits,
            }),
        }
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.ctx.options
    }

    /// An empty run; recipients are added with `DispatchRun::enqueue`.
    pub fn start(&self) -> DispatchRun {
        DispatchRun {
            ctx: Arc::clone(&self.ctx),
            tasks: JoinSet::new(),
        }
    }

    pub fn spawn(&self, recipients: impl IntoIterator<Item = i64>) -> DispatchRun {
        let mut run = self.start();
        run.enqueue(recipients);
        run
    }

    /// Delivers to every recipient and waits for all of them.
    pub async fn dispatch(&self, recipients: impl IntoIterator<Item = i64>) -> DispatchReport {
        let mut run = self.spawn(recipients);
        let mut report = DispatchReport::default();
        while let Some(joined) = run.next().await {
            match joined {
                Ok(outcome) => report.record(&outcome.delivery),
                Err(e) => {
                    log::error!("Recipient task died: {}", e);
                    report.failed += 1;
                }
            }
        }
        report
    }
}

/// Recipients in flight for one dispatcher. Outcomes come out in completion
/// order.
pub struct DispatchRun {
    ctx: Arc<DispatchContext>,
    tasks: JoinSet<RecipientOutcome>,
}

impl DispatchRun {
    pub fn enqueue(&mut self, recipients: impl IntoIterator<Item = i64>) {
        for recipient in recipients {
            self.tasks.spawn(deliver(Arc::clone(&self.ctx), recipient));
        }
    }

    /// Recipients whose outcome has not been collected yet.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Next finished recipient, `None` once the run is drained. A task that
    /// panicked surfaces as `Err`; its recipient is unknown.
    pub async fn next(&mut self) -> Option<Result<RecipientOutcome, JoinError>> {
        self.tasks.join_next().await
    }
}

async fn deliver(ctx: Arc<DispatchContext>, recipient: i64) -> RecipientOutcome {
    let _permit = match Arc::clone(&ctx.permits).acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return RecipientOutcome {
                recipient,
                delivery: Delivery::PermanentlyFailed("dispatcher closed".to_string()),
                attempts: 0,
            }
        }
    };

    let (delivery, attempts) = attempt_delivery(&ctx, recipient).await;

    if let Delivery::PermanentlyFailed(reason) = &delivery {
        log::debug!("Recipient {} failed after {} attempt(s): {}", recipient, attempts, reason);
        if let Err(e) = ctx.failure_log.append(recipient).await {
            log::error!("{}", e);
        }
    }

    if !ctx.options.min_spacing.is_zero() {
        tokio::time::sleep(ctx.options.min_spacing).await;
    }

    RecipientOutcome {
        recipient,
        delivery,
        attempts,
    }
}

async fn attempt_delivery(ctx: &DispatchContext, recipient: i64) -> (Delivery, u32) {
    let options = &ctx.options;
    let mut attempts: u32 = 0;

    loop {
        let sent = tokio::time::timeout(options.send_timeout, ctx.sender.send(recipient, &ctx.source, ctx.mode)).await;
        let outcome = sent.unwrap_or_else(|_| SendOutcome::Transient("timed out".to_string()));
        let failed_attempt = attempts;
        attempts += 1;

        let wait = match outcome {
            SendOutcome::Ok(message_id) => {
                if options.is_test {
                    cleanup_test_message(ctx, recipient, message_id).await;
                }
                return (Delivery::Delivered, attempts);
            }
            SendOutcome::Forbidden => return (Delivery::PermanentlyFailed("forbidden".to_string()), attempts),
            SendOutcome::NotFound => return (Delivery::PermanentlyFailed("chat not found".to_string()), attempts),
            ref missing if ctx.mode == BroadcastMode::Copy && missing.is_source_missing() => {
                return (
                    Delivery::PermanentlyFailed("source message not found".to_string()),
                    attempts,
                );
            }
            SendOutcome::RetryAfter(hint) => {
                if attempts >= options.max_attempts {
                    return (
                        Delivery::PermanentlyFailed(format!("rate limited {} time(s)", attempts)),
                        attempts,
                    );
                }
                options.backoff.retry_after_delay(hint, failed_attempt)
            }
            SendOutcome::BadRequest(reason) | SendOutcome::Transient(reason) => {
                if attempts >= options.max_attempts {
                    return (Delivery::PermanentlyFailed(reason), attempts);
                }
                log::debug!("Send to {} failed ({}), retrying", recipient, reason);
                options.backoff.delay_for_attempt(failed_attempt)
            }
        };

        tokio::time::sleep(wait).await;
    }
}

async fn cleanup_test_message(ctx: &DispatchContext, recipient: i64, message_id: i32) {
    match tokio::time::timeout(ctx.options.send_timeout, ctx.sender.delete(recipient, message_id)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::debug!("Could not delete test message {} for {}: {}", message_id, recipient, e),
        Err(_) => log::debug!("Deleting test message {} for {} timed out", message_id, recipient),
    }
}
