//! Scripted send primitives

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use linguabot::broadcast::{BroadcastMode, MessageSender, SendOutcome, SourceMessage};

/// Replays a per-recipient list of outcomes. Once a recipient's script is
/// used up every further send succeeds.
#[derive(Default)]
pub struct ScriptedSender {
    scripts: Mutex<HashMap<i64, VecDeque<SendOutcome>>>,
    calls: Mutex<Vec<(i64, Instant)>>,
    deleted: Mutex<Vec<(i64, i32)>>,
    delay: Duration,
    fail_deletes: bool,
}

impl ScriptedSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send sleeps this long before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Every delete errors, like a message Telegram already removed.
    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn script(self, recipient: i64, outcomes: impl IntoIterator<Item = SendOutcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(recipient, outcomes.into_iter().collect());
        self
    }

    /// Same outcome for every one of `max` attempts.
    pub fn always(self, recipient: i64, outcome: SendOutcome, max: usize) -> Self {
        self.script(recipient, std::iter::repeat(outcome).take(max))
    }

    pub fn calls_for(&self, recipient: i64) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == recipient)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn deleted(&self) -> Vec<(i64, i32)> {
        let mut deleted = self.deleted.lock().unwrap().clone();
        deleted.sort_unstable();
        deleted
    }
}

#[async_trait]
impl MessageSender for ScriptedSender {
    async fn send(&self, recipient: i64, _source: &SourceMessage, _mode: BroadcastMode) -> SendOutcome {
        self.calls.lock().unwrap().push((recipient, Instant::now()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&recipient)
            .and_then(|script| script.pop_front());
        // Message ids echo the recipient so deletions can be matched
        next.unwrap_or(SendOutcome::Ok(recipient as i32))
    }

    async fn delete(&self, recipient: i64, message_id: i32) -> anyhow::Result<()> {
        self.deleted.lock().unwrap().push((recipient, message_id));
        if self.fail_deletes {
            anyhow::bail!("Bad Request: message to delete not found");
        }
        Ok(())
    }
}

/// Holds every send until the test hands out a permit, tracking how many
/// sends are in flight.
pub struct BlockingSender {
    release: Arc<Semaphore>,
    in_flight: AtomicUsize,
    max_seen: AtomicUsize,
}

impl BlockingSender {
    pub fn new() -> Self {
        Self {
            release: Arc::new(Semaphore::new(0)),
            in_flight: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
        }
    }

    /// Lets `n` blocked sends finish.
    pub fn release(&self, n: usize) {
        self.release.add_permits(n);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_seen(&self) -> usize {
        self.max_seen.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSender for BlockingSender {
    async fn send(&self, _recipient: i64, _source: &SourceMessage, _mode: BroadcastMode) -> SendOutcome {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);

        if let Ok(permit) = self.release.acquire().await {
            permit.forget();
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        SendOutcome::Ok(1)
    }

    async fn delete(&self, _recipient: i64, _message_id: i32) -> anyhow::Result<()> {
        Ok(())
    }
}
