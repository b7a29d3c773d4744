//! Dispatcher behaviour: outcomes, retries, pacing and concurrency bounds

mod common;
mod mocks;

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use common::{fast_options, read_log};
use linguabot::broadcast::{
    BroadcastMode, Delivery, DispatchOptions, Dispatcher, FailureLog, MessageSender, RecipientOutcome, SendOutcome,
    SourceMessage, SOURCE_MESSAGE_MISSING,
};
use mocks::{BlockingSender, ScriptedSender};

const SOURCE: SourceMessage = SourceMessage {
    from_chat_id: 1000,
    message_id: 77,
};

async fn dispatcher_for(
    dir: &tempfile::TempDir,
    sender: Arc<dyn MessageSender>,
    mode: BroadcastMode,
    options: DispatchOptions,
) -> (Dispatcher, Arc<FailureLog>) {
    let log = Arc::new(FailureLog::create(dir.path().join("failed.txt")).await.unwrap());
    (Dispatcher::new(sender, SOURCE, mode, options, Arc::clone(&log)), log)
}

async fn collect(dispatcher: &Dispatcher, recipients: Vec<i64>) -> Vec<RecipientOutcome> {
    let mut run = dispatcher.spawn(recipients);
    let mut outcomes = Vec::new();
    while let Some(joined) = run.next().await {
        outcomes.push(joined.unwrap());
    }
    outcomes.sort_by_key(|o| o.recipient);
    outcomes
}

#[tokio::test]
async fn test_forbidden_recipient_lands_in_failure_log() {
    let dir = tempfile::tempdir().unwrap();
    let sender = Arc::new(ScriptedSender::new().script(222, [SendOutcome::Forbidden]));
    let (dispatcher, log) = dispatcher_for(&dir, sender, BroadcastMode::Copy, fast_options(BroadcastMode::Copy)).await;

    let report = dispatcher.dispatch(vec![111, 222, 333]).await;

    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(read_log(log.path()), "222\n");
}

#[tokio::test]
async fn test_retry_after_is_honoured() {
    let dir = tempfile::tempdir().unwrap();
    let sender = Arc::new(
        ScriptedSender::new().script(111, [SendOutcome::RetryAfter(Duration::from_secs(1)), SendOutcome::Ok(5)]),
    );
    let (dispatcher, log) = dispatcher_for(&dir, sender.clone(), BroadcastMode::Copy, fast_options(BroadcastMode::Copy)).await;

    let started = Instant::now();
    let report = dispatcher.dispatch(vec![111, 222]).await;

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 0);
    assert!(log.is_empty().await);

    let calls = sender.calls_for(111);
    assert_eq!(calls.len(), 2);
    assert!(calls[1] - calls[0] >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_in_flight_never_exceeds_bound() {
    let dir = tempfile::tempdir().unwrap();
    let sender = Arc::new(BlockingSender::new());
    let options = fast_options(BroadcastMode::Copy).max_in_flight(2);
    let (dispatcher, _log) = dispatcher_for(&dir, sender.clone(), BroadcastMode::Copy, options).await;

    let mut run = dispatcher.spawn(1..=10);
    let collector = tokio::spawn(async move {
        let mut delivered = 0;
        while let Some(joined) = run.next().await {
            if joined.unwrap().is_delivered() {
                delivered += 1;
            }
        }
        delivered
    });

    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sender.in_flight() <= 2, "in flight: {}", sender.in_flight());
        sender.release(1);
    }

    let delivered = tokio::time::timeout(Duration::from_secs(5), collector)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivered, 10);
    assert_eq!(sender.max_seen(), 2);
}

#[tokio::test]
async fn test_everyone_blocked_the_bot() {
    let dir = tempfile::tempdir().unwrap();
    let sender = [1, 2, 3]
        .into_iter()
        .fold(ScriptedSender::new(), |s, id| s.script(id, [SendOutcome::Forbidden]));
    let (dispatcher, log) = dispatcher_for(&dir, Arc::new(sender), BroadcastMode::Forward, fast_options(BroadcastMode::Forward)).await;

    let outcomes = collect(&dispatcher, vec![1, 2, 3]).await;

    assert!(outcomes.iter().all(|o| !o.is_delivered() && o.attempts == 1));
    let mut logged: Vec<_> = read_log(log.path()).lines().map(str::to_owned).collect();
    logged.sort();
    assert_eq!(logged, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_duplicate_recipient_logged_once() {
    let dir = tempfile::tempdir().unwrap();
    let sender = ScriptedSender::new().script(7, [SendOutcome::NotFound, SendOutcome::NotFound]);
    let (dispatcher, log) = dispatcher_for(&dir, Arc::new(sender), BroadcastMode::Copy, fast_options(BroadcastMode::Copy)).await;

    let report = dispatcher.dispatch(vec![7, 7]).await;

    assert_eq!(report.failed, 2);
    assert_eq!(read_log(log.path()), "7\n");
    assert_eq!(log.len().await, 1);
}

#[tokio::test]
async fn test_missing_source_is_permanent_for_copy_only() {
    let missing = || SendOutcome::BadRequest(SOURCE_MESSAGE_MISSING.to_string());

    let dir = tempfile::tempdir().unwrap();
    let copy_sender = Arc::new(ScriptedSender::new().always(5, missing(), 3));
    let options = fast_options(BroadcastMode::Copy).max_attempts(3);
    let (copy, _) = dispatcher_for(&dir, copy_sender.clone(), BroadcastMode::Copy, options).await;

    let outcomes = collect(&copy, vec![5]).await;
    assert_eq!(
        outcomes[0].delivery,
        Delivery::PermanentlyFailed("source message not found".to_string())
    );
    assert_eq!(copy_sender.calls_for(5).len(), 1);

    let dir = tempfile::tempdir().unwrap();
    let forward_sender = Arc::new(ScriptedSender::new().always(5, missing(), 3));
    let options = fast_options(BroadcastMode::Forward).max_attempts(3);
    let (forward, _) = dispatcher_for(&dir, forward_sender.clone(), BroadcastMode::Forward, options).await;

    let outcomes = collect(&forward, vec![5]).await;
    assert!(!outcomes[0].is_delivered());
    assert_eq!(outcomes[0].attempts, 3);
    assert_eq!(forward_sender.calls_for(5).len(), 3);
}

#[tokio::test]
async fn test_transient_errors_back_off_until_attempts_run_out() {
    let dir = tempfile::tempdir().unwrap();
    let sender = Arc::new(ScriptedSender::new().always(9, SendOutcome::Transient("bad gateway".into()), 3));
    let options = fast_options(BroadcastMode::Copy).max_attempts(3);
    let (dispatcher, log) = dispatcher_for(&dir, sender.clone(), BroadcastMode::Copy, options).await;

    let outcomes = collect(&dispatcher, vec![9]).await;

    assert_eq!(outcomes[0].attempts, 3);
    assert_eq!(outcomes[0].delivery, Delivery::PermanentlyFailed("bad gateway".to_string()));
    assert_eq!(read_log(log.path()), "9\n");

    let calls = sender.calls_for(9);
    assert_eq!(calls.len(), 3);
    assert!(calls[1] - calls[0] >= Duration::from_millis(10));
    assert!(calls[2] - calls[1] >= Duration::from_millis(20));
}

#[tokio::test]
async fn test_transient_then_success() {
    let dir = tempfile::tempdir().unwrap();
    let sender = Arc::new(ScriptedSender::new().script(
        4,
        [
            SendOutcome::Transient("connection reset".into()),
            SendOutcome::BadRequest("Bad Request: something odd".into()),
        ],
    ));
    let (dispatcher, log) = dispatcher_for(&dir, sender, BroadcastMode::Copy, fast_options(BroadcastMode::Copy)).await;

    let outcomes = collect(&dispatcher, vec![4]).await;

    assert!(outcomes[0].is_delivered());
    assert_eq!(outcomes[0].attempts, 3);
    assert!(log.is_empty().await);
}

#[tokio::test]
async fn test_rate_limit_exhaustion_fails_recipient() {
    let dir = tempfile::tempdir().unwrap();
    let sender = Arc::new(ScriptedSender::new().always(3, SendOutcome::RetryAfter(Duration::from_millis(50)), 2));
    let options = fast_options(BroadcastMode::Forward).max_attempts(2);
    let (dispatcher, _log) = dispatcher_for(&dir, sender.clone(), BroadcastMode::Forward, options).await;

    let outcomes = collect(&dispatcher, vec![3]).await;

    assert!(!outcomes[0].is_delivered());
    assert_eq!(outcomes[0].attempts, 2);
    let calls = sender.calls_for(3);
    assert!(calls[1] - calls[0] >= Duration::from_millis(50));
}

#[tokio::test]
async fn test_test_mode_deletes_delivered_messages() {
    let dir = tempfile::tempdir().unwrap();
    let sender = Arc::new(ScriptedSender::new().script(2, [SendOutcome::Forbidden]));
    let options = fast_options(BroadcastMode::Copy).test(true);
    let (dispatcher, _log) = dispatcher_for(&dir, sender.clone(), BroadcastMode::Copy, options).await;

    let report = dispatcher.dispatch(vec![1, 2, 3]).await;

    assert_eq!(report.delivered, 2);
    assert_eq!(sender.deleted(), vec![(1, 1), (3, 3)]);
}

#[tokio::test]
async fn test_failed_cleanup_still_counts_as_delivered() {
    let dir = tempfile::tempdir().unwrap();
    let sender = Arc::new(ScriptedSender::new().failing_deletes());
    let options = fast_options(BroadcastMode::Forward).test(true);
    let (dispatcher, log) = dispatcher_for(&dir, sender.clone(), BroadcastMode::Forward, options).await;

    let outcomes = collect(&dispatcher, vec![1, 2, 3]).await;

    assert!(outcomes.iter().all(|o| o.is_delivered() && o.attempts == 1));
    assert_eq!(sender.deleted(), vec![(1, 1), (2, 2), (3, 3)]);
    assert!(log.is_empty().await);
    assert_eq!(read_log(log.path()), "");
}

#[tokio::test]
async fn test_live_mode_keeps_messages() {
    let dir = tempfile::tempdir().unwrap();
    let sender = Arc::new(ScriptedSender::new());
    let (dispatcher, _log) = dispatcher_for(&dir, sender.clone(), BroadcastMode::Copy, fast_options(BroadcastMode::Copy)).await;

    dispatcher.dispatch(vec![1, 2]).await;

    assert!(sender.deleted().is_empty());
}

#[tokio::test]
async fn test_hung_send_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let sender = Arc::new(ScriptedSender::with_delay(Duration::from_millis(500)));
    let options = fast_options(BroadcastMode::Copy)
        .send_timeout(Duration::from_millis(50))
        .max_attempts(2);
    let (dispatcher, log) = dispatcher_for(&dir, sender.clone(), BroadcastMode::Copy, options).await;

    let outcomes = collect(&dispatcher, vec![8]).await;

    assert_eq!(outcomes[0].delivery, Delivery::PermanentlyFailed("timed out".to_string()));
    assert_eq!(outcomes[0].attempts, 2);
    assert_eq!(sender.total_calls(), 2);
    assert_eq!(read_log(log.path()), "8\n");
}

#[tokio::test]
async fn test_spacing_paces_a_single_slot() {
    let dir = tempfile::tempdir().unwrap();
    let sender = Arc::new(ScriptedSender::new());
    let options = fast_options(BroadcastMode::Copy)
        .max_in_flight(1)
        .min_spacing(Duration::from_millis(100));
    let (dispatcher, _log) = dispatcher_for(&dir, sender.clone(), BroadcastMode::Copy, options).await;

    dispatcher.dispatch(vec![1, 2, 3]).await;

    let mut starts: Vec<Instant> = (1..=3).flat_map(|id| sender.calls_for(id)).collect();
    starts.sort();
    assert!(starts[1] - starts[0] >= Duration::from_millis(100));
    assert!(starts[2] - starts[1] >= Duration::from_millis(100));
}
