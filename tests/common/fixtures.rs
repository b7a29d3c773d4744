//! Fixtures: temporary databases, jobs and dispatcher options tuned for tests

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use linguabot::broadcast::{BroadcastJob, BroadcastMode, BroadcastPaths, DispatchOptions, SourceMessage};
use linguabot::core::retry::BackoffPolicy;
use linguabot::storage::{create_pool_with, DbPool};
use tempfile::TempDir;

/// A migrated SQLite pool in a fresh temporary directory.
///
/// Keep the `TempDir` alive for as long as the pool is used.
pub fn temp_pool() -> (TempDir, DbPool) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("test.sqlite");
    let pool = create_pool_with(path.to_str().expect("utf-8 path"), 4, Duration::from_secs(5)).expect("create pool");
    (dir, pool)
}

/// Dispatcher options without pacing and with millisecond back-off.
pub fn fast_options(mode: BroadcastMode) -> DispatchOptions {
    DispatchOptions::for_mode(mode)
        .min_spacing(Duration::ZERO)
        .send_timeout(Duration::from_secs(2))
        .backoff(BackoffPolicy::new().base(Duration::from_millis(10)))
}

/// A job whose failure logs live under `dir`.
pub fn job(dir: &Path, mode: BroadcastMode, is_test: bool) -> BroadcastJob {
    let paths = BroadcastPaths {
        live: dir.join("broadcast_failed.txt"),
        test_copy: dir.join("broadcast_test_copy_failed.txt"),
        test_forward: dir.join("broadcast_test_forward_failed.txt"),
    };
    let source = SourceMessage {
        from_chat_id: 1000,
        message_id: 77,
    };
    BroadcastJob::new(mode, is_test, source, 1000, &paths)
}

/// Failure log contents, or an empty string when the file is missing.
pub fn read_log(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}
