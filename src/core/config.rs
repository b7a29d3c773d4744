//! Configuration constants for the bot.
//!
//! Every value is read once from the environment (after `.env` is loaded)
//! and cached for the process lifetime.

use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Reads `key` from the environment and parses it, falling back to `default`
/// when the variable is unset, blank or unparsable.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Logging configuration
pub mod logging {
    use super::env_or;
    use once_cell::sync::Lazy;
    use std::env;

    /// Log file path
    /// Read from LOG_FILE_PATH environment variable
    /// Default: app.log
    pub static LOG_FILE_PATH: Lazy<String> =
        Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

    /// Log level filter (error, warn, info, debug, trace)
    /// Read from LOG_LEVEL environment variable
    /// Default: info
    pub static LOG_LEVEL: Lazy<log::LevelFilter> = Lazy::new(|| env_or("LOG_LEVEL", log::LevelFilter::Info));
}

/// User store configuration
pub mod database {
    use super::{env_or, Duration};
    use once_cell::sync::Lazy;
    use std::env;

    /// SQLite database file
    /// Read from DB_PATH (or legacy DATABASE_PATH) environment variable
    /// Default: database.sqlite
    pub static DB_PATH: Lazy<String> = Lazy::new(|| {
        env::var("DB_PATH")
            .or_else(|_| env::var("DATABASE_PATH"))
            .unwrap_or_else(|_| "database.sqlite".to_string())
    });

    /// Maximum number of pooled connections
    /// Read from DB_POOL_SIZE environment variable
    pub static POOL_SIZE: Lazy<u32> = Lazy::new(|| env_or("DB_POOL_SIZE", 10u32).max(1));

    /// How long a connection waits on a locked database (in seconds)
    /// Read from DB_BUSY_TIMEOUT_SECS environment variable
    pub static BUSY_TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| env_or("DB_BUSY_TIMEOUT_SECS", 30u64));

    /// Busy timeout duration
    pub fn busy_timeout() -> Duration {
        Duration::from_secs(*BUSY_TIMEOUT_SECS)
    }
}

/// Admin configuration
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    /// Parses a comma/whitespace separated list of user ids, skipping junk.
    pub fn parse_admin_ids(raw: &str) -> Vec<i64> {
        raw.split([',', ' ', '\n', '\t'])
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect()
    }

    /// Static admin user IDs (comma-separated)
    /// Read from ADMIN_IDS environment variable
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .ok()
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default()
    });
}

/// Broadcast engine configuration
pub mod broadcast {
    use super::{env_or, Duration};
    use once_cell::sync::Lazy;
    use std::env;

    /// Pause after each COPY slot (in milliseconds)
    pub const COPY_SPACING_MS: u64 = 200;

    /// Pause after each FORWARD slot (in milliseconds)
    /// Telegram treats forwards as more expensive than copies
    pub const FORWARD_SPACING_MS: u64 = 500;

    /// Upper bound for the exponential safety margin (in seconds)
    pub const BACKOFF_CAP_SECS: u64 = 30;

    /// Lowest accepted per-attempt send timeout (in seconds)
    pub const MIN_SEND_TIMEOUT_SECS: u64 = 10;

    /// Concurrent in-flight sends
    /// Read from BROADCAST_MAX_IN_FLIGHT environment variable
    /// Default: 20
    pub static MAX_IN_FLIGHT: Lazy<usize> = Lazy::new(|| env_or("BROADCAST_MAX_IN_FLIGHT", 20usize).max(1));

    /// Send attempts per recipient before giving up
    /// Read from BROADCAST_MAX_ATTEMPTS environment variable
    /// Default: 5
    pub static MAX_ATTEMPTS: Lazy<u32> = Lazy::new(|| env_or("BROADCAST_MAX_ATTEMPTS", 5u32).max(1));

    /// Completed recipients between progress message edits
    /// Read from BROADCAST_PROGRESS_INTERVAL environment variable
    /// Default: 1000
    pub static PROGRESS_INTERVAL: Lazy<usize> =
        Lazy::new(|| env_or("BROADCAST_PROGRESS_INTERVAL", 1000usize).max(1));

    /// Recipients loaded from the user store per page
    /// Read from BROADCAST_BATCH_SIZE environment variable
    /// Default: 1000
    pub static BATCH_SIZE: Lazy<usize> =
        Lazy::new(|| env_or("BROADCAST_BATCH_SIZE", crate::broadcast::source::DEFAULT_BATCH_SIZE).max(1));

    /// Per-attempt send timeout (in seconds), never below MIN_SEND_TIMEOUT_SECS
    /// Read from BROADCAST_SEND_TIMEOUT_SECS environment variable
    /// Default: 15
    pub static SEND_TIMEOUT_SECS: Lazy<u64> =
        Lazy::new(|| env_or("BROADCAST_SEND_TIMEOUT_SECS", 15u64).max(MIN_SEND_TIMEOUT_SECS));

    /// Failure log for live broadcasts
    /// Read from BROADCAST_FAILURE_LOG_PATH environment variable
    pub static FAILURE_LOG_PATH: Lazy<String> = Lazy::new(|| {
        env::var("BROADCAST_FAILURE_LOG_PATH").unwrap_or_else(|_| "broadcast_failed.txt".to_string())
    });

    /// Failure log for test COPY broadcasts
    /// Read from BROADCAST_TEST_COPY_LOG_PATH environment variable
    pub static TEST_COPY_LOG_PATH: Lazy<String> = Lazy::new(|| {
        env::var("BROADCAST_TEST_COPY_LOG_PATH").unwrap_or_else(|_| "broadcast_test_copy_failed.txt".to_string())
    });

    /// Failure log for test FORWARD broadcasts
    /// Read from BROADCAST_TEST_FORWARD_LOG_PATH environment variable
    pub static TEST_FORWARD_LOG_PATH: Lazy<String> = Lazy::new(|| {
        env::var("BROADCAST_TEST_FORWARD_LOG_PATH").unwrap_or_else(|_| "broadcast_test_forward_failed.txt".to_string())
    });

    /// Per-attempt send timeout duration
    pub fn send_timeout() -> Duration {
        Duration::from_secs(*SEND_TIMEOUT_SECS)
    }

    /// Back-off margin cap duration
    pub fn backoff_cap() -> Duration {
        Duration::from_secs(BACKOFF_CAP_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API HTTP requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}
