//! Linguabot - systems core of a multilingual Telegram bot
//!
//! This library provides the parts of the bot that deal with concurrency,
//! persistence and the Telegram rate limits; product features live elsewhere.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging and back-off
//! - `storage`: SQLite pool, migrations and table access
//! - `registry`: idempotent recording of every user that talks to the bot
//! - `gate`: required-channel membership gate
//! - `broadcast`: fan-out broadcast engine
//! - `telegram`: teloxide handlers and Bot API adapters

pub mod broadcast;
pub mod cli;
pub mod core;
pub mod gate;
pub mod registry;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use core::{config, AppError};
pub use registry::UserRegistry;
pub use storage::{create_pool, DbConnection, DbPool};
