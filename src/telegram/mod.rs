//! Telegram bot integration and handlers

pub mod admin;
pub mod bot;
pub mod broadcast;
pub mod gate;
pub mod handlers;

/// Bot type used across the crate
pub type Bot = teloxide::Bot;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use broadcast::{TelegramReporter, TelegramSender};
pub use gate::TelegramProbe;
pub use handlers::{schema, HandlerDeps, HandlerError};
