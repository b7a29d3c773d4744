//! Bot initialization and the command set
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command registration in the Telegram UI

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;
use crate::telegram::Bot;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum Command {
    #[command(description = "start the bot")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "broadcast the next message as a copy (admins only)")]
    BroadcastCopy,
    #[command(description = "broadcast the next message as a forward (admins only)")]
    BroadcastForward,
    #[command(description = "test copy broadcast, messages are deleted right away (admins only)")]
    BroadcastTestCopy,
    #[command(description = "test forward broadcast, messages are deleted right away (admins only)")]
    BroadcastTestForward,
    #[command(description = "cancel an armed broadcast (admins only)")]
    BroadcastCancel,
    #[command(description = "require a channel: <id or @username> <invite url> (admins only)")]
    ChannelAdd(String),
    #[command(description = "stop requiring a channel: <id or @username> (admins only)")]
    ChannelRemove(String),
    #[command(description = "list required channels (admins only)")]
    ChannelList,
    #[command(description = "grant admin rights: <user id> (admins only)")]
    AdminAdd(String),
    #[command(description = "revoke admin rights: <user id> (admins only)")]
    AdminRemove(String),
    #[command(description = "bot statistics (admins only)")]
    Stats,
}

impl Command {
    /// Commands restricted to admins.
    pub fn is_admin_only(&self) -> bool {
        !matches!(self, Command::Start | Command::Help)
    }
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Missing token, invalid URL or HTTP client failure
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN (or TELOXIDE_TOKEN) is not set");
    }

    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(config::BOT_TOKEN.as_str(), client);

    // Check if local Bot API server is configured
    let bot = if let Ok(bot_api_url) = std::env::var("BOT_API_URL") {
        log::info!("Using custom Bot API URL: {}", bot_api_url);
        let url = url::Url::parse(&bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
        bot.set_api_url(url)
    } else {
        bot
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
///
/// Only the end-user commands are published; admin commands stay hidden.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "start the bot"),
        BotCommand::new("help", "show help"),
    ])
    .await?;

    Ok(())
}
