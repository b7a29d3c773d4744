//! Admin functionality for the Telegram bot
//!
//! This module contains the admin commands that are not broadcasts:
//! - Required channel management (/channel_add, /channel_remove, /channel_list)
//! - Dynamic admin management (/admin_add, /admin_remove)
//! - Bot overview (/stats)

use teloxide::prelude::*;
use teloxide::types::Recipient;
use url::Url;

use crate::core::error::{AppError, AppResult};
use crate::storage::{admins, channels, users, with_connection};
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::Bot;

/// How an admin referred to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRef {
    Id(i64),
    Username(String),
}

/// Parses a numeric chat id or an `@username`.
pub fn parse_chat_ref(raw: &str) -> AppResult<ChatRef> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<i64>() {
        return Ok(ChatRef::Id(id));
    }
    if lazy_regex::regex_is_match!(r"^@[A-Za-z][A-Za-z0-9_]{3,31}$", raw) {
        return Ok(ChatRef::Username(raw.to_string()));
    }
    Err(AppError::validation(format!(
        "'{}' is neither a chat id nor an @username",
        raw
    )))
}

/// Parses an invite link. Bare `t.me/...` links get an https scheme.
pub fn parse_invite_url(raw: &str) -> AppResult<Url> {
    let raw = raw.trim();
    let candidate = if raw.starts_with("t.me/") {
        format!("https://{}", raw)
    } else {
        raw.to_string()
    };

    let url = Url::parse(&candidate)?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AppError::validation(format!("'{}' is not an http(s) link", raw)));
    }
    Ok(url)
}

/// Splits `/channel_add` arguments into chat reference and invite link.
pub fn parse_channel_add_args(args: &str) -> AppResult<(ChatRef, Url)> {
    let mut parts = args.split_whitespace();
    let (Some(chat), Some(link), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AppError::validation("usage: /channel_add <id or @username> <invite url>"));
    };
    Ok((parse_chat_ref(chat)?, parse_invite_url(link)?))
}

pub fn parse_user_id(raw: &str) -> AppResult<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::validation(format!("'{}' is not a user id", raw.trim())))
}

/// Looks the chat up through the Bot API so only chats the bot can see are
/// stored. Numeric ids are checked too; a stale id would lock every user out.
async fn resolve_chat(bot: &Bot, chat: ChatRef) -> AppResult<i64> {
    let (shown, recipient) = match chat {
        ChatRef::Id(id) => (id.to_string(), Recipient::Id(ChatId(id))),
        ChatRef::Username(name) => (name.clone(), Recipient::ChannelUsername(name)),
    };

    match bot.get_chat(recipient).await {
        Ok(info) => Ok(info.id.0),
        Err(e) => {
            log::warn!("Chat {} could not be resolved: {}", shown, e);
            Err(AppError::validation(format!(
                "chat {} is not reachable by the bot (is the bot a member?): {}",
                shown, e
            )))
        }
    }
}

/// `/channel_add <chat> <url>`
pub async fn handle_channel_add(bot: &Bot, chat_id: ChatId, args: &str, deps: &HandlerDeps) -> AppResult<()> {
    let (chat, url) = parse_channel_add_args(args)?;
    let channel_id = resolve_chat(bot, chat).await?;
    let invite_url = url.to_string();

    with_connection(&deps.pool, move |conn| channels::upsert_channel(conn, channel_id, &invite_url)).await?;
    log::info!("Required channel {} registered ({})", channel_id, url);

    bot.send_message(chat_id, format!("✅ Channel {} is now required.", channel_id))
        .await?;
    Ok(())
}

/// `/channel_remove <chat>`
pub async fn handle_channel_remove(bot: &Bot, chat_id: ChatId, args: &str, deps: &HandlerDeps) -> AppResult<()> {
    let channel_id = resolve_chat(bot, parse_chat_ref(args)?).await?;

    let removed = with_connection(&deps.pool, move |conn| channels::delete_channel(conn, channel_id)).await?;
    let reply = if removed {
        log::info!("Required channel {} removed", channel_id);
        format!("🗑 Channel {} is no longer required.", channel_id)
    } else {
        format!("Channel {} was not required.", channel_id)
    };
    bot.send_message(chat_id, reply).await?;
    Ok(())
}

/// `/channel_list`: title and description are fetched live.
pub async fn handle_channel_list(bot: &Bot, chat_id: ChatId, deps: &HandlerDeps) -> AppResult<()> {
    let roster = with_connection(&deps.pool, |conn| channels::all_channels(conn)).await?;
    if roster.is_empty() {
        bot.send_message(chat_id, "No required channels.").await?;
        return Ok(());
    }

    let mut text = String::from("Required channels:\n");
    for channel in roster {
        let (title, description) = match bot.get_chat(ChatId(channel.chat_id)).await {
            Ok(info) => (
                info.title().unwrap_or("untitled").to_string(),
                info.description().map(str::to_string),
            ),
            Err(e) => {
                log::warn!("Could not fetch channel {}: {}", channel.chat_id, e);
                ("unavailable".to_string(), None)
            }
        };

        let state = if channel.is_active { "active" } else { "inactive" };
        text.push_str(&format!(
            "\n• {} ({}, {})\n  {}",
            title, channel.chat_id, state, channel.invite_url
        ));
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            text.push_str(&format!("\n  {}", description));
        }
    }

    bot.send_message(chat_id, text).await?;
    Ok(())
}

/// `/admin_add <user id>`
pub async fn handle_admin_add(bot: &Bot, chat_id: ChatId, args: &str, deps: &HandlerDeps) -> AppResult<()> {
    let user_id = parse_user_id(args)?;

    let added = with_connection(&deps.pool, move |conn| admins::add_admin(conn, user_id)).await?;
    let reply = if added {
        log::info!("Admin rights granted to {}", user_id);
        format!("✅ {} is now an admin.", user_id)
    } else {
        format!("{} is already an admin.", user_id)
    };
    bot.send_message(chat_id, reply).await?;
    Ok(())
}

/// `/admin_remove <user id>`
pub async fn handle_admin_remove(bot: &Bot, chat_id: ChatId, args: &str, deps: &HandlerDeps) -> AppResult<()> {
    let user_id = parse_user_id(args)?;
    if deps.admins.is_static(user_id) {
        return Err(AppError::validation(format!(
            "{} is listed in ADMIN_IDS and cannot be removed here",
            user_id
        )));
    }

    let removed = with_connection(&deps.pool, move |conn| admins::remove_admin(conn, user_id)).await?;
    let reply = if removed {
        log::info!("Admin rights revoked from {}", user_id);
        format!("🗑 {} is no longer an admin.", user_id)
    } else {
        format!("{} was not an admin.", user_id)
    };
    bot.send_message(chat_id, reply).await?;
    Ok(())
}

/// `/stats`
pub async fn handle_stats(bot: &Bot, chat_id: ChatId, deps: &HandlerDeps) -> AppResult<()> {
    let (user_count, channel_count, added_admins) = with_connection(&deps.pool, |conn| {
        Ok((
            users::count_users(conn)?,
            channels::active_channels(conn)?.len(),
            admins::list_admins(conn)?,
        ))
    })
    .await?;

    let broadcast = if deps.broadcasts.is_running() { "running" } else { "idle" };
    let added = if added_admins.is_empty() {
        "none".to_string()
    } else {
        added_admins.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
    };
    bot.send_message(
        chat_id,
        format!(
            "📊 Users: {}\nRequired channels: {}\nAdded admins: {}\nBroadcast: {}",
            user_count, channel_count, added, broadcast
        ),
    )
    .await?;
    Ok(())
}
