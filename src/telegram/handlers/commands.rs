//! Command, broadcast-source and gate callback handlers

use chrono::Utc;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{identity_of, HandlerDeps, HandlerError};
use crate::broadcast::{
    BroadcastJob, BroadcastMode, CoordinatorSettings, LaunchError, PendingBroadcast, SourceMessage, UserStoreSource,
};
use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::telegram::admin::{
    handle_admin_add, handle_admin_remove, handle_channel_add, handle_channel_list, handle_channel_remove, handle_stats,
};
use crate::telegram::bot::Command;
use crate::telegram::broadcast::{TelegramReporter, TelegramSender};
use crate::telegram::gate::{join_keyboard, JOIN_PROMPT};
use crate::telegram::Bot;

const GREETING: &str = "👋 Welcome! Send me a word or a phrase and I will help you learn it.";
const HELP: &str = "I help you practise foreign words and phrases.\n/start shows the welcome message again.";
const ADMIN_ONLY: &str = "⛔ This command is for admins only.";
const GATE_UNAVAILABLE: &str = "⚠️ Access check is temporarily unavailable. Please try again in a minute.";

fn sender_id(msg: &Message) -> Option<i64> {
    msg.from.as_ref().map(|user| identity_of(user).user_id)
}

pub(super) async fn handle_command(
    bot: &Bot,
    msg: &Message,
    cmd: Command,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    let Some(user_id) = sender_id(msg) else {
        return Ok(());
    };

    if cmd.is_admin_only() {
        let is_admin = match deps.admins.is_admin(user_id).await {
            Ok(is_admin) => is_admin,
            Err(e) => {
                log::error!("Admin lookup for {} failed: {}", user_id, e);
                false
            }
        };
        if !is_admin {
            log::warn!("User {} tried admin command {:?}", user_id, cmd);
            bot.send_message(msg.chat.id, ADMIN_ONLY).await?;
            return Ok(());
        }
    }

    let chat_id = msg.chat.id;
    let result = match cmd {
        Command::Start => send_gated(bot, chat_id, user_id, GREETING, deps).await,
        Command::Help => send_gated(bot, chat_id, user_id, HELP, deps).await,
        Command::BroadcastCopy => arm_broadcast(bot, chat_id, user_id, BroadcastMode::Copy, false, deps).await,
        Command::BroadcastForward => arm_broadcast(bot, chat_id, user_id, BroadcastMode::Forward, false, deps).await,
        Command::BroadcastTestCopy => arm_broadcast(bot, chat_id, user_id, BroadcastMode::Copy, true, deps).await,
        Command::BroadcastTestForward => arm_broadcast(bot, chat_id, user_id, BroadcastMode::Forward, true, deps).await,
        Command::BroadcastCancel => cancel_broadcast(bot, chat_id, user_id, deps).await,
        Command::ChannelAdd(args) => handle_channel_add(bot, chat_id, &args, deps).await,
        Command::ChannelRemove(args) => handle_channel_remove(bot, chat_id, &args, deps).await,
        Command::ChannelList => handle_channel_list(bot, chat_id, deps).await,
        Command::AdminAdd(args) => handle_admin_add(bot, chat_id, &args, deps).await,
        Command::AdminRemove(args) => handle_admin_remove(bot, chat_id, &args, deps).await,
        Command::Stats => handle_stats(bot, chat_id, deps).await,
    };

    match result {
        Ok(()) => Ok(()),
        Err(AppError::Validation(reason)) => {
            bot.send_message(chat_id, format!("⚠️ {}", reason)).await?;
            Ok(())
        }
        Err(e) => {
            log::error!("Command from {} failed: {}", user_id, e);
            bot.send_message(chat_id, format!("❌ {}", e)).await?;
            Ok(())
        }
    }
}

/// Sends `text` when the gate lets the user through, the join prompt otherwise.
async fn send_gated(bot: &Bot, chat_id: ChatId, user_id: i64, text: &str, deps: &HandlerDeps) -> AppResult<()> {
    let decision = deps.gate.check(user_id).await;
    if decision.allowed {
        bot.send_message(chat_id, text).await?;
        return Ok(());
    }

    let prompt = if decision.join_list.is_empty() { GATE_UNAVAILABLE } else { JOIN_PROMPT };
    bot.send_message(chat_id, prompt)
        .reply_markup(join_keyboard(&decision.join_list))
        .await?;
    Ok(())
}

async fn arm_broadcast(
    bot: &Bot,
    chat_id: ChatId,
    admin_id: i64,
    mode: BroadcastMode,
    is_test: bool,
    deps: &HandlerDeps,
) -> AppResult<()> {
    if deps.broadcasts.is_running() {
        return Err(AppError::validation("a broadcast is already running, wait for its summary"));
    }

    deps.broadcasts.arm(admin_id, PendingBroadcast { mode, is_test });
    log::info!("Admin {} armed a {} broadcast (test: {})", admin_id, mode, is_test);

    let kind = if is_test { "test broadcast" } else { "broadcast" };
    bot.send_message(
        chat_id,
        format!(
            "📝 Send the message for the {} {}. /broadcast_cancel to abort.",
            mode, kind
        ),
    )
    .await?;
    Ok(())
}

async fn cancel_broadcast(bot: &Bot, chat_id: ChatId, admin_id: i64, deps: &HandlerDeps) -> AppResult<()> {
    let reply = if deps.broadcasts.disarm(admin_id) {
        "Broadcast cancelled."
    } else {
        "Nothing to cancel."
    };
    bot.send_message(chat_id, reply).await?;
    Ok(())
}

/// Starts the armed broadcast with `msg` as its source.
pub(super) async fn handle_broadcast_source(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(admin_id) = sender_id(msg) else {
        return Ok(());
    };
    let Some(pending) = deps.broadcasts.take(admin_id) else {
        return Ok(());
    };

    let source = SourceMessage {
        from_chat_id: msg.chat.id.0,
        message_id: msg.id.0,
    };
    let job = BroadcastJob::new(pending.mode, pending.is_test, source, msg.chat.id.0, &deps.paths);
    let recipients = UserStoreSource::new(deps.pool.clone(), *config::broadcast::BATCH_SIZE, Utc::now());

    let launched = deps.broadcasts.launch(
        job,
        Arc::new(TelegramSender::new(bot.clone())),
        Arc::new(TelegramReporter::new(bot.clone(), msg.chat.id)),
        CoordinatorSettings::from_config(pending.mode, pending.is_test),
        Box::new(recipients),
    );

    match launched {
        Ok(_) => {
            bot.send_message(msg.chat.id, "🚀 Broadcast started. Progress will be posted here.")
                .await?;
        }
        Err(LaunchError::AlreadyRunning) => {
            bot.send_message(msg.chat.id, "⚠️ A broadcast is already running, this one was not started.")
                .await?;
        }
    }
    Ok(())
}

/// "I've joined" pressed: check again and update the prompt.
pub(super) async fn handle_gate_check(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let user_id = identity_of(&q.from).user_id;
    let decision = deps.gate.check(user_id).await;

    if decision.allowed {
        bot.answer_callback_query(q.id.clone()).await?;
        match q.regular_message() {
            Some(prompt) => {
                bot.edit_message_text(prompt.chat.id, prompt.id, format!("✅ Thanks for joining!\n\n{}", GREETING))
                    .await?;
            }
            None => {
                bot.send_message(q.from.id, GREETING).await?;
            }
        }
        return Ok(());
    }

    bot.answer_callback_query(q.id.clone())
        .text("You have not joined every channel yet.")
        .show_alert(true)
        .await?;

    if let Some(prompt) = q.regular_message() {
        // Telegram rejects edits that change nothing; the alert already told the user
        if let Err(e) = bot
            .edit_message_reply_markup(prompt.chat.id, prompt.id)
            .reply_markup(join_keyboard(&decision.join_list))
            .await
        {
            log::debug!("Join prompt for {} left unchanged: {}", user_id, e);
        }
    }
    Ok(())
}
