//! Telegram side of the broadcast engine: the send primitive and the admin
//! chat reporter.

use async_trait::async_trait;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId};
use teloxide::RequestError;
use tokio::sync::Mutex;

use crate::broadcast::{
    BroadcastMode, BroadcastReporter, BroadcastSummary, MessageSender, Progress, SendOutcome, SourceMessage,
    SOURCE_MESSAGE_MISSING,
};
use crate::telegram::Bot;

/// Maps a Bot API error text onto a send outcome.
///
/// teloxide renders API errors as the server's description
/// ("Forbidden: bot was blocked by the user", "Bad Request: chat not found").
pub fn classify_api_message(description: &str) -> SendOutcome {
    let text = description.to_lowercase();

    if text.contains("forbidden")
        || text.contains("blocked")
        || text.contains("deactivated")
        || text.contains("kicked")
        || text.contains("can't initiate")
    {
        SendOutcome::Forbidden
    } else if text.contains("chat not found") || text.contains("user not found") {
        SendOutcome::NotFound
    } else if text.contains("message to copy not found")
        || text.contains("message to forward not found")
        || text.contains("message not found")
    {
        SendOutcome::BadRequest(SOURCE_MESSAGE_MISSING.to_string())
    } else if text.contains("bad request") {
        SendOutcome::BadRequest(description.to_string())
    } else {
        SendOutcome::Transient(description.to_string())
    }
}

pub fn classify_request_error(err: &RequestError) -> SendOutcome {
    match err {
        RequestError::RetryAfter(seconds) => SendOutcome::RetryAfter(seconds.duration()),
        // Group upgraded to a supergroup, the stored id is dead
        RequestError::MigrateToChatId(_) => SendOutcome::NotFound,
        RequestError::Api(api_error) => classify_api_message(&api_error.to_string()),
        other => SendOutcome::Transient(other.to_string()),
    }
}

/// Sends broadcasts through the Bot API.
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send(&self, recipient: i64, source: &SourceMessage, mode: BroadcastMode) -> SendOutcome {
        let to = ChatId(recipient);
        let from = ChatId(source.from_chat_id);
        let message_id = MessageId(source.message_id);

        let sent = match mode {
            BroadcastMode::Copy => self.bot.copy_message(to, from, message_id).await.map(|id| id.0),
            BroadcastMode::Forward => self
                .bot
                .forward_message(to, from, message_id)
                .await
                .map(|message| message.id.0),
        };

        match sent {
            Ok(id) => SendOutcome::Ok(id),
            Err(e) => classify_request_error(&e),
        }
    }

    async fn delete(&self, recipient: i64, message_id: i32) -> anyhow::Result<()> {
        self.bot.delete_message(ChatId(recipient), MessageId(message_id)).await?;
        Ok(())
    }
}

pub fn format_progress(progress: Progress) -> String {
    format!(
        "📤 Broadcast in progress\n{}/{} delivered ({:.1}%)\nFailed: {}",
        progress.delivered,
        progress.completed(),
        progress.percent(),
        progress.failed
    )
}

pub fn format_summary(summary: &BroadcastSummary) -> String {
    let kind = if summary.is_test { "Test broadcast" } else { "Broadcast" };
    let mut text = match &summary.aborted {
        Some(reason) => format!("⚠️ {} ({}) stopped early: {}\n", kind, summary.mode, reason),
        None => format!("✅ {} ({}) finished\n", kind, summary.mode),
    };
    text.push_str(&format!(
        "Delivered: {}\nFailed: {}\nRecipients: {}\nTime: {}s",
        summary.delivered,
        summary.failed,
        summary.consumed,
        summary.elapsed.as_secs()
    ));
    text
}

/// Reports a broadcast into the admin chat. The first progress update sends
/// a message, later ones edit it.
pub struct TelegramReporter {
    bot: Bot,
    chat_id: ChatId,
    progress_message: Mutex<Option<MessageId>>,
}

impl TelegramReporter {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self {
            bot,
            chat_id,
            progress_message: Mutex::new(None),
        }
    }
}

#[async_trait]
impl BroadcastReporter for TelegramReporter {
    async fn progress(&self, progress: Progress) -> anyhow::Result<()> {
        let text = format_progress(progress);
        let mut message = self.progress_message.lock().await;
        match *message {
            Some(message_id) => {
                self.bot.edit_message_text(self.chat_id, message_id, text).await?;
            }
            None => {
                let sent = self.bot.send_message(self.chat_id, text).await?;
                *message = Some(sent.id);
            }
        }
        Ok(())
    }

    async fn summary(&self, summary: &BroadcastSummary) -> anyhow::Result<()> {
        self.bot.send_message(self.chat_id, format_summary(summary)).await?;
        Ok(())
    }

    async fn failure_log(&self, path: &Path, failed: usize) -> anyhow::Result<()> {
        self.bot
            .send_document(self.chat_id, InputFile::file(path))
            .caption(format!("Recipients that could not be reached: {}", failed))
            .await?;
        Ok(())
    }
}
