//! Telegram side of the membership gate: membership lookups and the join
//! prompt.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberStatus, InlineKeyboardButton, InlineKeyboardMarkup, UserId};
use url::Url;

use crate::gate::{MemberStatus, MembershipProbe, ProbeError};
use crate::storage::channels::RequiredChannel;
use crate::telegram::Bot;

/// Callback data of the "I've joined" button.
pub const GATE_CHECK_CALLBACK: &str = "check";

pub const JOIN_PROMPT: &str = "To use the bot, please join the channels below and press \"I've joined\".";

pub struct TelegramProbe {
    bot: Bot,
}

impl TelegramProbe {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MembershipProbe for TelegramProbe {
    async fn member_status(&self, chat_id: i64, user_id: i64) -> Result<MemberStatus, ProbeError> {
        let user = u64::try_from(user_id)
            .map(UserId)
            .map_err(|_| ProbeError(format!("invalid user id {}", user_id)))?;
        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), user)
            .await
            .map_err(|e| ProbeError(e.to_string()))?;

        Ok(match member.status() {
            ChatMemberStatus::Owner => MemberStatus::Owner,
            ChatMemberStatus::Administrator => MemberStatus::Administrator,
            ChatMemberStatus::Member => MemberStatus::Member,
            ChatMemberStatus::Restricted => MemberStatus::Restricted,
            ChatMemberStatus::Left => MemberStatus::Left,
            ChatMemberStatus::Banned => MemberStatus::Banned,
        })
    }
}

/// One URL button per missing channel, then the re-check button.
pub fn join_keyboard(join_list: &[RequiredChannel]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::with_capacity(join_list.len() + 1);

    for (index, channel) in join_list.iter().enumerate() {
        match Url::parse(&channel.invite_url) {
            Ok(url) => rows.push(vec![InlineKeyboardButton::url(
                format!("📢 Join channel {}", index + 1),
                url,
            )]),
            Err(e) => log::warn!(
                "Skipping channel {} with invalid invite link {}: {}",
                channel.chat_id,
                channel.invite_url,
                e
            ),
        }
    }

    rows.push(vec![InlineKeyboardButton::callback("✅ I've joined", GATE_CHECK_CALLBACK)]);
    InlineKeyboardMarkup::new(rows)
}
